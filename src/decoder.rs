//! Signed-transaction decoding and the commit validation gates.
//!
//! Everything here is pure: identical input bytes always produce the same
//! accept/reject decision, which is what makes commit validation replay-safe
//! to test.

use serde::{Deserialize, Serialize};

use crate::error::RejectReason;

/// TRC-20 `transfer(address,uint256)` function selector.
const TRANSFER_SELECTOR: &str = "a9059cbb";

/// A user-signed, not-yet-broadcast transaction in the gateway's JSON shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedTransaction {
    #[serde(rename = "txID", default, skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<String>,
    #[serde(default)]
    pub raw_data: Option<RawData>,
    #[serde(default)]
    pub signature: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawData {
    #[serde(default)]
    pub contract: Vec<Contract>,
    /// Epoch milliseconds after which the chain rejects this transaction.
    #[serde(default)]
    pub expiration: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub parameter: Parameter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub value: ContractValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractValue {
    #[serde(default)]
    pub owner_address: String,
    #[serde(default)]
    pub contract_address: String,
    /// ABI-encoded call data as hex.
    #[serde(default)]
    pub data: String,
}

/// Semantic fields extracted from a decoded transfer. Addresses are
/// normalized lowercase hex with the chain's `41` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTransfer {
    pub sender: String,
    pub recipient: String,
    pub contract: String,
    /// Transfer amount in token minor units.
    pub amount: u128,
    /// Epoch milliseconds.
    pub expiration: i64,
}

/// What the business intent says the transfer must look like.
#[derive(Debug, Clone)]
pub struct ExpectedTransfer {
    pub recipient: String,
    pub contract: String,
    pub amount: u128,
}

/// Signature structurally present and exactly 65 bytes.
pub fn has_valid_signature(tx: &SignedTransaction) -> bool {
    match tx.signature.first() {
        Some(sig) => hex::decode(sig).map(|bytes| bytes.len() == 65).unwrap_or(false),
        None => false,
    }
}

/// A missing expiration counts as expired.
pub fn is_expired(tx: &SignedTransaction, now_ms: i64) -> bool {
    match tx.raw_data.as_ref().and_then(|raw| raw.expiration) {
        Some(expiration) => now_ms > expiration,
        None => true,
    }
}

/// Decode the single expected token-transfer call. Anything not matching
/// the selector and payload shape is rejected as `NotTokenTransfer`.
pub fn decode_transfer(tx: &SignedTransaction) -> Result<DecodedTransfer, RejectReason> {
    let raw = tx.raw_data.as_ref().ok_or(RejectReason::NotTokenTransfer)?;
    let contract = raw.contract.first().ok_or(RejectReason::NotTokenTransfer)?;
    let value = &contract.parameter.value;

    // Exactly selector + two 32-byte words; trailing bytes would smuggle
    // extra call data past the amount check.
    let data = value.data.to_ascii_lowercase();
    if !data.starts_with(TRANSFER_SELECTOR) || data.len() != 136 {
        return Err(RejectReason::NotTokenTransfer);
    }
    if !data[8..136].bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(RejectReason::NotTokenTransfer);
    }

    // Call data layout: selector (4 bytes) | padded recipient (32) | amount (32).
    let recipient = format!("41{}", &data[32..72]);
    let amount =
        u128::from_str_radix(&data[72..136], 16).map_err(|_| RejectReason::NotTokenTransfer)?;

    Ok(DecodedTransfer {
        sender: value.owner_address.to_ascii_lowercase(),
        recipient,
        contract: value.contract_address.to_ascii_lowercase(),
        amount,
        expiration: raw.expiration.unwrap_or(0),
    })
}

/// Full gate sequence, short-circuiting on the first failure.
///
/// Order: signature, expiry, decodability, recipient, contract, amount.
pub fn validate(
    tx: &SignedTransaction,
    expected: &ExpectedTransfer,
    now_ms: i64,
) -> Result<DecodedTransfer, RejectReason> {
    if !has_valid_signature(tx) {
        return Err(RejectReason::InvalidSignature);
    }
    if is_expired(tx, now_ms) {
        return Err(RejectReason::TransactionExpired);
    }
    let decoded = decode_transfer(tx)?;
    if decoded.recipient != expected.recipient.to_ascii_lowercase() {
        return Err(RejectReason::InvalidRecipient);
    }
    if decoded.contract != expected.contract.to_ascii_lowercase() {
        return Err(RejectReason::InvalidContract);
    }
    if decoded.amount != expected.amount {
        return Err(RejectReason::AmountMismatch);
    }
    Ok(decoded)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SERVICE_WALLET: &str = "41f0cc5a2a84cd0f68ed1667070934542d673acbd8";
    pub(crate) const USDT_CONTRACT: &str = "41a614f803b6fd780986a42c78ec9c7f77e6ded13c";
    pub(crate) const USER_ADDRESS: &str = "419e62be7f4f103c36507cb2a753418791b1cdc182";

    /// Build a signed transfer of `amount` minor units to `recipient`.
    pub(crate) fn make_signed_tx(recipient: &str, amount: u128, expiration: i64) -> SignedTransaction {
        let data = format!(
            "{TRANSFER_SELECTOR}{:0>64}{:064x}",
            recipient.trim_start_matches("41"),
            amount
        );
        SignedTransaction {
            tx_id: Some("c0ffee".into()),
            raw_data: Some(RawData {
                contract: vec![Contract {
                    parameter: Parameter {
                        value: ContractValue {
                            owner_address: USER_ADDRESS.into(),
                            contract_address: USDT_CONTRACT.into(),
                            data,
                        },
                    },
                }],
                expiration: Some(expiration),
            }),
            signature: vec!["ab".repeat(65)],
        }
    }

    pub(crate) fn expected(amount: u128) -> ExpectedTransfer {
        ExpectedTransfer {
            recipient: SERVICE_WALLET.into(),
            contract: USDT_CONTRACT.into(),
            amount,
        }
    }

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn test_valid_transfer_accepted() {
        let tx = make_signed_tx(SERVICE_WALLET, 10_000_000, NOW + 60_000);
        let decoded = validate(&tx, &expected(10_000_000), NOW).unwrap();
        assert_eq!(decoded.recipient, SERVICE_WALLET);
        assert_eq!(decoded.contract, USDT_CONTRACT);
        assert_eq!(decoded.sender, USER_ADDRESS);
        assert_eq!(decoded.amount, 10_000_000);
    }

    #[test]
    fn test_missing_signature_rejected() {
        let mut tx = make_signed_tx(SERVICE_WALLET, 1, NOW + 60_000);
        tx.signature.clear();
        assert_eq!(
            validate(&tx, &expected(1), NOW),
            Err(RejectReason::InvalidSignature)
        );
    }

    #[test]
    fn test_short_signature_rejected() {
        let mut tx = make_signed_tx(SERVICE_WALLET, 1, NOW + 60_000);
        tx.signature = vec!["ab".repeat(64)];
        assert_eq!(
            validate(&tx, &expected(1), NOW),
            Err(RejectReason::InvalidSignature)
        );
    }

    #[test]
    fn test_expired_rejected() {
        let tx = make_signed_tx(SERVICE_WALLET, 1, NOW - 1);
        assert_eq!(
            validate(&tx, &expected(1), NOW),
            Err(RejectReason::TransactionExpired)
        );
    }

    #[test]
    fn test_missing_expiration_counts_as_expired() {
        let mut tx = make_signed_tx(SERVICE_WALLET, 1, NOW + 60_000);
        tx.raw_data.as_mut().unwrap().expiration = None;
        assert_eq!(
            validate(&tx, &expected(1), NOW),
            Err(RejectReason::TransactionExpired)
        );
    }

    #[test]
    fn test_wrong_selector_rejected() {
        let mut tx = make_signed_tx(SERVICE_WALLET, 1, NOW + 60_000);
        let data = &mut tx.raw_data.as_mut().unwrap().contract[0].parameter.value.data;
        data.replace_range(0..8, "095ea7b3"); // approve()
        assert_eq!(
            validate(&tx, &expected(1), NOW),
            Err(RejectReason::NotTokenTransfer)
        );
    }

    #[test]
    fn test_truncated_data_rejected() {
        let mut tx = make_signed_tx(SERVICE_WALLET, 1, NOW + 60_000);
        tx.raw_data.as_mut().unwrap().contract[0]
            .parameter
            .value
            .data
            .truncate(100);
        assert_eq!(
            validate(&tx, &expected(1), NOW),
            Err(RejectReason::NotTokenTransfer)
        );
    }

    #[test]
    fn test_trailing_call_data_rejected() {
        let mut tx = make_signed_tx(SERVICE_WALLET, 1, NOW + 60_000);
        tx.raw_data.as_mut().unwrap().contract[0]
            .parameter
            .value
            .data
            .push_str("00");
        assert_eq!(
            validate(&tx, &expected(1), NOW),
            Err(RejectReason::NotTokenTransfer)
        );
    }

    #[test]
    fn test_no_contract_rejected() {
        let mut tx = make_signed_tx(SERVICE_WALLET, 1, NOW + 60_000);
        tx.raw_data.as_mut().unwrap().contract.clear();
        assert_eq!(
            validate(&tx, &expected(1), NOW),
            Err(RejectReason::NotTokenTransfer)
        );
    }

    #[test]
    fn test_wrong_recipient_rejected() {
        let tx = make_signed_tx(USER_ADDRESS, 1, NOW + 60_000);
        assert_eq!(
            validate(&tx, &expected(1), NOW),
            Err(RejectReason::InvalidRecipient)
        );
    }

    #[test]
    fn test_wrong_contract_rejected() {
        let mut tx = make_signed_tx(SERVICE_WALLET, 1, NOW + 60_000);
        tx.raw_data.as_mut().unwrap().contract[0]
            .parameter
            .value
            .contract_address = "41deadbeefdeadbeefdeadbeefdeadbeefdeadbeef".into();
        assert_eq!(
            validate(&tx, &expected(1), NOW),
            Err(RejectReason::InvalidContract)
        );
    }

    #[test]
    fn test_amount_mismatch_rejected_exact_integer() {
        // 9.99 USDT against a 10.00 quote: off by 10_000 minor units.
        let tx = make_signed_tx(SERVICE_WALLET, 9_990_000, NOW + 60_000);
        assert_eq!(
            validate(&tx, &expected(10_000_000), NOW),
            Err(RejectReason::AmountMismatch)
        );
    }

    #[test]
    fn test_validation_is_deterministic() {
        let tx = make_signed_tx(SERVICE_WALLET, 42, NOW + 60_000);
        let first = validate(&tx, &expected(42), NOW);
        for _ in 0..10 {
            assert_eq!(validate(&tx, &expected(42), NOW), first);
        }
    }

    #[test]
    fn test_address_comparison_case_insensitive() {
        let tx = make_signed_tx(SERVICE_WALLET, 7, NOW + 60_000);
        let upper = ExpectedTransfer {
            recipient: SERVICE_WALLET.to_ascii_uppercase(),
            contract: USDT_CONTRACT.to_ascii_uppercase(),
            amount: 7,
        };
        assert!(validate(&tx, &upper, NOW).is_ok());
    }
}
