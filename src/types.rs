//! Domain types shared across the relay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::decoder::SignedTransaction;

/// Chain identifier recorded on ledger rows.
pub const CHAIN_TRON: &str = "tron";
/// Transaction type recorded on ledger rows.
pub const TX_TYPE_TOPUP: &str = "topup";

pub(crate) fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// A time-boxed price computation for a prospective top-up.
/// Never persisted; requesting the same quote twice yields two ids.
#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub quote_id: Uuid,
    pub usdt_amount: f64,
    /// Native tokens the user will receive.
    pub trx_amount: f64,
    /// Resource cost expressed in stablecoin units.
    pub energy_cost_usdt: f64,
    pub service_fee: f64,
    pub total_usdt_charged: f64,
    /// Provider whose estimate backs this quote.
    pub energy_provider: String,
    pub available_providers: Vec<String>,
    /// Epoch milliseconds.
    pub expires_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteRequest {
    pub user_address: String,
    pub usdt_amount: f64,
    pub preferred_provider: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitRequest {
    pub signed_tx: SignedTransaction,
    pub quote_id: Uuid,
    pub expected_amount: f64,
    pub user_address: String,
    pub ip_address: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommitReceipt {
    pub commit_id: Uuid,
    /// Epoch milliseconds at which the pending commit expires.
    pub expires_at: i64,
}

/// State bridged from commit to execute, owned by the ephemeral store
/// under a hard TTL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingCommit {
    pub signed_tx: SignedTransaction,
    pub quote_id: Uuid,
    pub user_address: String,
    pub ip_address: String,
    pub usdt_amount: f64,
    pub trx_amount: f64,
    /// Epoch milliseconds.
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecuteOutcome {
    pub transaction_id: Uuid,
    pub usdt_tx_hash: String,
    pub trx_tx_hash: String,
    pub trx_amount: f64,
}

/// Ledger status. Transitions are monotonic:
/// `pending → processing → {completed | failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "pending",
            TxStatus::Processing => "processing",
            TxStatus::Completed => "completed",
            TxStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TxStatus::Completed | TxStatus::Failed)
    }

    /// Whether a row in `self` may move to `next`.
    pub fn can_advance_to(&self, next: TxStatus) -> bool {
        match (self, next) {
            (TxStatus::Pending, TxStatus::Processing) => true,
            (TxStatus::Pending, TxStatus::Completed | TxStatus::Failed) => true,
            (TxStatus::Processing, TxStatus::Completed | TxStatus::Failed) => true,
            _ => false,
        }
    }
}

impl FromStr for TxStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TxStatus::Pending),
            "processing" => Ok(TxStatus::Processing),
            "completed" => Ok(TxStatus::Completed),
            "failed" => Ok(TxStatus::Failed),
            other => Err(format!("unknown tx status: {other}")),
        }
    }
}

/// Fields for a new ledger row; the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub chain: String,
    pub tx_type: String,
    pub user_address: String,
    pub recipient_address: Option<String>,
    pub stablecoin_amount: f64,
    pub native_amount: Option<f64>,
    pub fee_charged: f64,
}

/// Partial status update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct StatusUpdate {
    pub status: Option<TxStatus>,
    pub tx_hash: Option<String>,
    pub native_tx_hash: Option<String>,
    pub fee_cost: Option<f64>,
    pub error_message: Option<String>,
}

impl StatusUpdate {
    pub fn status(status: TxStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(TxStatus::Failed),
            error_message: Some(error.into()),
            ..Self::default()
        }
    }
}

/// One durable top-up attempt.
#[derive(Debug, Clone, Serialize)]
pub struct TxRecord {
    pub id: Uuid,
    pub chain: String,
    pub tx_type: String,
    pub user_address: String,
    pub recipient_address: Option<String>,
    pub stablecoin_amount: f64,
    pub native_amount: Option<f64>,
    pub fee_charged: f64,
    /// Actual resource cost incurred, once known.
    pub fee_cost: Option<f64>,
    pub tx_hash: Option<String>,
    pub native_tx_hash: Option<String>,
    pub status: TxStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Behavioral counters for one wallet.
#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    pub wallet_address: String,
    /// Deduplicated set of source IPs seen for this wallet.
    pub ip_addresses: Vec<String>,
    pub total_requests: i32,
    pub completed_count: i32,
    pub abandoned_count: i32,
    pub flagged: bool,
    pub flag_reason: Option<String>,
    pub blacklisted: bool,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

/// Append-only audit entry for one abnormal event.
#[derive(Debug, Clone, Serialize)]
pub struct AbuseIncident {
    pub id: Uuid,
    pub wallet_address: String,
    pub ip_address: String,
    pub incident_type: String,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Aggregate counts for the admin surface.
#[derive(Debug, Clone, Serialize)]
pub struct AbuseSummary {
    pub total_users: i64,
    pub flagged_users: i64,
    pub blacklisted_users: i64,
    pub total_abandons: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions_forward_only() {
        use TxStatus::*;
        assert!(Pending.can_advance_to(Processing));
        assert!(Processing.can_advance_to(Completed));
        assert!(Processing.can_advance_to(Failed));
        assert!(Pending.can_advance_to(Failed));

        assert!(!Completed.can_advance_to(Pending));
        assert!(!Completed.can_advance_to(Processing));
        assert!(!Completed.can_advance_to(Failed));
        assert!(!Failed.can_advance_to(Completed));
        assert!(!Processing.can_advance_to(Pending));
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            TxStatus::Pending,
            TxStatus::Processing,
            TxStatus::Completed,
            TxStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<TxStatus>().unwrap(), status);
        }
        assert!("bogus".parse::<TxStatus>().is_err());
    }
}
