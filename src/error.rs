//! Error types for the top-up relay.

use std::fmt;

/// Reason a commit or quote was rejected. Each maps to a stable
/// machine-readable code returned to the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Wallet or source IP is blacklisted.
    Blacklisted,
    /// Signature missing or not 65 bytes.
    InvalidSignature,
    /// Transaction expiration is missing or in the past.
    TransactionExpired,
    /// Payload is not a token-transfer call of the expected shape.
    NotTokenTransfer,
    /// Transfer recipient is not the service wallet.
    InvalidRecipient,
    /// Transfer contract is not the configured stablecoin.
    InvalidContract,
    /// Transfer amount does not match the quoted amount exactly.
    AmountMismatch,
    /// On-chain stablecoin balance below the transfer amount.
    InsufficientBalance,
    /// Requested amount outside configured min/max bounds.
    AmountOutOfRange,
    /// Computed payout is zero or negative at current pricing.
    PayoutNotPositive,
    /// Commit identifier unknown, already consumed, or expired.
    CommitNotFound,
    /// Too many requests inside the current window.
    RateLimited,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::Blacklisted => "blacklisted",
            RejectReason::InvalidSignature => "invalid_signature",
            RejectReason::TransactionExpired => "transaction_expired",
            RejectReason::NotTokenTransfer => "not_token_transfer",
            RejectReason::InvalidRecipient => "invalid_recipient",
            RejectReason::InvalidContract => "invalid_contract",
            RejectReason::AmountMismatch => "amount_mismatch",
            RejectReason::InsufficientBalance => "insufficient_balance",
            RejectReason::AmountOutOfRange => "amount_out_of_range",
            RejectReason::PayoutNotPositive => "payout_not_positive",
            RejectReason::CommitNotFound => "commit_not_found",
            RejectReason::RateLimited => "rate_limited",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed delegation attempt, kept so that exhaustion errors carry
/// the full per-provider diagnosis instead of relying on logs.
#[derive(Debug, Clone)]
pub struct ProviderFailure {
    pub provider: String,
    pub reason: String,
}

/// Relay error type.
#[derive(Debug)]
pub enum Error {
    /// Misconfiguration (missing service wallet, bad URL, ...). Never retried.
    Config(String),
    /// User-caused rejection with a machine-readable reason.
    Rejected(RejectReason),
    /// Chain gateway communication error.
    Rpc(String),
    /// Durable or ephemeral store error.
    Store(String),
    /// Single resource-provider call error.
    Provider(String),
    /// No resource provider responded to the availability probe.
    NoProviders,
    /// Every delegation attempt failed; one entry per provider tried.
    ProvidersExhausted(Vec<ProviderFailure>),
    /// The chain refused the raw transaction at broadcast.
    Broadcast(String),
    /// The broadcast transaction landed on-chain with a failure receipt.
    ChainFailure { tx_hash: String, reason: String },
    /// Confirmation polling budget exhausted without a receipt.
    ConfirmationTimeout { tx_hash: String, attempts: u32 },
}

impl Error {
    /// Stable machine-readable code for the HTTP layer.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config(_) => "config_error",
            Error::Rejected(reason) => reason.as_str(),
            Error::Rpc(_) => "rpc_error",
            Error::Store(_) => "store_error",
            Error::Provider(_) => "provider_error",
            Error::NoProviders => "no_providers_available",
            Error::ProvidersExhausted(_) => "all_providers_failed",
            Error::Broadcast(_) => "broadcast_failed",
            Error::ChainFailure { .. } => "chain_failure",
            Error::ConfirmationTimeout { .. } => "confirmation_timeout",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "config error: {msg}"),
            Error::Rejected(reason) => write!(f, "rejected: {reason}"),
            Error::Rpc(msg) => write!(f, "rpc error: {msg}"),
            Error::Store(msg) => write!(f, "store error: {msg}"),
            Error::Provider(msg) => write!(f, "provider error: {msg}"),
            Error::NoProviders => write!(f, "no energy providers available"),
            Error::ProvidersExhausted(failures) => {
                write!(f, "all energy providers failed:")?;
                for failure in failures {
                    write!(f, " [{}: {}]", failure.provider, failure.reason)?;
                }
                Ok(())
            }
            Error::Broadcast(msg) => write!(f, "broadcast failed: {msg}"),
            Error::ChainFailure { tx_hash, reason } => {
                write!(f, "transaction {tx_hash} failed on-chain: {reason}")
            }
            Error::ConfirmationTimeout { tx_hash, attempts } => {
                write!(f, "transaction {tx_hash} unconfirmed after {attempts} attempts")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<RejectReason> for Error {
    fn from(reason: RejectReason) -> Self {
        Error::Rejected(reason)
    }
}
