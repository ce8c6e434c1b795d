//! # Gas Station
//!
//! A commit-reveal relay that turns stablecoin payments into native gas.
//! A user signs a USDT transfer to the service wallet, commits it for
//! validation, then executes: the relay delegates energy to the user,
//! broadcasts their payment, waits for on-chain confirmation, and pays out
//! TRX from the service wallet.
//!
//! ## Flow
//! - `quote` - price a prospective top-up against live energy markets
//! - `commit` - validate the signed payment and reserve it under a TTL
//! - `execute` - redeem the commit: delegate, broadcast, confirm, pay out

pub mod abuse;
pub mod config;
pub mod coordinator;
pub mod decoder;
mod error;
pub mod providers;
pub mod quote;
pub mod rate_limit;
pub mod rpc;
mod state;
pub mod store;
pub mod types;

pub use config::Config;
pub use coordinator::Coordinator;
pub use error::{Error, ProviderFailure, RejectReason};
pub use quote::QuoteEngine;
pub use state::{AppState, HealthReport};
