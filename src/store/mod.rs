//! Narrow persistence interfaces.
//!
//! The coordinator and abuse tracker only ever see these traits; the
//! concrete backends are Redis for the TTL-bound pending commits and
//! Postgres for everything durable. The in-memory backend exists for
//! tests and local development.

pub mod memory;
pub mod postgres;
pub mod redis;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use redis::RedisPendingStore;

use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

use crate::error::Error;
use crate::types::{
    AbuseIncident, AbuseSummary, NewTransaction, PendingCommit, StatusUpdate, TxRecord, UserStats,
};

/// Ephemeral, TTL-bound bridge between commit and execute.
#[async_trait]
pub trait PendingStore: Send + Sync {
    async fn put(
        &self,
        commit_id: Uuid,
        pending: &PendingCommit,
        ttl_secs: u64,
    ) -> Result<(), Error>;

    /// Atomically fetch-and-delete. The second of two concurrent takers
    /// observes `None`; so does any caller after the TTL has elapsed.
    async fn take(&self, commit_id: Uuid) -> Result<Option<PendingCommit>, Error>;

    /// Non-consuming read, for status inspection.
    async fn get(&self, commit_id: Uuid) -> Result<Option<PendingCommit>, Error>;

    async fn delete(&self, commit_id: Uuid) -> Result<(), Error>;

    async fn list_ids(&self) -> Result<Vec<String>, Error>;

    /// Seconds until expiry, `None` when the key is gone.
    async fn ttl_remaining(&self, commit_id: Uuid) -> Result<Option<i64>, Error>;
}

/// Durable record of every top-up attempt.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn create(&self, tx: NewTransaction) -> Result<Uuid, Error>;

    /// Single-row conditional update; terminal statuses set `completed_at`.
    async fn update_status(&self, id: Uuid, update: StatusUpdate) -> Result<(), Error>;

    async fn get(&self, id: Uuid) -> Result<Option<TxRecord>, Error>;

    async fn list_by_user(&self, address: &str, limit: i64) -> Result<Vec<TxRecord>, Error>;
}

/// Behavioral ledger keyed by wallet and IP.
#[async_trait]
pub trait AbuseStore: Send + Sync {
    /// Upsert: add the IP if new, bump the request counter, touch last-seen.
    async fn upsert_request(&self, wallet: &str, ip: &str) -> Result<(), Error>;

    async fn increment_completed(&self, wallet: &str) -> Result<(), Error>;

    /// Bump the abandonment counter and append an incident row.
    async fn record_abandonment(&self, wallet: &str, ip: &str) -> Result<(), Error>;

    async fn user_stats(&self, wallet: &str) -> Result<Option<UserStats>, Error>;

    /// Abandonment incidents recorded for one IP, across all wallets.
    async fn abandonments_from_ip(&self, ip: &str) -> Result<i64, Error>;

    /// Distinct wallets that have used one IP.
    async fn wallets_on_ip(&self, ip: &str) -> Result<i64, Error>;

    async fn set_flag(&self, wallet: &str, flagged: bool, reason: Option<&str>)
        -> Result<(), Error>;

    async fn set_blacklist(&self, wallet: &str, blacklisted: bool) -> Result<(), Error>;

    /// True when the wallet, or any wallet sharing the IP, is blacklisted.
    async fn is_blacklisted(&self, wallet: &str, ip: &str) -> Result<bool, Error>;

    async fn flagged_users(&self) -> Result<Vec<UserStats>, Error>;

    async fn blacklisted_users(&self) -> Result<Vec<UserStats>, Error>;

    async fn incidents(
        &self,
        wallet: Option<&str>,
        ip: Option<&str>,
        limit: i64,
    ) -> Result<Vec<AbuseIncident>, Error>;

    async fn summary(&self) -> Result<AbuseSummary, Error>;
}

/// Fixed-window request counter.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Increment the identifier's counter, resetting it first when the
    /// window has lapsed. Returns the count inside the current window.
    async fn hit(&self, identifier: &str, window: Duration) -> Result<i64, Error>;
}
