//! In-memory store for tests and local development.
//!
//! Implements every store trait behind plain mutexed maps. The ledger
//! half enforces the monotonic status transition rule so tests exercise
//! the same contract the relational backend guarantees.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::{AbuseStore, LedgerStore, PendingStore, RateLimitStore};
use crate::error::Error;
use crate::types::{
    AbuseIncident, AbuseSummary, NewTransaction, PendingCommit, StatusUpdate, TxRecord, TxStatus,
    UserStats,
};

#[derive(Default)]
pub struct MemoryStore {
    pending: Mutex<HashMap<Uuid, (PendingCommit, Option<Instant>)>>,
    ledger: Mutex<HashMap<Uuid, TxRecord>>,
    users: Mutex<HashMap<String, UserStats>>,
    incidents: Mutex<Vec<AbuseIncident>>,
    rate: Mutex<HashMap<String, (i64, Instant)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock<'a, T>(mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
        mutex.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl PendingStore for MemoryStore {
    async fn put(
        &self,
        commit_id: Uuid,
        pending: &PendingCommit,
        ttl_secs: u64,
    ) -> Result<(), Error> {
        let deadline = Instant::now().checked_add(Duration::from_secs(ttl_secs));
        Self::lock(&self.pending).insert(commit_id, (pending.clone(), deadline));
        Ok(())
    }

    async fn take(&self, commit_id: Uuid) -> Result<Option<PendingCommit>, Error> {
        let mut pending = Self::lock(&self.pending);
        match pending.remove(&commit_id) {
            Some((value, deadline)) if deadline.map(|d| d > Instant::now()).unwrap_or(false) => {
                Ok(Some(value))
            }
            _ => Ok(None),
        }
    }

    async fn get(&self, commit_id: Uuid) -> Result<Option<PendingCommit>, Error> {
        let pending = Self::lock(&self.pending);
        Ok(pending.get(&commit_id).and_then(|(value, deadline)| {
            deadline
                .map(|d| d > Instant::now())
                .unwrap_or(false)
                .then(|| value.clone())
        }))
    }

    async fn delete(&self, commit_id: Uuid) -> Result<(), Error> {
        Self::lock(&self.pending).remove(&commit_id);
        Ok(())
    }

    async fn list_ids(&self) -> Result<Vec<String>, Error> {
        let now = Instant::now();
        Ok(Self::lock(&self.pending)
            .iter()
            .filter(|(_, (_, deadline))| deadline.map(|d| d > now).unwrap_or(false))
            .map(|(id, _)| id.to_string())
            .collect())
    }

    async fn ttl_remaining(&self, commit_id: Uuid) -> Result<Option<i64>, Error> {
        let pending = Self::lock(&self.pending);
        Ok(pending.get(&commit_id).and_then(|(_, deadline)| {
            deadline.and_then(|d| {
                let left = d.saturating_duration_since(Instant::now()).as_secs() as i64;
                (left > 0).then_some(left)
            })
        }))
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn create(&self, tx: NewTransaction) -> Result<Uuid, Error> {
        let id = Uuid::new_v4();
        let record = TxRecord {
            id,
            chain: tx.chain,
            tx_type: tx.tx_type,
            user_address: tx.user_address,
            recipient_address: tx.recipient_address,
            stablecoin_amount: tx.stablecoin_amount,
            native_amount: tx.native_amount,
            fee_charged: tx.fee_charged,
            fee_cost: None,
            tx_hash: None,
            native_tx_hash: None,
            status: TxStatus::Pending,
            error_message: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        Self::lock(&self.ledger).insert(id, record);
        Ok(id)
    }

    async fn update_status(&self, id: Uuid, update: StatusUpdate) -> Result<(), Error> {
        let mut ledger = Self::lock(&self.ledger);
        let record = ledger
            .get_mut(&id)
            .ok_or_else(|| Error::Store(format!("transaction {id} not found")))?;
        if let Some(next) = update.status {
            if !record.status.can_advance_to(next) {
                return Err(Error::Store(format!(
                    "illegal status transition {} -> {}",
                    record.status.as_str(),
                    next.as_str()
                )));
            }
            record.status = next;
            if next.is_terminal() {
                record.completed_at = Some(Utc::now());
            }
        }
        if let Some(hash) = update.tx_hash {
            record.tx_hash = Some(hash);
        }
        if let Some(hash) = update.native_tx_hash {
            record.native_tx_hash = Some(hash);
        }
        if let Some(cost) = update.fee_cost {
            record.fee_cost = Some(cost);
        }
        if let Some(message) = update.error_message {
            record.error_message = Some(message);
        }
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<TxRecord>, Error> {
        Ok(Self::lock(&self.ledger).get(&id).cloned())
    }

    async fn list_by_user(&self, address: &str, limit: i64) -> Result<Vec<TxRecord>, Error> {
        let ledger = Self::lock(&self.ledger);
        let mut rows: Vec<TxRecord> = ledger
            .values()
            .filter(|r| r.user_address == address)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }
}

#[async_trait]
impl AbuseStore for MemoryStore {
    async fn upsert_request(&self, wallet: &str, ip: &str) -> Result<(), Error> {
        let mut users = Self::lock(&self.users);
        let now = Utc::now();
        let stats = users.entry(wallet.to_string()).or_insert_with(|| UserStats {
            wallet_address: wallet.to_string(),
            ip_addresses: Vec::new(),
            total_requests: 0,
            completed_count: 0,
            abandoned_count: 0,
            flagged: false,
            flag_reason: None,
            blacklisted: false,
            created_at: now,
            last_seen_at: now,
        });
        if !stats.ip_addresses.iter().any(|known| known == ip) {
            stats.ip_addresses.push(ip.to_string());
        }
        stats.total_requests += 1;
        stats.last_seen_at = now;
        Ok(())
    }

    async fn increment_completed(&self, wallet: &str) -> Result<(), Error> {
        if let Some(stats) = Self::lock(&self.users).get_mut(wallet) {
            stats.completed_count += 1;
        }
        Ok(())
    }

    async fn record_abandonment(&self, wallet: &str, ip: &str) -> Result<(), Error> {
        if let Some(stats) = Self::lock(&self.users).get_mut(wallet) {
            stats.abandoned_count += 1;
        }
        Self::lock(&self.incidents).push(AbuseIncident {
            id: Uuid::new_v4(),
            wallet_address: wallet.to_string(),
            ip_address: ip.to_string(),
            incident_type: "abandoned".to_string(),
            details: serde_json::json!({}),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn user_stats(&self, wallet: &str) -> Result<Option<UserStats>, Error> {
        Ok(Self::lock(&self.users).get(wallet).cloned())
    }

    async fn abandonments_from_ip(&self, ip: &str) -> Result<i64, Error> {
        Ok(Self::lock(&self.incidents)
            .iter()
            .filter(|i| i.ip_address == ip && i.incident_type == "abandoned")
            .count() as i64)
    }

    async fn wallets_on_ip(&self, ip: &str) -> Result<i64, Error> {
        Ok(Self::lock(&self.users)
            .values()
            .filter(|stats| stats.ip_addresses.iter().any(|known| known == ip))
            .count() as i64)
    }

    async fn set_flag(
        &self,
        wallet: &str,
        flagged: bool,
        reason: Option<&str>,
    ) -> Result<(), Error> {
        if let Some(stats) = Self::lock(&self.users).get_mut(wallet) {
            stats.flagged = flagged;
            stats.flag_reason = reason.map(str::to_string);
        }
        Ok(())
    }

    async fn set_blacklist(&self, wallet: &str, blacklisted: bool) -> Result<(), Error> {
        if let Some(stats) = Self::lock(&self.users).get_mut(wallet) {
            stats.blacklisted = blacklisted;
        }
        Ok(())
    }

    async fn is_blacklisted(&self, wallet: &str, ip: &str) -> Result<bool, Error> {
        Ok(Self::lock(&self.users).values().any(|stats| {
            stats.blacklisted
                && (stats.wallet_address == wallet
                    || stats.ip_addresses.iter().any(|known| known == ip))
        }))
    }

    async fn flagged_users(&self) -> Result<Vec<UserStats>, Error> {
        let mut rows: Vec<UserStats> = Self::lock(&self.users)
            .values()
            .filter(|stats| stats.flagged)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.abandoned_count.cmp(&a.abandoned_count));
        Ok(rows)
    }

    async fn blacklisted_users(&self) -> Result<Vec<UserStats>, Error> {
        let mut rows: Vec<UserStats> = Self::lock(&self.users)
            .values()
            .filter(|stats| stats.blacklisted)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.last_seen_at.cmp(&a.last_seen_at));
        Ok(rows)
    }

    async fn incidents(
        &self,
        wallet: Option<&str>,
        ip: Option<&str>,
        limit: i64,
    ) -> Result<Vec<AbuseIncident>, Error> {
        let mut rows: Vec<AbuseIncident> = Self::lock(&self.incidents)
            .iter()
            .filter(|i| wallet.map(|w| i.wallet_address == w).unwrap_or(true))
            .filter(|i| ip.map(|p| i.ip_address == p).unwrap_or(true))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn summary(&self) -> Result<AbuseSummary, Error> {
        let users = Self::lock(&self.users);
        let incidents = Self::lock(&self.incidents);
        Ok(AbuseSummary {
            total_users: users.len() as i64,
            flagged_users: users.values().filter(|s| s.flagged).count() as i64,
            blacklisted_users: users.values().filter(|s| s.blacklisted).count() as i64,
            total_abandons: incidents
                .iter()
                .filter(|i| i.incident_type == "abandoned")
                .count() as i64,
        })
    }
}

#[async_trait]
impl RateLimitStore for MemoryStore {
    async fn hit(&self, identifier: &str, window: Duration) -> Result<i64, Error> {
        let mut rate = Self::lock(&self.rate);
        let now = Instant::now();
        let entry = rate.entry(identifier.to_string()).or_insert((0, now));
        if now.duration_since(entry.1) >= window {
            *entry = (0, now);
        }
        entry.0 += 1;
        Ok(entry.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::tests::make_signed_tx;
    use crate::decoder::tests::SERVICE_WALLET;

    fn make_pending() -> PendingCommit {
        PendingCommit {
            signed_tx: make_signed_tx(SERVICE_WALLET, 10_000_000, i64::MAX),
            quote_id: Uuid::new_v4(),
            user_address: "41user".into(),
            ip_address: "10.0.0.1".into(),
            usdt_amount: 10.0,
            trx_amount: 59.375,
            created_at: crate::types::now_ms(),
        }
    }

    #[tokio::test]
    async fn test_take_consumes_exactly_once() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        store.put(id, &make_pending(), 300).await.unwrap();
        assert!(store.take(id).await.unwrap().is_some());
        assert!(store.take(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_pending_is_absent() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        store.put(id, &make_pending(), 0).await.unwrap();
        assert!(PendingStore::get(&store, id).await.unwrap().is_none());
        assert!(store.take(id).await.unwrap().is_none());
        assert!(store.ttl_remaining(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ledger_rejects_backward_transition() {
        let store = MemoryStore::new();
        let id = store
            .create(NewTransaction {
                chain: "tron".into(),
                tx_type: "topup".into(),
                user_address: "41user".into(),
                recipient_address: None,
                stablecoin_amount: 10.0,
                native_amount: None,
                fee_charged: 0.5,
            })
            .await
            .unwrap();

        store
            .update_status(id, StatusUpdate::status(TxStatus::Processing))
            .await
            .unwrap();
        store
            .update_status(id, StatusUpdate::status(TxStatus::Completed))
            .await
            .unwrap();

        let record = LedgerStore::get(&store, id).await.unwrap().unwrap();
        assert_eq!(record.status, TxStatus::Completed);
        assert!(record.completed_at.is_some());

        // Terminal rows never move again.
        assert!(store
            .update_status(id, StatusUpdate::status(TxStatus::Processing))
            .await
            .is_err());
        assert!(store
            .update_status(id, StatusUpdate::failed("too late"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_completed_at_only_on_terminal() {
        let store = MemoryStore::new();
        let id = store
            .create(NewTransaction {
                chain: "tron".into(),
                tx_type: "topup".into(),
                user_address: "41user".into(),
                recipient_address: None,
                stablecoin_amount: 10.0,
                native_amount: None,
                fee_charged: 0.5,
            })
            .await
            .unwrap();
        store
            .update_status(id, StatusUpdate::status(TxStatus::Processing))
            .await
            .unwrap();
        assert!(LedgerStore::get(&store, id)
            .await
            .unwrap()
            .unwrap()
            .completed_at
            .is_none());
        store
            .update_status(id, StatusUpdate::failed("provider down"))
            .await
            .unwrap();
        let record = LedgerStore::get(&store, id).await.unwrap().unwrap();
        assert!(record.completed_at.is_some());
        assert_eq!(record.error_message.as_deref(), Some("provider down"));
    }

    #[tokio::test]
    async fn test_rate_limit_window() {
        let store = MemoryStore::new();
        let window = Duration::from_secs(60);
        assert_eq!(store.hit("1.2.3.4", window).await.unwrap(), 1);
        assert_eq!(store.hit("1.2.3.4", window).await.unwrap(), 2);
        assert_eq!(store.hit("5.6.7.8", window).await.unwrap(), 1);
        // Zero-length window resets on every hit.
        assert_eq!(store.hit("1.2.3.4", Duration::ZERO).await.unwrap(), 1);
        assert_eq!(store.hit("1.2.3.4", Duration::ZERO).await.unwrap(), 1);
    }
}
