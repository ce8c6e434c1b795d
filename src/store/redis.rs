//! Redis-backed pending-commit store.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::info;
use uuid::Uuid;

use super::PendingStore;
use crate::error::Error;
use crate::types::PendingCommit;

const KEY_PREFIX: &str = "pending:tx:";

/// Pending commits live in Redis under `pending:tx:{commit_id}` with a
/// native TTL; expiry needs no sweeper. `GETDEL` gives the atomic
/// consume-once read that the execute path relies on.
pub struct RedisPendingStore {
    conn: ConnectionManager,
}

impl RedisPendingStore {
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let client = redis::Client::open(url)
            .map_err(|e| Error::Config(format!("invalid redis url: {e}")))?;
        let conn = client
            .get_tokio_connection_manager()
            .await
            .map_err(|e| Error::Store(format!("redis connect: {e}")))?;
        info!(url, "Redis pending store connected");
        Ok(Self { conn })
    }

    fn key(commit_id: Uuid) -> String {
        format!("{KEY_PREFIX}{commit_id}")
    }

    fn decode(payload: Option<String>) -> Result<Option<PendingCommit>, Error> {
        payload
            .map(|raw| {
                serde_json::from_str(&raw)
                    .map_err(|e| Error::Store(format!("corrupt pending commit: {e}")))
            })
            .transpose()
    }
}

#[async_trait]
impl PendingStore for RedisPendingStore {
    async fn put(
        &self,
        commit_id: Uuid,
        pending: &PendingCommit,
        ttl_secs: u64,
    ) -> Result<(), Error> {
        let payload = serde_json::to_string(pending)
            .map_err(|e| Error::Store(format!("unserializable pending commit: {e}")))?;
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(Self::key(commit_id))
            .arg(payload)
            .arg("EX")
            .arg(ttl_secs)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| Error::Store(format!("redis set: {e}")))
    }

    async fn take(&self, commit_id: Uuid) -> Result<Option<PendingCommit>, Error> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = redis::cmd("GETDEL")
            .arg(Self::key(commit_id))
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Store(format!("redis getdel: {e}")))?;
        Self::decode(payload)
    }

    async fn get(&self, commit_id: Uuid) -> Result<Option<PendingCommit>, Error> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = redis::cmd("GET")
            .arg(Self::key(commit_id))
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Store(format!("redis get: {e}")))?;
        Self::decode(payload)
    }

    async fn delete(&self, commit_id: Uuid) -> Result<(), Error> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(Self::key(commit_id))
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| Error::Store(format!("redis del: {e}")))
    }

    async fn list_ids(&self) -> Result<Vec<String>, Error> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(format!("{KEY_PREFIX}*"))
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Store(format!("redis keys: {e}")))?;
        Ok(keys
            .into_iter()
            .map(|key| key.trim_start_matches(KEY_PREFIX).to_string())
            .collect())
    }

    async fn ttl_remaining(&self, commit_id: Uuid) -> Result<Option<i64>, Error> {
        let mut conn = self.conn.clone();
        let ttl: i64 = redis::cmd("TTL")
            .arg(Self::key(commit_id))
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Store(format!("redis ttl: {e}")))?;
        // -2 = missing key, -1 = no expiry set; both mean "not pending".
        Ok((ttl >= 0).then_some(ttl))
    }
}
