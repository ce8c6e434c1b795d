//! Postgres-backed durable stores: transaction ledger, user behavior
//! counters, abuse incidents, and rate-limit windows.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use super::{AbuseStore, LedgerStore, RateLimitStore};
use crate::error::Error;
use crate::types::{
    AbuseIncident, AbuseSummary, NewTransaction, StatusUpdate, TxRecord, TxStatus, UserStats,
};

/// Schema embedded directly to avoid file path issues in containers.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS transactions (
  id UUID PRIMARY KEY,
  chain VARCHAR(10) NOT NULL CHECK (chain IN ('solana', 'tron')),
  tx_type VARCHAR(20) NOT NULL CHECK (tx_type IN ('topup', 'send')),
  user_address VARCHAR(100) NOT NULL,
  recipient_address VARCHAR(100),
  stablecoin_amount DOUBLE PRECISION NOT NULL,
  native_amount DOUBLE PRECISION,
  fee_charged DOUBLE PRECISION NOT NULL,
  fee_cost DOUBLE PRECISION,
  tx_hash VARCHAR(100),
  native_tx_hash VARCHAR(100),
  status VARCHAR(20) DEFAULT 'pending' CHECK (status IN ('pending', 'processing', 'completed', 'failed')),
  error_message TEXT,
  created_at TIMESTAMPTZ DEFAULT NOW(),
  completed_at TIMESTAMPTZ
);

CREATE TABLE IF NOT EXISTS service_wallets (
  id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
  chain VARCHAR(10) NOT NULL UNIQUE,
  address VARCHAR(100) NOT NULL,
  native_balance DOUBLE PRECISION DEFAULT 0,
  stablecoin_balance DOUBLE PRECISION DEFAULT 0,
  last_checked TIMESTAMPTZ
);

CREATE TABLE IF NOT EXISTS rate_limits (
  id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
  identifier VARCHAR(100) NOT NULL,
  request_count INT DEFAULT 0,
  window_start TIMESTAMPTZ DEFAULT NOW(),
  UNIQUE(identifier)
);

CREATE TABLE IF NOT EXISTS user_stats (
  wallet_address VARCHAR(50) PRIMARY KEY,
  ip_addresses TEXT[] DEFAULT '{}',
  total_requests INT DEFAULT 0,
  completed_count INT DEFAULT 0,
  abandoned_count INT DEFAULT 0,
  flagged BOOLEAN DEFAULT FALSE,
  flag_reason TEXT,
  blacklisted BOOLEAN DEFAULT FALSE,
  created_at TIMESTAMPTZ DEFAULT NOW(),
  last_seen_at TIMESTAMPTZ DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS abuse_incidents (
  id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
  wallet_address VARCHAR(50) NOT NULL,
  ip_address VARCHAR(50) NOT NULL,
  incident_type VARCHAR(50) NOT NULL,
  details JSONB DEFAULT '{}',
  created_at TIMESTAMPTZ DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_tx_user ON transactions(user_address);
CREATE INDEX IF NOT EXISTS idx_tx_status ON transactions(status);
CREATE INDEX IF NOT EXISTS idx_tx_created ON transactions(created_at);
CREATE INDEX IF NOT EXISTS idx_rate_identifier ON rate_limits(identifier);
CREATE INDEX IF NOT EXISTS idx_abuse_wallet ON abuse_incidents(wallet_address);
CREATE INDEX IF NOT EXISTS idx_abuse_ip ON abuse_incidents(ip_address);
CREATE INDEX IF NOT EXISTS idx_user_flagged ON user_stats(flagged) WHERE flagged = TRUE;
CREATE INDEX IF NOT EXISTS idx_user_blacklisted ON user_stats(blacklisted) WHERE blacklisted = TRUE;
"#;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await
            .map_err(|e| Error::Store(format!("postgres connect: {e}")))?;
        Ok(Self { pool })
    }

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Idempotent schema creation.
    pub async fn init_schema(&self) -> Result<(), Error> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Store(format!("schema init: {e}")))?;
        info!("Database schema initialized");
        Ok(())
    }

    /// Freshness probe for the health surface.
    pub async fn ping(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }
}

fn store_err(e: sqlx::Error) -> Error {
    Error::Store(e.to_string())
}

fn tx_record_from_row(row: &PgRow) -> Result<TxRecord, Error> {
    let status: String = row.try_get("status").map_err(store_err)?;
    Ok(TxRecord {
        id: row.try_get("id").map_err(store_err)?,
        chain: row.try_get("chain").map_err(store_err)?,
        tx_type: row.try_get("tx_type").map_err(store_err)?,
        user_address: row.try_get("user_address").map_err(store_err)?,
        recipient_address: row.try_get("recipient_address").map_err(store_err)?,
        stablecoin_amount: row.try_get("stablecoin_amount").map_err(store_err)?,
        native_amount: row.try_get("native_amount").map_err(store_err)?,
        fee_charged: row.try_get("fee_charged").map_err(store_err)?,
        fee_cost: row.try_get("fee_cost").map_err(store_err)?,
        tx_hash: row.try_get("tx_hash").map_err(store_err)?,
        native_tx_hash: row.try_get("native_tx_hash").map_err(store_err)?,
        status: status.parse::<TxStatus>().map_err(Error::Store)?,
        error_message: row.try_get("error_message").map_err(store_err)?,
        created_at: row.try_get("created_at").map_err(store_err)?,
        completed_at: row.try_get("completed_at").map_err(store_err)?,
    })
}

fn user_stats_from_row(row: &PgRow) -> Result<UserStats, Error> {
    Ok(UserStats {
        wallet_address: row.try_get("wallet_address").map_err(store_err)?,
        ip_addresses: row.try_get("ip_addresses").map_err(store_err)?,
        total_requests: row.try_get("total_requests").map_err(store_err)?,
        completed_count: row.try_get("completed_count").map_err(store_err)?,
        abandoned_count: row.try_get("abandoned_count").map_err(store_err)?,
        flagged: row.try_get("flagged").map_err(store_err)?,
        flag_reason: row.try_get("flag_reason").map_err(store_err)?,
        blacklisted: row.try_get("blacklisted").map_err(store_err)?,
        created_at: row.try_get("created_at").map_err(store_err)?,
        last_seen_at: row.try_get("last_seen_at").map_err(store_err)?,
    })
}

fn incident_from_row(row: &PgRow) -> Result<AbuseIncident, Error> {
    Ok(AbuseIncident {
        id: row.try_get("id").map_err(store_err)?,
        wallet_address: row.try_get("wallet_address").map_err(store_err)?,
        ip_address: row.try_get("ip_address").map_err(store_err)?,
        incident_type: row.try_get("incident_type").map_err(store_err)?,
        details: row.try_get("details").map_err(store_err)?,
        created_at: row.try_get("created_at").map_err(store_err)?,
    })
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn create(&self, tx: NewTransaction) -> Result<Uuid, Error> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"INSERT INTO transactions
               (id, chain, tx_type, user_address, recipient_address,
                stablecoin_amount, native_amount, fee_charged, status)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending')"#,
        )
        .bind(id)
        .bind(&tx.chain)
        .bind(&tx.tx_type)
        .bind(&tx.user_address)
        .bind(&tx.recipient_address)
        .bind(tx.stablecoin_amount)
        .bind(tx.native_amount)
        .bind(tx.fee_charged)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(id)
    }

    async fn update_status(&self, id: Uuid, update: StatusUpdate) -> Result<(), Error> {
        sqlx::query(
            r#"UPDATE transactions SET
                 status = COALESCE($2, status),
                 tx_hash = COALESCE($3, tx_hash),
                 native_tx_hash = COALESCE($4, native_tx_hash),
                 fee_cost = COALESCE($5, fee_cost),
                 error_message = COALESCE($6, error_message),
                 completed_at = CASE WHEN $2 IN ('completed', 'failed')
                                     THEN NOW() ELSE completed_at END
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(update.status.map(|s| s.as_str()))
        .bind(&update.tx_hash)
        .bind(&update.native_tx_hash)
        .bind(update.fee_cost)
        .bind(&update.error_message)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<TxRecord>, Error> {
        let row = sqlx::query("SELECT * FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        row.as_ref().map(tx_record_from_row).transpose()
    }

    async fn list_by_user(&self, address: &str, limit: i64) -> Result<Vec<TxRecord>, Error> {
        let rows = sqlx::query(
            "SELECT * FROM transactions WHERE user_address = $1
             ORDER BY created_at DESC LIMIT $2",
        )
        .bind(address)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.iter().map(tx_record_from_row).collect()
    }
}

#[async_trait]
impl AbuseStore for PgStore {
    async fn upsert_request(&self, wallet: &str, ip: &str) -> Result<(), Error> {
        sqlx::query(
            r#"INSERT INTO user_stats (wallet_address, ip_addresses, total_requests, last_seen_at)
               VALUES ($1, ARRAY[$2::text], 1, NOW())
               ON CONFLICT (wallet_address) DO UPDATE SET
                 ip_addresses = CASE
                   WHEN NOT ($2 = ANY(user_stats.ip_addresses))
                   THEN array_append(user_stats.ip_addresses, $2)
                   ELSE user_stats.ip_addresses
                 END,
                 total_requests = user_stats.total_requests + 1,
                 last_seen_at = NOW()"#,
        )
        .bind(wallet)
        .bind(ip)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn increment_completed(&self, wallet: &str) -> Result<(), Error> {
        sqlx::query(
            "UPDATE user_stats SET completed_count = completed_count + 1
             WHERE wallet_address = $1",
        )
        .bind(wallet)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn record_abandonment(&self, wallet: &str, ip: &str) -> Result<(), Error> {
        sqlx::query(
            "UPDATE user_stats SET abandoned_count = abandoned_count + 1
             WHERE wallet_address = $1",
        )
        .bind(wallet)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        sqlx::query(
            "INSERT INTO abuse_incidents (wallet_address, ip_address, incident_type, details)
             VALUES ($1, $2, 'abandoned', '{}')",
        )
        .bind(wallet)
        .bind(ip)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn user_stats(&self, wallet: &str) -> Result<Option<UserStats>, Error> {
        let row = sqlx::query("SELECT * FROM user_stats WHERE wallet_address = $1")
            .bind(wallet)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        row.as_ref().map(user_stats_from_row).transpose()
    }

    async fn abandonments_from_ip(&self, ip: &str) -> Result<i64, Error> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM abuse_incidents
             WHERE ip_address = $1 AND incident_type = 'abandoned'",
        )
        .bind(ip)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;
        row.try_get("count").map_err(store_err)
    }

    async fn wallets_on_ip(&self, ip: &str) -> Result<i64, Error> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM user_stats WHERE $1 = ANY(ip_addresses)",
        )
        .bind(ip)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;
        row.try_get("count").map_err(store_err)
    }

    async fn set_flag(
        &self,
        wallet: &str,
        flagged: bool,
        reason: Option<&str>,
    ) -> Result<(), Error> {
        sqlx::query(
            "UPDATE user_stats SET flagged = $2, flag_reason = $3 WHERE wallet_address = $1",
        )
        .bind(wallet)
        .bind(flagged)
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn set_blacklist(&self, wallet: &str, blacklisted: bool) -> Result<(), Error> {
        sqlx::query("UPDATE user_stats SET blacklisted = $2 WHERE wallet_address = $1")
            .bind(wallet)
            .bind(blacklisted)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn is_blacklisted(&self, wallet: &str, ip: &str) -> Result<bool, Error> {
        let row = sqlx::query(
            r#"SELECT EXISTS(
                 SELECT 1 FROM user_stats
                 WHERE (wallet_address = $1 OR $2 = ANY(ip_addresses))
                   AND blacklisted = TRUE
               ) AS hit"#,
        )
        .bind(wallet)
        .bind(ip)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;
        row.try_get("hit").map_err(store_err)
    }

    async fn flagged_users(&self) -> Result<Vec<UserStats>, Error> {
        let rows = sqlx::query(
            "SELECT * FROM user_stats WHERE flagged = TRUE ORDER BY abandoned_count DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.iter().map(user_stats_from_row).collect()
    }

    async fn blacklisted_users(&self) -> Result<Vec<UserStats>, Error> {
        let rows = sqlx::query(
            "SELECT * FROM user_stats WHERE blacklisted = TRUE ORDER BY last_seen_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.iter().map(user_stats_from_row).collect()
    }

    async fn incidents(
        &self,
        wallet: Option<&str>,
        ip: Option<&str>,
        limit: i64,
    ) -> Result<Vec<AbuseIncident>, Error> {
        let rows = sqlx::query(
            r#"SELECT * FROM abuse_incidents
               WHERE ($1::text IS NULL OR wallet_address = $1)
                 AND ($2::text IS NULL OR ip_address = $2)
               ORDER BY created_at DESC LIMIT $3"#,
        )
        .bind(wallet)
        .bind(ip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.iter().map(incident_from_row).collect()
    }

    async fn summary(&self) -> Result<AbuseSummary, Error> {
        let row = sqlx::query(
            r#"SELECT
                 (SELECT COUNT(*) FROM user_stats) AS total_users,
                 (SELECT COUNT(*) FROM user_stats WHERE flagged = TRUE) AS flagged_users,
                 (SELECT COUNT(*) FROM user_stats WHERE blacklisted = TRUE) AS blacklisted_users,
                 (SELECT COUNT(*) FROM abuse_incidents
                   WHERE incident_type = 'abandoned') AS total_abandons"#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(AbuseSummary {
            total_users: row.try_get("total_users").map_err(store_err)?,
            flagged_users: row.try_get("flagged_users").map_err(store_err)?,
            blacklisted_users: row.try_get("blacklisted_users").map_err(store_err)?,
            total_abandons: row.try_get("total_abandons").map_err(store_err)?,
        })
    }
}

#[async_trait]
impl RateLimitStore for PgStore {
    async fn hit(&self, identifier: &str, window: Duration) -> Result<i64, Error> {
        let row = sqlx::query(
            r#"INSERT INTO rate_limits (identifier, request_count, window_start)
               VALUES ($1, 1, NOW())
               ON CONFLICT (identifier) DO UPDATE SET
                 request_count = CASE
                   WHEN rate_limits.window_start < NOW() - make_interval(secs => $2)
                   THEN 1 ELSE rate_limits.request_count + 1
                 END,
                 window_start = CASE
                   WHEN rate_limits.window_start < NOW() - make_interval(secs => $2)
                   THEN NOW() ELSE rate_limits.window_start
                 END
               RETURNING request_count"#,
        )
        .bind(identifier)
        .bind(window.as_secs_f64())
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;
        let count: i32 = row.try_get("request_count").map_err(store_err)?;
        Ok(count as i64)
    }
}

