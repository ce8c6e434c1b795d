//! Behavioral abuse tracking.
//!
//! Every commit upserts the wallet/IP pair; abandoned commits and completed
//! top-ups feed counters that flag suspicious wallets. Flagging is advisory
//! and automatic; blacklisting is an operator action and is never cleared
//! automatically.

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::AbuseThresholds;
use crate::error::Error;
use crate::store::AbuseStore;
use crate::types::{AbuseIncident, AbuseSummary, UserStats};

pub struct AbuseTracker {
    store: Arc<dyn AbuseStore>,
    thresholds: AbuseThresholds,
}

impl AbuseTracker {
    pub fn new(store: Arc<dyn AbuseStore>, thresholds: AbuseThresholds) -> Self {
        Self { store, thresholds }
    }

    /// Record one commit attempt from a wallet/IP pair.
    pub async fn track_request(&self, wallet: &str, ip: &str) -> Result<(), Error> {
        self.store.upsert_request(&normalize(wallet), ip).await
    }

    pub async fn track_completion(&self, wallet: &str) -> Result<(), Error> {
        self.store.increment_completed(&normalize(wallet)).await
    }

    /// Record an abandoned commit and re-evaluate the flagging thresholds
    /// for the wallet. Thresholds are checked in a fixed order and the last
    /// one crossed supplies the flag reason.
    pub async fn track_abandonment(&self, wallet: &str, ip: &str) -> Result<(), Error> {
        let wallet = normalize(wallet);
        let wallet = wallet.as_str();
        self.store.record_abandonment(wallet, ip).await?;

        let stats = self.store.user_stats(wallet).await?;
        let mut reason: Option<String> = None;

        if let Some(stats) = &stats {
            if stats.abandoned_count >= self.thresholds.abandon_threshold_wallet {
                reason = Some(format!(
                    "{} abandoned transactions",
                    stats.abandoned_count
                ));
            }
            if stats.ip_addresses.len() >= self.thresholds.multi_ip_threshold {
                reason = Some(format!(
                    "wallet used from {} different IPs",
                    stats.ip_addresses.len()
                ));
            }
        }

        let ip_abandons = self.store.abandonments_from_ip(ip).await?;
        if ip_abandons >= self.thresholds.abandon_threshold_ip {
            reason = Some(format!("{ip_abandons} abandoned transactions from IP"));
        }

        let wallets = self.store.wallets_on_ip(ip).await?;
        if wallets >= self.thresholds.multi_wallet_threshold {
            reason = Some(format!("IP shared by {wallets} wallets"));
        }

        if let Some(reason) = reason {
            let already_flagged = stats.map(|s| s.flagged).unwrap_or(false);
            if !already_flagged {
                warn!(wallet, ip, %reason, "Wallet flagged for abuse");
                self.store.set_flag(wallet, true, Some(&reason)).await?;
            }
        }
        Ok(())
    }

    pub async fn is_blacklisted(&self, wallet: &str, ip: &str) -> Result<bool, Error> {
        self.store.is_blacklisted(&normalize(wallet), ip).await
    }

    /// Operator action. Blacklisting also flags; un-blacklisting leaves the
    /// flag in place for review.
    pub async fn set_blacklist(&self, wallet: &str, blacklisted: bool) -> Result<(), Error> {
        let wallet = normalize(wallet);
        info!(%wallet, blacklisted, "Blacklist updated");
        if blacklisted {
            self.store
                .set_flag(&wallet, true, Some("manually blacklisted"))
                .await?;
        }
        self.store.set_blacklist(&wallet, blacklisted).await
    }

    pub async fn clear_flag(&self, wallet: &str) -> Result<(), Error> {
        self.store.set_flag(&normalize(wallet), false, None).await
    }

    pub async fn user_stats(&self, wallet: &str) -> Result<Option<UserStats>, Error> {
        self.store.user_stats(&normalize(wallet)).await
    }

    pub async fn flagged_users(&self) -> Result<Vec<UserStats>, Error> {
        self.store.flagged_users().await
    }

    pub async fn blacklisted_users(&self) -> Result<Vec<UserStats>, Error> {
        self.store.blacklisted_users().await
    }

    pub async fn incidents(
        &self,
        wallet: Option<&str>,
        ip: Option<&str>,
        limit: i64,
    ) -> Result<Vec<AbuseIncident>, Error> {
        let wallet = wallet.map(normalize);
        self.store.incidents(wallet.as_deref(), ip, limit).await
    }

    pub async fn summary(&self) -> Result<AbuseSummary, Error> {
        self.store.summary().await
    }
}

/// Wallet keys are hex; store and look them up in one case so admin input
/// always matches what commits recorded.
fn normalize(wallet: &str) -> String {
    wallet.to_ascii_lowercase()
}
