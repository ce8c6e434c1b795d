//! Process-scoped application state.
//!
//! Everything is constructed exactly once at startup and handed out by
//! reference; nothing lazily self-initializes. Swapping provider
//! credentials at runtime is an explicit [`AppState::reconfigure_providers`]
//! call, not a check hidden on a hot path.

use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::abuse::AbuseTracker;
use crate::config::{Config, ProvidersConfig};
use crate::coordinator::Coordinator;
use crate::error::Error;
use crate::providers::ProviderManager;
use crate::quote::QuoteEngine;
use crate::rate_limit::RateLimiter;
use crate::rpc::{ChainRpc, HttpChainClient};
use crate::store::{AbuseStore, LedgerStore, PendingStore, PgStore, RateLimitStore, RedisPendingStore};

pub struct AppState {
    pub config: Config,
    pub coordinator: Arc<Coordinator>,
    pub quote_engine: Arc<QuoteEngine>,
    pub abuse: Arc<AbuseTracker>,
    pub ledger: Arc<dyn LedgerStore>,
    pub pending: Arc<dyn PendingStore>,
    pub chain: Arc<HttpChainClient>,
    pub providers: Arc<ProviderManager>,
    db: Arc<PgStore>,
    rate_limiter: Arc<RateLimiter>,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    /// "ok" or "degraded" (fallback gateway in use).
    pub gateway: String,
    pub database: bool,
    pub available_providers: Vec<String>,
    pub pending_commits: usize,
}

impl AppState {
    /// Connect every backend and wire the component graph.
    pub async fn new(config: Config) -> Result<Self, Error> {
        let db = Arc::new(PgStore::connect(&config.database_url).await?);
        db.init_schema().await?;
        let pending: Arc<dyn PendingStore> =
            Arc::new(RedisPendingStore::connect(&config.redis_url).await?);

        let chain = Arc::new(HttpChainClient::new(
            &config.rpc_url,
            &config.fallback_rpc_url,
            config.service_private_key.clone(),
        )?);
        let providers = Arc::new(ProviderManager::from_config(&config.providers));

        let abuse = Arc::new(AbuseTracker::new(
            Arc::clone(&db) as Arc<dyn AbuseStore>,
            config.abuse,
        ));
        let rate_limiter = Arc::new(RateLimiter::new(
            Arc::clone(&db) as Arc<dyn RateLimitStore>,
            config.rate_limit_per_min,
        ));

        let quote_engine = Arc::new(QuoteEngine::new(
            Arc::clone(&providers),
            config.pricing.clone(),
            config.energy_per_topup,
            config.quote_ttl_ms,
        ));
        let coordinator = Arc::new(Coordinator::new(
            config.clone(),
            Arc::clone(&pending),
            Arc::clone(&db) as Arc<dyn LedgerStore>,
            Arc::clone(&abuse),
            Arc::clone(&rate_limiter),
            Arc::clone(&chain) as Arc<dyn ChainRpc>,
            Arc::clone(&providers),
        ));

        info!(
            rpc = %config.rpc_url,
            providers = ?providers.provider_names(),
            "Gas station state initialized"
        );
        Ok(Self {
            ledger: Arc::clone(&db) as Arc<dyn LedgerStore>,
            config,
            coordinator,
            quote_engine,
            abuse,
            pending,
            chain,
            providers,
            db,
            rate_limiter,
        })
    }

    /// Rebuild the provider manager (and everything holding it) from new
    /// credentials. Stores and the chain client are untouched.
    pub fn reconfigure_providers(&mut self, providers_config: &ProvidersConfig) {
        let providers = Arc::new(ProviderManager::from_config(providers_config));
        info!(providers = ?providers.provider_names(), "Providers reconfigured");

        self.quote_engine = Arc::new(QuoteEngine::new(
            Arc::clone(&providers),
            self.config.pricing.clone(),
            self.config.energy_per_topup,
            self.config.quote_ttl_ms,
        ));
        self.coordinator = Arc::new(Coordinator::new(
            self.config.clone(),
            Arc::clone(&self.pending),
            Arc::clone(&self.ledger),
            Arc::clone(&self.abuse),
            Arc::clone(&self.rate_limiter),
            Arc::clone(&self.chain) as Arc<dyn ChainRpc>,
            Arc::clone(&providers),
        ));
        self.providers = providers;
        self.config.providers = providers_config.clone();
    }

    /// Liveness of every backend in one shot.
    pub async fn health(&self) -> Result<HealthReport, Error> {
        let gateway = self.chain.health_check().await?.to_string();
        let database = self.db.ping().await.is_ok();
        let available_providers = self
            .providers
            .list_available()
            .await
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        let pending_commits = self.pending.list_ids().await?.len();
        Ok(HealthReport {
            gateway,
            database,
            available_providers,
            pending_commits,
        })
    }
}
