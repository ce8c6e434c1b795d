//! Energy delegation providers and the ordered-fallback manager.
//!
//! Availability probes and price queries fan out in parallel; delegation
//! attempts run strictly one at a time. A delegation order costs money and
//! is not idempotent, so two providers must never be paid for the same
//! top-up.

mod apitrx;
mod tronsave;

pub use apitrx::ApitrxProvider;
pub use tronsave::TronsaveProvider;

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::ProvidersConfig;
use crate::error::{Error, ProviderFailure};

/// Per-probe timeout for availability checks.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// A priced estimate from one provider.
#[derive(Debug, Clone)]
pub struct EnergyEstimate {
    pub provider: String,
    pub energy: u64,
    pub cost_trx: f64,
    pub cost_usd: f64,
}

/// A placed delegation order.
#[derive(Debug, Clone)]
pub struct EnergyOrder {
    pub provider: String,
    pub order_id: String,
    pub energy_delegated: u64,
    pub cost_trx: f64,
    /// Epoch milliseconds at which the delegation lapses.
    pub expires_at: i64,
}

/// The four-operation contract every provider implements.
#[async_trait]
pub trait EnergyProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn is_available(&self) -> bool;

    async fn estimate(&self, recipient: &str, energy: u64) -> Result<EnergyEstimate, Error>;

    async fn delegate(&self, recipient: &str, energy: u64) -> Result<EnergyOrder, Error>;

    async fn order_status(&self, order_id: &str) -> Result<String, Error>;
}

/// Ordered list of configured providers with availability probing, price
/// comparison, and serial fallback.
pub struct ProviderManager {
    providers: Vec<Arc<dyn EnergyProvider>>,
    primary: Option<String>,
}

impl ProviderManager {
    /// Build from configuration. Providers without credentials are never
    /// added; the first configured provider becomes the primary.
    pub fn from_config(config: &ProvidersConfig) -> Self {
        let mut providers: Vec<Arc<dyn EnergyProvider>> = Vec::new();
        if let Some(creds) = &config.apitrx {
            providers.push(Arc::new(ApitrxProvider::new(
                creds.api_key.clone(),
                creds.base_url.clone(),
            )));
        }
        if let Some(creds) = &config.tronsave {
            providers.push(Arc::new(TronsaveProvider::new(
                creds.api_key.clone(),
                creds.base_url.clone(),
            )));
        }
        let primary = providers.first().map(|p| p.name().to_string());
        info!(
            providers = ?providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            primary = ?primary,
            "Energy provider manager initialized"
        );
        Self { providers, primary }
    }

    /// Manager over an explicit provider list; first entry is primary.
    pub fn new(providers: Vec<Arc<dyn EnergyProvider>>) -> Self {
        let primary = providers.first().map(|p| p.name().to_string());
        Self { providers, primary }
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Probe all configured providers concurrently; keep responders.
    pub async fn list_available(&self) -> Vec<Arc<dyn EnergyProvider>> {
        let probes = self.providers.iter().map(|provider| async {
            let up = tokio::time::timeout(PROBE_TIMEOUT, provider.is_available())
                .await
                .unwrap_or(false);
            (Arc::clone(provider), up)
        });
        join_all(probes)
            .await
            .into_iter()
            .filter(|(_, up)| *up)
            .map(|(provider, _)| provider)
            .collect()
    }

    /// Lowest-cost estimate across all available providers. Parallel
    /// fan-out; read-only, so concurrency is safe here.
    pub async fn best_quote(&self, recipient: &str, energy: u64) -> Result<EnergyEstimate, Error> {
        let available = self.list_available().await;
        if available.is_empty() {
            return Err(Error::NoProviders);
        }

        let quotes = join_all(
            available
                .iter()
                .map(|provider| provider.estimate(recipient, energy)),
        )
        .await;

        let mut failures = Vec::new();
        let mut best: Option<EnergyEstimate> = None;
        for (provider, quote) in available.iter().zip(quotes) {
            match quote {
                Ok(estimate) => {
                    if best
                        .as_ref()
                        .map(|b| estimate.cost_trx < b.cost_trx)
                        .unwrap_or(true)
                    {
                        best = Some(estimate);
                    }
                }
                Err(e) => failures.push(ProviderFailure {
                    provider: provider.name().to_string(),
                    reason: e.to_string(),
                }),
            }
        }
        best.ok_or(Error::ProvidersExhausted(failures))
    }

    /// Estimate from one named provider.
    pub async fn quote_from(
        &self,
        name: &str,
        recipient: &str,
        energy: u64,
    ) -> Result<EnergyEstimate, Error> {
        let provider = self
            .providers
            .iter()
            .find(|p| p.name() == name)
            .ok_or_else(|| Error::Provider(format!("provider {name} not found")))?;
        provider.estimate(recipient, energy).await
    }

    /// Place a delegation order, falling back across providers in order:
    /// preferred, then primary, then the remaining available providers.
    /// Attempts are strictly serial; each failure is recorded and the next
    /// provider tried. Only exhaustion of every candidate is fatal.
    pub async fn delegate(
        &self,
        recipient: &str,
        energy: u64,
        preferred: Option<&str>,
    ) -> Result<EnergyOrder, Error> {
        let available = self.list_available().await;
        if available.is_empty() {
            return Err(Error::NoProviders);
        }

        let mut order: Vec<&Arc<dyn EnergyProvider>> = Vec::new();
        if let Some(name) = preferred {
            if let Some(p) = available.iter().find(|p| p.name() == name) {
                order.push(p);
            }
        }
        if let Some(name) = &self.primary {
            if let Some(p) = available.iter().find(|p| p.name() == name) {
                if !order.iter().any(|o| o.name() == p.name()) {
                    order.push(p);
                }
            }
        }
        for p in &available {
            if !order.iter().any(|o| o.name() == p.name()) {
                order.push(p);
            }
        }

        let mut failures = Vec::new();
        for provider in order {
            match provider.delegate(recipient, energy).await {
                Ok(placed) => {
                    info!(
                        provider = provider.name(),
                        order_id = %placed.order_id,
                        energy = placed.energy_delegated,
                        "Energy delegated"
                    );
                    return Ok(placed);
                }
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        error = %e,
                        "Provider delegation failed, trying next"
                    );
                    failures.push(ProviderFailure {
                        provider: provider.name().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        Err(Error::ProvidersExhausted(failures))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Scripted provider shared by quote and coordinator tests.
    pub(crate) struct StaticProvider {
        pub name: String,
        pub available: bool,
        pub cost_trx: f64,
        pub fail_delegate: bool,
        pub fail_estimate: bool,
        pub delegate_calls: AtomicU32,
    }

    impl StaticProvider {
        pub(crate) fn up(name: &str, cost_trx: f64) -> Self {
            Self {
                name: name.to_string(),
                available: true,
                cost_trx,
                fail_delegate: false,
                fail_estimate: false,
                delegate_calls: AtomicU32::new(0),
            }
        }

        pub(crate) fn failing(name: &str, cost_trx: f64) -> Self {
            Self {
                fail_delegate: true,
                ..Self::up(name, cost_trx)
            }
        }

        pub(crate) fn down(name: &str) -> Self {
            Self {
                available: false,
                ..Self::up(name, 1.0)
            }
        }
    }

    #[async_trait]
    impl EnergyProvider for StaticProvider {
        fn name(&self) -> &str {
            &self.name
        }

        async fn is_available(&self) -> bool {
            self.available
        }

        async fn estimate(&self, _recipient: &str, energy: u64) -> Result<EnergyEstimate, Error> {
            if self.fail_estimate {
                return Err(Error::Provider(format!("{} estimate down", self.name)));
            }
            Ok(EnergyEstimate {
                provider: self.name.clone(),
                energy,
                cost_trx: self.cost_trx,
                cost_usd: self.cost_trx * 0.25,
            })
        }

        async fn delegate(&self, _recipient: &str, energy: u64) -> Result<EnergyOrder, Error> {
            self.delegate_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_delegate {
                return Err(Error::Provider(format!("{} order refused", self.name)));
            }
            Ok(EnergyOrder {
                provider: self.name.clone(),
                order_id: format!("{}-order-1", self.name),
                energy_delegated: energy,
                cost_trx: self.cost_trx,
                expires_at: crate::types::now_ms() + 3_600_000,
            })
        }

        async fn order_status(&self, _order_id: &str) -> Result<String, Error> {
            Ok("completed".into())
        }
    }

    pub(crate) fn manager_of(providers: Vec<StaticProvider>) -> ProviderManager {
        ProviderManager::new(
            providers
                .into_iter()
                .map(|p| Arc::new(p) as Arc<dyn EnergyProvider>)
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_unavailable_provider_excluded() {
        let manager = manager_of(vec![
            StaticProvider::down("p1"),
            StaticProvider::up("p2", 2.0),
        ]);
        let available = manager.list_available().await;
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].name(), "p2");
    }

    #[tokio::test]
    async fn test_best_quote_picks_cheapest() {
        let manager = manager_of(vec![
            StaticProvider::up("p1", 3.5),
            StaticProvider::up("p2", 2.0),
        ]);
        let best = manager.best_quote("addr", 65_000).await.unwrap();
        assert_eq!(best.provider, "p2");
        assert!((best.cost_trx - 2.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_best_quote_discards_failed_estimates() {
        let mut p1 = StaticProvider::up("p1", 1.0);
        p1.fail_estimate = true;
        let manager = manager_of(vec![p1, StaticProvider::up("p2", 4.0)]);
        let best = manager.best_quote("addr", 65_000).await.unwrap();
        assert_eq!(best.provider, "p2");
    }

    #[tokio::test]
    async fn test_best_quote_no_providers() {
        let manager = manager_of(vec![StaticProvider::down("p1")]);
        assert!(matches!(
            manager.best_quote("addr", 65_000).await,
            Err(Error::NoProviders)
        ));
    }

    #[tokio::test]
    async fn test_delegate_falls_back_from_failing_primary() {
        let manager = manager_of(vec![
            StaticProvider::failing("p1", 2.0),
            StaticProvider::up("p2", 3.0),
        ]);
        let order = manager.delegate("addr", 65_000, None).await.unwrap();
        assert_eq!(order.provider, "p2");
    }

    #[tokio::test]
    async fn test_delegate_calls_failing_primary_exactly_once() {
        let p1 = Arc::new(StaticProvider::failing("p1", 2.0));
        let p2 = Arc::new(StaticProvider::up("p2", 3.0));
        let manager = ProviderManager::new(vec![
            Arc::clone(&p1) as Arc<dyn EnergyProvider>,
            Arc::clone(&p2) as Arc<dyn EnergyProvider>,
        ]);
        let order = manager.delegate("addr", 65_000, None).await.unwrap();
        assert_eq!(order.provider, "p2");
        assert_eq!(p1.delegate_calls.load(Ordering::SeqCst), 1);
        assert_eq!(p2.delegate_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_delegate_preferred_first() {
        let manager = manager_of(vec![
            StaticProvider::up("p1", 2.0),
            StaticProvider::up("p2", 3.0),
        ]);
        let order = manager.delegate("addr", 65_000, Some("p2")).await.unwrap();
        assert_eq!(order.provider, "p2");
    }

    #[tokio::test]
    async fn test_delegate_unknown_preferred_falls_back_to_primary() {
        let manager = manager_of(vec![
            StaticProvider::up("p1", 2.0),
            StaticProvider::up("p2", 3.0),
        ]);
        let order = manager.delegate("addr", 65_000, Some("nope")).await.unwrap();
        assert_eq!(order.provider, "p1");
    }

    #[tokio::test]
    async fn test_delegate_exhaustion_carries_all_failures() {
        let manager = manager_of(vec![
            StaticProvider::failing("p1", 2.0),
            StaticProvider::failing("p2", 3.0),
        ]);
        match manager.delegate("addr", 65_000, None).await {
            Err(Error::ProvidersExhausted(failures)) => {
                assert_eq!(failures.len(), 2);
                assert_eq!(failures[0].provider, "p1");
                assert_eq!(failures[1].provider, "p2");
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }
}
