//! Quote computation for prospective top-ups.

use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Pricing;
use crate::error::{Error, RejectReason};
use crate::providers::ProviderManager;
use crate::types::{now_ms, Quote, QuoteRequest};

/// Prices a prospective top-up against live provider estimates.
///
/// Quotes are advisory and never persisted; the commit path re-derives the
/// payout from configuration so a stale or fabricated quote id cannot move
/// the price.
pub struct QuoteEngine {
    providers: Arc<ProviderManager>,
    pricing: Pricing,
    energy_per_topup: u64,
    quote_ttl_ms: i64,
}

impl QuoteEngine {
    pub fn new(
        providers: Arc<ProviderManager>,
        pricing: Pricing,
        energy_per_topup: u64,
        quote_ttl_ms: i64,
    ) -> Self {
        Self {
            providers,
            pricing,
            energy_per_topup,
            quote_ttl_ms,
        }
    }

    pub async fn quote(&self, request: &QuoteRequest) -> Result<Quote, Error> {
        if !self.pricing.within_bounds(request.usdt_amount) {
            return Err(RejectReason::AmountOutOfRange.into());
        }

        let available = self.providers.list_available().await;
        if available.is_empty() {
            return Err(Error::NoProviders);
        }
        let available_names: Vec<String> =
            available.iter().map(|p| p.name().to_string()).collect();

        let estimate = match request
            .preferred_provider
            .as_deref()
            .filter(|name| available_names.iter().any(|n| n == name))
        {
            Some(name) => {
                debug!(provider = name, "Quoting from preferred provider");
                self.providers
                    .quote_from(name, &request.user_address, self.energy_per_topup)
                    .await?
            }
            None => {
                self.providers
                    .best_quote(&request.user_address, self.energy_per_topup)
                    .await?
            }
        };

        let trx_amount = self
            .pricing
            .payout_trx(request.usdt_amount, estimate.cost_trx);
        if trx_amount <= 0.0 {
            return Err(RejectReason::PayoutNotPositive.into());
        }

        let quote = Quote {
            quote_id: Uuid::new_v4(),
            usdt_amount: request.usdt_amount,
            trx_amount,
            energy_cost_usdt: estimate.cost_trx * self.pricing.usdt_per_trx,
            service_fee: self.pricing.service_fee_usdt,
            total_usdt_charged: self.pricing.total_charged(request.usdt_amount),
            energy_provider: estimate.provider,
            available_providers: available_names,
            expires_at: now_ms() + self.quote_ttl_ms,
        };
        info!(
            quote_id = %quote.quote_id,
            usdt = quote.usdt_amount,
            trx = quote.trx_amount,
            provider = %quote.energy_provider,
            "Quote issued"
        );
        Ok(quote)
    }
}
