//! APITRX energy provider.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{EnergyEstimate, EnergyOrder, EnergyProvider};
use crate::error::Error;

const DEFAULT_BASE_URL: &str = "https://web.apitrx.com";
/// Smallest order the service accepts.
const MIN_ENERGY: u64 = 32_000;
/// Flat rate: 2.5 TRX per 65 000 energy for a one-hour rental.
const TRX_PER_ENERGY: f64 = 2.5 / 65_000.0;
/// Rough TRX price used for the USD figure in estimates.
const TRX_TO_USD: f64 = 0.25;

pub struct ApitrxProvider {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl ApitrxProvider {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl EnergyProvider for ApitrxProvider {
    fn name(&self) -> &str {
        "apitrx"
    }

    /// Balance lookup doubles as an API-key validity check.
    async fn is_available(&self) -> bool {
        if self.api_key.is_empty() {
            return false;
        }
        let url = format!("{}/balance?apikey={}", self.base_url, self.api_key);
        let Ok(response) = self
            .http
            .get(url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        else {
            return false;
        };
        if !response.status().is_success() {
            return false;
        }
        response
            .json::<Value>()
            .await
            .ok()
            .and_then(|data| data.get("code").and_then(Value::as_i64))
            == Some(200)
    }

    /// Pricing is a published flat rate, so no network call is needed.
    async fn estimate(&self, _recipient: &str, energy: u64) -> Result<EnergyEstimate, Error> {
        let effective = energy.max(MIN_ENERGY);
        let cost_trx = effective as f64 * TRX_PER_ENERGY;
        Ok(EnergyEstimate {
            provider: self.name().to_string(),
            energy: effective,
            cost_trx,
            cost_usd: cost_trx * TRX_TO_USD,
        })
    }

    async fn delegate(&self, recipient: &str, energy: u64) -> Result<EnergyOrder, Error> {
        let effective = energy.max(MIN_ENERGY);
        let url = format!(
            "{}/getenergy?apikey={}&add={}&value={}&hour=1",
            self.base_url, self.api_key, recipient, effective
        );
        debug!(recipient, energy = effective, "Placing APITRX order");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("apitrx: {e}")))?;
        if !response.status().is_success() {
            return Err(Error::Provider(format!(
                "apitrx: HTTP {}",
                response.status()
            )));
        }
        let data: Value = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("apitrx: {e}")))?;
        if data.get("code").and_then(Value::as_i64) != Some(200) {
            let message = data
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(Error::Provider(format!("apitrx: {message}")));
        }

        let order_id = data
            .pointer("/data/txid")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("apitrx-{}", crate::types::now_ms()));
        let cost_trx = data
            .pointer("/data/amount")
            .and_then(json_num)
            .unwrap_or(2.5);

        Ok(EnergyOrder {
            provider: self.name().to_string(),
            order_id,
            energy_delegated: effective,
            cost_trx,
            expires_at: crate::types::now_ms() + 3_600_000,
        })
    }

    /// No order-status endpoint; the returned txid is already on-chain.
    async fn order_status(&self, _order_id: &str) -> Result<String, Error> {
        Ok("completed".into())
    }
}

/// Providers return numbers both as JSON numbers and as strings.
pub(super) fn json_num(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}
