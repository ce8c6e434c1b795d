//! Tronsave energy provider.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::apitrx::json_num;
use super::{EnergyEstimate, EnergyOrder, EnergyProvider};
use crate::error::Error;

const DEFAULT_BASE_URL: &str = "https://api.tronsave.io/v2";

pub struct TronsaveProvider {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl TronsaveProvider {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl EnergyProvider for TronsaveProvider {
    fn name(&self) -> &str {
        "tronsave"
    }

    async fn is_available(&self) -> bool {
        if self.api_key.is_empty() {
            return false;
        }
        self.http
            .get(format!("{}/account", self.base_url))
            .header("X-API-Key", &self.api_key)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map(|response| response.status().is_success())
            .unwrap_or(false)
    }

    async fn estimate(&self, recipient: &str, energy: u64) -> Result<EnergyEstimate, Error> {
        let url = format!(
            "{}/resources/estimate?energy={}&receiver={}",
            self.base_url, energy, recipient
        );
        let response = self
            .http
            .get(url)
            .header("X-API-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("tronsave: {e}")))?;
        if !response.status().is_success() {
            return Err(Error::Provider(format!(
                "tronsave: HTTP {}",
                response.status()
            )));
        }
        let data: Value = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("tronsave: {e}")))?;

        Ok(EnergyEstimate {
            provider: self.name().to_string(),
            energy,
            cost_trx: data.get("cost_trx").and_then(json_num).unwrap_or(3.5),
            cost_usd: data.get("cost_usd").and_then(json_num).unwrap_or(0.56),
        })
    }

    async fn delegate(&self, recipient: &str, energy: u64) -> Result<EnergyOrder, Error> {
        debug!(recipient, energy, "Placing Tronsave order");
        let response = self
            .http
            .post(format!("{}/resources/buy", self.base_url))
            .header("X-API-Key", &self.api_key)
            .json(&json!({
                "receiver": recipient,
                "energy_amount": energy,
                "duration": 1,
            }))
            .send()
            .await
            .map_err(|e| Error::Provider(format!("tronsave: {e}")))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!("tronsave: HTTP {status}: {body}")));
        }
        let data: Value = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("tronsave: {e}")))?;

        let order_id = data
            .get("order_id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Provider("tronsave: no order_id in response".into()))?
            .to_string();

        Ok(EnergyOrder {
            provider: self.name().to_string(),
            order_id,
            energy_delegated: data
                .get("energy_delegated")
                .and_then(Value::as_u64)
                .unwrap_or(energy),
            cost_trx: data.get("cost_trx").and_then(json_num).unwrap_or_default(),
            expires_at: crate::types::now_ms() + 3_600_000,
        })
    }

    async fn order_status(&self, order_id: &str) -> Result<String, Error> {
        let response = self
            .http
            .get(format!("{}/orders/{}", self.base_url, order_id))
            .header("X-API-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("tronsave: {e}")))?;
        if !response.status().is_success() {
            return Err(Error::Provider("tronsave: failed to fetch order status".into()));
        }
        let data: Value = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("tronsave: {e}")))?;
        Ok(data
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string())
    }
}
