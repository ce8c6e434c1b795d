//! Chain gateway client with primary → fallback failover and a circuit
//! breaker. All on-chain reads and writes go through the [`ChainRpc`]
//! trait so the coordinator can be exercised against a scripted chain.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};

use crate::decoder::SignedTransaction;
use crate::error::Error;

/// Consecutive failures before the circuit breaker opens.
const CIRCUIT_BREAKER_THRESHOLD: u64 = 5;
/// How long (ms) before a tripped breaker retries the primary.
const CIRCUIT_BREAKER_WINDOW_MS: u64 = 30_000;
/// Per-request timeout against the gateway.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Confirmation status of a broadcast transaction.
#[derive(Debug, Clone)]
pub struct Receipt {
    pub success: bool,
    /// Chain-reported result string, e.g. `SUCCESS` or `OUT_OF_ENERGY`.
    pub result: String,
    /// Fee burned, in sun.
    pub fee_sun: Option<u64>,
}

/// A recent block reference.
#[derive(Debug, Clone)]
pub struct BlockRef {
    pub number: u64,
    pub hash: String,
}

/// Narrow chain interface consumed by the coordinator and quote engine.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Submit a raw signed transaction; returns its hash.
    async fn broadcast(&self, tx: &SignedTransaction) -> Result<String, Error>;

    /// Receipt for a broadcast transaction, `None` while unconfirmed.
    async fn transaction_info(&self, tx_hash: &str) -> Result<Option<Receipt>, Error>;

    async fn latest_block(&self) -> Result<BlockRef, Error>;

    /// TRC-20 balance of `holder` on `contract`, in minor units.
    async fn token_balance(&self, contract: &str, holder: &str) -> Result<u128, Error>;

    /// Native transfer from the service's own key; returns the hash.
    async fn send_native(&self, to: &str, amount_sun: u64) -> Result<String, Error>;
}

struct CircuitState {
    failures: u64,
    last_failure_ms: u64,
    open: bool,
}

/// HTTP gateway client with failover.
pub struct HttpChainClient {
    http: reqwest::Client,
    primary_url: String,
    fallback_url: String,
    payout_key: Option<String>,
    circuit: Mutex<CircuitState>,
    total_failovers: AtomicU64,
}

impl HttpChainClient {
    pub fn new(
        primary_url: &str,
        fallback_url: &str,
        payout_key: Option<String>,
    ) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("http client: {e}")))?;
        info!(
            primary = primary_url,
            fallback = fallback_url,
            "Chain gateway client initialized with failover"
        );
        Ok(Self {
            http,
            primary_url: primary_url.trim_end_matches('/').to_string(),
            fallback_url: fallback_url.trim_end_matches('/').to_string(),
            payout_key,
            circuit: Mutex::new(CircuitState {
                failures: 0,
                last_failure_ms: 0,
                open: false,
            }),
            total_failovers: AtomicU64::new(0),
        })
    }

    /// Quick connectivity check. Returns "ok", "degraded", or error.
    pub async fn health_check(&self) -> Result<&'static str, Error> {
        if self.now_block(&self.primary_url).await.is_ok() {
            return Ok("ok");
        }
        match self.now_block(&self.fallback_url).await {
            Ok(_) => Ok("degraded"),
            Err(e) => Err(Error::Rpc(format!("both gateways unreachable: {e}"))),
        }
    }

    /// Currently active gateway URL.
    pub fn active_url(&self) -> &str {
        if self.is_circuit_open() {
            &self.fallback_url
        } else {
            &self.primary_url
        }
    }

    pub fn failover_count(&self) -> u64 {
        self.total_failovers.load(Ordering::Relaxed)
    }

    // --- Failover plumbing ---

    async fn post(&self, path: &str, body: Value) -> Result<Value, Error> {
        let use_primary = !self.is_circuit_open();
        let first = if use_primary {
            &self.primary_url
        } else {
            &self.fallback_url
        };

        match self.try_post(first, path, &body).await {
            Ok(value) => {
                if use_primary {
                    self.record_success();
                }
                Ok(value)
            }
            Err(e) => {
                if use_primary {
                    self.record_failure();
                }
                warn!(error = %e, path, "Primary gateway call failed, trying fallback");
                self.try_post(&self.fallback_url, path, &body)
                    .await
                    .map_err(|e2| {
                        Error::Rpc(format!(
                            "{path} failed on both gateways: primary={e}, fallback={e2}"
                        ))
                    })
            }
        }
    }

    async fn try_post(&self, base: &str, path: &str, body: &Value) -> Result<Value, String> {
        let response = self
            .http
            .post(format!("{base}/{path}"))
            .json(body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }
        response.json::<Value>().await.map_err(|e| e.to_string())
    }

    async fn now_block(&self, base: &str) -> Result<Value, String> {
        self.try_post(base, "wallet/getnowblock", &json!({})).await
    }

    fn record_success(&self) {
        let mut circuit = self.circuit.lock().unwrap_or_else(|e| e.into_inner());
        if circuit.failures > 0 {
            info!(primary = %self.primary_url, "Primary gateway recovered");
            circuit.failures = 0;
            circuit.open = false;
        }
    }

    fn record_failure(&self) {
        let mut circuit = self.circuit.lock().unwrap_or_else(|e| e.into_inner());
        circuit.failures += 1;
        circuit.last_failure_ms = now_ms();
        if circuit.failures >= CIRCUIT_BREAKER_THRESHOLD && !circuit.open {
            circuit.open = true;
            self.total_failovers.fetch_add(1, Ordering::Relaxed);
            warn!(
                failures = circuit.failures,
                fallback = %self.fallback_url,
                "Circuit breaker opened — routing to fallback"
            );
        }
    }

    fn is_circuit_open(&self) -> bool {
        let mut circuit = self.circuit.lock().unwrap_or_else(|e| e.into_inner());
        if !circuit.open {
            return false;
        }
        // Half-open: retry primary after window.
        if now_ms() - circuit.last_failure_ms > CIRCUIT_BREAKER_WINDOW_MS {
            circuit.open = false;
            circuit.failures = 0;
            info!(primary = %self.primary_url, "Circuit breaker half-open, retrying primary");
            return false;
        }
        true
    }
}

#[async_trait]
impl ChainRpc for HttpChainClient {
    async fn broadcast(&self, tx: &SignedTransaction) -> Result<String, Error> {
        let body = serde_json::to_value(tx)
            .map_err(|e| Error::Broadcast(format!("unserializable transaction: {e}")))?;
        let response = self.post("wallet/broadcasttransaction", body).await?;
        let accepted = response
            .get("result")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if !accepted {
            let message = response
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("broadcast rejected")
                .to_string();
            return Err(Error::Broadcast(message));
        }
        response
            .get("txid")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| tx.tx_id.clone())
            .ok_or_else(|| Error::Broadcast("no transaction id in response".into()))
    }

    async fn transaction_info(&self, tx_hash: &str) -> Result<Option<Receipt>, Error> {
        let response = self
            .post("wallet/gettransactioninfobyid", json!({ "value": tx_hash }))
            .await?;
        let Some(receipt) = response.get("receipt") else {
            // Empty object until the transaction is picked up.
            return Ok(None);
        };
        let result = receipt
            .get("result")
            .and_then(Value::as_str)
            .unwrap_or("UNKNOWN")
            .to_string();
        Ok(Some(Receipt {
            success: result == "SUCCESS",
            result,
            fee_sun: response.get("fee").and_then(Value::as_u64),
        }))
    }

    async fn latest_block(&self) -> Result<BlockRef, Error> {
        let response = self.post("wallet/getnowblock", json!({})).await?;
        let number = response
            .pointer("/block_header/raw_data/number")
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::Rpc("malformed block response".into()))?;
        let hash = response
            .get("blockID")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(BlockRef { number, hash })
    }

    async fn token_balance(&self, contract: &str, holder: &str) -> Result<u128, Error> {
        // balanceOf(address), holder left-padded to 32 bytes without the
        // chain prefix byte.
        let bare = holder.trim_start_matches("41");
        let body = json!({
            "owner_address": holder,
            "contract_address": contract,
            "function_selector": "balanceOf(address)",
            "parameter": format!("{bare:0>64}"),
        });
        let response = self.post("wallet/triggerconstantcontract", body).await?;
        let word = response
            .pointer("/constant_result/0")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Rpc("no constant_result in balance response".into()))?;
        let trimmed = word.trim_start_matches('0');
        if trimmed.is_empty() {
            return Ok(0);
        }
        u128::from_str_radix(trimmed, 16)
            .map_err(|_| Error::Rpc(format!("unparseable balance word: {word}")))
    }

    async fn send_native(&self, to: &str, amount_sun: u64) -> Result<String, Error> {
        let key = self
            .payout_key
            .as_ref()
            .ok_or_else(|| Error::Config("service private key not configured".into()))?;
        let body = json!({
            "privateKey": key,
            "toAddress": to,
            "amount": amount_sun,
        });
        let response = self.post("wallet/easytransferbyprivate", body).await?;
        let accepted = response
            .pointer("/result/result")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if !accepted {
            let message = response
                .pointer("/result/message")
                .and_then(Value::as_str)
                .unwrap_or("transfer rejected")
                .to_string();
            return Err(Error::Rpc(format!("native transfer failed: {message}")));
        }
        response
            .pointer("/transaction/txID")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::Rpc("no transaction id in transfer response".into()))
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
