//! Relay configuration.

use serde::Deserialize;

/// Top-level configuration for the top-up relay.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Primary chain gateway URL.
    #[serde(default = "defaults::rpc_url")]
    pub rpc_url: String,

    /// Fallback chain gateway URL.
    #[serde(default = "defaults::fallback_rpc_url")]
    pub fallback_rpc_url: String,

    #[serde(default = "defaults::database_url")]
    pub database_url: String,

    #[serde(default = "defaults::redis_url")]
    pub redis_url: String,

    /// Service wallet receiving the user's stablecoin transfer.
    /// Commits are refused outright while this is unset.
    #[serde(default = "defaults::service_wallet")]
    pub service_wallet: Option<String>,

    /// Private key used for the native payout transfer.
    #[serde(default = "defaults::service_private_key")]
    pub service_private_key: Option<String>,

    /// Stablecoin token contract the user must pay into.
    #[serde(default = "defaults::usdt_contract")]
    pub usdt_contract: String,

    /// Energy delegated per top-up (recipient already holds the token).
    #[serde(default = "defaults::energy_per_topup")]
    pub energy_per_topup: u64,

    /// TTL of a pending commit in the ephemeral store.
    #[serde(default = "defaults::commit_ttl_secs")]
    pub commit_ttl_secs: u64,

    /// How long a quote stays valid, in milliseconds.
    #[serde(default = "defaults::quote_ttl_ms")]
    pub quote_ttl_ms: i64,

    /// Confirmation polling budget. Tests shrink these to near zero.
    #[serde(default = "defaults::confirm_max_attempts")]
    pub confirm_max_attempts: u32,
    #[serde(default = "defaults::confirm_interval_ms")]
    pub confirm_interval_ms: u64,

    #[serde(default = "defaults::rate_limit_per_min")]
    pub rate_limit_per_min: i64,

    #[serde(default)]
    pub pricing: Pricing,

    #[serde(default)]
    pub abuse: AbuseThresholds,

    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl Config {
    /// Load from optional `gas-station.toml` plus `GAS_STATION__*` env vars.
    pub fn load() -> Result<Self, crate::Error> {
        let raw = config::Config::builder()
            .add_source(config::File::with_name("gas-station").required(false))
            .add_source(config::Environment::with_prefix("GAS_STATION").separator("__"))
            .build()
            .map_err(|e| crate::Error::Config(format!("failed to read config: {e}")))?;
        raw.try_deserialize()
            .map_err(|e| crate::Error::Config(format!("invalid config: {e}")))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: defaults::rpc_url(),
            fallback_rpc_url: defaults::fallback_rpc_url(),
            database_url: defaults::database_url(),
            redis_url: defaults::redis_url(),
            service_wallet: defaults::service_wallet(),
            service_private_key: defaults::service_private_key(),
            usdt_contract: defaults::usdt_contract(),
            energy_per_topup: defaults::energy_per_topup(),
            commit_ttl_secs: defaults::commit_ttl_secs(),
            quote_ttl_ms: defaults::quote_ttl_ms(),
            confirm_max_attempts: defaults::confirm_max_attempts(),
            confirm_interval_ms: defaults::confirm_interval_ms(),
            rate_limit_per_min: defaults::rate_limit_per_min(),
            pricing: Pricing::default(),
            abuse: AbuseThresholds::default(),
            providers: ProvidersConfig::default(),
        }
    }
}

/// Exchange-rate and fee parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct Pricing {
    /// USDT value of one TRX.
    #[serde(default = "defaults::usdt_per_trx")]
    pub usdt_per_trx: f64,

    /// Flat service fee charged on top of the requested amount.
    #[serde(default = "defaults::service_fee_usdt")]
    pub service_fee_usdt: f64,

    #[serde(default = "defaults::min_topup_usdt")]
    pub min_topup_usdt: f64,
    #[serde(default = "defaults::max_topup_usdt")]
    pub max_topup_usdt: f64,

    /// Energy cost assumed at commit time, when no live estimate is attached.
    #[serde(default = "defaults::fallback_energy_cost_trx")]
    pub fallback_energy_cost_trx: f64,
}

/// Minor units per whole USDT (6 decimals).
pub const USDT_SCALE: f64 = 1e6;
/// Sun per whole TRX (6 decimals).
pub const TRX_SCALE: f64 = 1e6;

impl Pricing {
    /// Native payout for a requested amount, net of the resource cost.
    pub fn payout_trx(&self, usdt_amount: f64, energy_cost_trx: f64) -> f64 {
        usdt_amount / self.usdt_per_trx - energy_cost_trx
    }

    /// Total stablecoin charged: requested amount plus the service fee.
    pub fn total_charged(&self, usdt_amount: f64) -> f64 {
        usdt_amount + self.service_fee_usdt
    }

    pub fn within_bounds(&self, usdt_amount: f64) -> bool {
        usdt_amount >= self.min_topup_usdt && usdt_amount <= self.max_topup_usdt
    }

    /// Whole USDT to integer minor units.
    pub fn usdt_to_minor(&self, usdt_amount: f64) -> u128 {
        (usdt_amount * USDT_SCALE).round() as u128
    }

    /// Whole TRX to sun.
    pub fn trx_to_sun(&self, trx_amount: f64) -> u64 {
        (trx_amount * TRX_SCALE).round() as u64
    }
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            usdt_per_trx: defaults::usdt_per_trx(),
            service_fee_usdt: defaults::service_fee_usdt(),
            min_topup_usdt: defaults::min_topup_usdt(),
            max_topup_usdt: defaults::max_topup_usdt(),
            fallback_energy_cost_trx: defaults::fallback_energy_cost_trx(),
        }
    }
}

/// Flagging thresholds for the abuse tracker.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AbuseThresholds {
    #[serde(default = "defaults::abandon_threshold_wallet")]
    pub abandon_threshold_wallet: i32,
    #[serde(default = "defaults::abandon_threshold_ip")]
    pub abandon_threshold_ip: i64,
    #[serde(default = "defaults::multi_ip_threshold")]
    pub multi_ip_threshold: usize,
    #[serde(default = "defaults::multi_wallet_threshold")]
    pub multi_wallet_threshold: i64,
}

impl Default for AbuseThresholds {
    fn default() -> Self {
        Self {
            abandon_threshold_wallet: defaults::abandon_threshold_wallet(),
            abandon_threshold_ip: defaults::abandon_threshold_ip(),
            multi_ip_threshold: defaults::multi_ip_threshold(),
            multi_wallet_threshold: defaults::multi_wallet_threshold(),
        }
    }
}

/// Credentials for one energy provider. A provider without credentials
/// is never constructed.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderCredentials {
    pub api_key: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "defaults::apitrx")]
    pub apitrx: Option<ProviderCredentials>,
    #[serde(default = "defaults::tronsave")]
    pub tronsave: Option<ProviderCredentials>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            apitrx: defaults::apitrx(),
            tronsave: defaults::tronsave(),
        }
    }
}

mod defaults {
    use super::ProviderCredentials;

    fn env_nonempty(name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.is_empty())
    }

    pub fn rpc_url() -> String {
        env_nonempty("TRON_API_URL").unwrap_or_else(|| "https://api.trongrid.io".into())
    }

    pub fn fallback_rpc_url() -> String {
        env_nonempty("TRON_FALLBACK_API_URL")
            .unwrap_or_else(|| "https://api.tronstack.io".into())
    }

    pub fn database_url() -> String {
        env_nonempty("DATABASE_URL")
            .unwrap_or_else(|| "postgres://localhost/gas_station".into())
    }

    pub fn redis_url() -> String {
        env_nonempty("REDIS_URL").unwrap_or_else(|| "redis://localhost:6379".into())
    }

    pub fn service_wallet() -> Option<String> {
        env_nonempty("SERVICE_WALLET_TRON")
    }

    pub fn service_private_key() -> Option<String> {
        env_nonempty("TRON_PRIVATE_KEY")
    }

    pub fn usdt_contract() -> String {
        env_nonempty("USDT_CONTRACT_TRON")
            .unwrap_or_else(|| "41a614f803b6fd780986a42c78ec9c7f77e6ded13c".into())
    }

    pub fn energy_per_topup() -> u64 {
        65_000
    }

    pub fn commit_ttl_secs() -> u64 {
        300
    }

    pub fn quote_ttl_ms() -> i64 {
        60_000
    }

    pub fn confirm_max_attempts() -> u32 {
        20
    }

    pub fn confirm_interval_ms() -> u64 {
        3_000
    }

    pub fn rate_limit_per_min() -> i64 {
        env_nonempty("RATE_LIMIT_PER_MIN")
            .and_then(|v| v.parse().ok())
            .unwrap_or(10)
    }

    pub fn usdt_per_trx() -> f64 {
        0.16
    }

    pub fn service_fee_usdt() -> f64 {
        0.5
    }

    pub fn min_topup_usdt() -> f64 {
        1.0
    }

    pub fn max_topup_usdt() -> f64 {
        1_000.0
    }

    pub fn fallback_energy_cost_trx() -> f64 {
        2.5
    }

    pub fn abandon_threshold_wallet() -> i32 {
        3
    }

    pub fn abandon_threshold_ip() -> i64 {
        5
    }

    pub fn multi_ip_threshold() -> usize {
        3
    }

    pub fn multi_wallet_threshold() -> i64 {
        5
    }

    pub fn apitrx() -> Option<ProviderCredentials> {
        env_nonempty("APITRX_API_KEY").map(|api_key| ProviderCredentials {
            api_key,
            base_url: env_nonempty("APITRX_BASE_URL"),
        })
    }

    pub fn tronsave() -> Option<ProviderCredentials> {
        env_nonempty("TRONSAVE_API_KEY").map(|api_key| ProviderCredentials {
            api_key,
            base_url: env_nonempty("TRONSAVE_BASE_URL"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payout_formula() {
        let pricing = Pricing::default();
        // 10 USDT at 0.16 USDT/TRX minus 1.2 TRX of energy.
        let payout = pricing.payout_trx(10.0, 1.2);
        assert!((payout - 61.3).abs() < 1e-9);
        assert!((pricing.total_charged(10.0) - 10.5).abs() < 1e-12);
    }

    #[test]
    fn test_minor_unit_conversion() {
        let pricing = Pricing::default();
        assert_eq!(pricing.usdt_to_minor(10.0), 10_000_000);
        assert_eq!(pricing.usdt_to_minor(9.99), 9_990_000);
        // 8.2 is not exactly representable; rounding must not lose a unit.
        assert_eq!(pricing.usdt_to_minor(8.2), 8_200_000);
        assert_eq!(pricing.trx_to_sun(61.3), 61_300_000);
    }

    #[test]
    fn test_bounds() {
        let pricing = Pricing::default();
        assert!(pricing.within_bounds(1.0));
        assert!(pricing.within_bounds(1000.0));
        assert!(!pricing.within_bounds(0.5));
        assert!(!pricing.within_bounds(1000.01));
    }
}
