use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default config file path (overridable with --config)
pub const DEFAULT_CONFIG_PATH: &str = "jarwatch.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// The jar: vault address whose holdings are valued
    pub jar_address: String,
    /// Ethereum JSON-RPC endpoint (used for the registry balanceOf fallback)
    pub rpc_url: String,
    /// Alchemy API key; empty means the primary balance path is skipped
    #[serde(default)]
    pub alchemy_api_key: String,
    /// Dune API key; empty means the analytics source is not configured
    #[serde(default)]
    pub dune_api_key: String,
    /// Dune query id returning the per-token jar valuation
    #[serde(default = "default_dune_query_id")]
    pub dune_query_id: u64,
    pub burn: BurnConfig,
    pub cache: CacheConfig,
    pub webserver: WebserverConfig,
    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BurnConfig {
    /// UNI units required to trigger the burn
    pub threshold_units: f64,
    /// Flat gas cost estimate for the burn transaction, in USD
    pub gas_estimate_usd: f64,
    /// Minimum USD value for a token to appear in the display list
    pub display_floor_usd: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL for the shared profitability snapshot
    pub snapshot_ttl_secs: u64,
    /// TTL for the balance source's private cache
    pub balances_ttl_secs: u64,
    /// TTL for the price source's private cache
    pub prices_ttl_secs: u64,
    /// TTL for the analytics summary (the upstream refreshes infrequently)
    pub analytics_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebserverConfig {
    pub host: String,
    pub port: u16,
}

fn default_dune_query_id() -> u64 {
    3_456_866
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            jar_address: "0x0000000000000000000000000000000000000000".to_string(),
            rpc_url: "https://eth.llamarpc.com".to_string(),
            alchemy_api_key: String::new(),
            dune_api_key: String::new(),
            dune_query_id: default_dune_query_id(),
            burn: BurnConfig {
                threshold_units: 4000.0,
                gas_estimate_usd: 50.0,
                display_floor_usd: 10.0,
            },
            cache: CacheConfig {
                snapshot_ttl_secs: 300,    // 5 minutes
                balances_ttl_secs: 120,    // 2 minutes
                prices_ttl_secs: 60,       // 1 minute
                analytics_ttl_secs: 21600, // 6 hours - upstream refreshes a few times a day
            },
            webserver: WebserverConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, creating it with defaults when
    /// missing, then overlay credentials from the environment.
    pub fn load(path: &str) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file {}", path))?
        } else {
            let default_config = Self::default();
            default_config.save(path)?;
            default_config
        };

        // Credentials from the environment take precedence over the file so
        // keys never have to live on disk.
        if let Ok(key) = std::env::var("ALCHEMY_API_KEY") {
            if !key.trim().is_empty() {
                config.alchemy_api_key = key;
            }
        }
        if let Ok(key) = std::env::var("DUNE_API_KEY") {
            if !key.trim().is_empty() {
                config.dune_api_key = key;
            }
        }

        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path))?;
        Ok(())
    }

    /// Absence of the credential is a supported configuration, not an error
    pub fn has_alchemy_key(&self) -> bool {
        !self.alchemy_api_key.trim().is_empty()
    }

    pub fn has_dune_key(&self) -> bool {
        !self.dune_api_key.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.burn.threshold_units, config.burn.threshold_units);
        assert_eq!(parsed.cache.snapshot_ttl_secs, config.cache.snapshot_ttl_secs);
    }

    #[test]
    fn blank_keys_mean_not_configured() {
        let config = Config::default();
        assert!(!config.has_alchemy_key());
        assert!(!config.has_dune_key());
    }
}
