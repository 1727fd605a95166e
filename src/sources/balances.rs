/// Balance source for the jar address
///
/// Resolves current token holdings through two paths:
/// 1. Primary: Alchemy bulk enumeration (high coverage, needs a credential)
/// 2. Fallback: per-token `balanceOf` reads over the fixed known-token
///    registry (works without a credential but cannot discover holdings
///    outside the registry - a documented limitation)
///
/// Total failure of both paths yields an empty set, never an error. Callers
/// must treat empty as "no data", not "zero holdings".
use crate::cache::TtlCache;
use crate::constants::{
    known_token, registry_addresses, BALANCES_CACHE_KEY, UNKNOWN_TOKEN_DEFAULTS,
};
use crate::jar::types::TokenBalance;
use crate::logger::{log, LogTag};
use crate::sources::alchemy::{
    build_http_client, erc20_balance_of, parse_hex_u256, AlchemyClient, RawTokenBalance,
};
use ethers::types::U256;
use futures::future::join_all;
use std::time::Duration;

pub struct BalanceSource {
    alchemy: AlchemyClient,
    http: reqwest::Client,
    rpc_url: String,
    jar_address: String,
    cache: TtlCache<Vec<TokenBalance>>,
    cache_ttl: Duration,
}

impl BalanceSource {
    pub fn new(
        alchemy: AlchemyClient,
        rpc_url: &str,
        jar_address: &str,
        cache_ttl: Duration,
        timeout_secs: u64,
    ) -> Self {
        Self {
            alchemy,
            http: build_http_client(timeout_secs),
            rpc_url: rpc_url.to_string(),
            jar_address: jar_address.to_lowercase(),
            cache: TtlCache::new(),
            cache_ttl,
        }
    }

    /// Current non-zero token holdings of the jar
    pub async fn fetch_balances(&self) -> Vec<TokenBalance> {
        if !self.cache.is_expired(BALANCES_CACHE_KEY) {
            if let Some((cached, _)) = self.cache.get(BALANCES_CACHE_KEY) {
                log(
                    LogTag::Api,
                    "DEBUG",
                    &format!("balance cache hit ({} tokens)", cached.len()),
                );
                return cached;
            }
        }

        let mut balances = self.fetch_from_alchemy().await;

        if balances.is_empty() {
            log(
                LogTag::Api,
                "FALLBACK",
                "primary balance path yielded nothing, probing known-token registry",
            );
            balances = self.fetch_from_registry().await;
        }

        // Empty results are cached too: "no data" within the TTL window is
        // still an answer, and re-fetching on every read would hammer a
        // provider that is already failing.
        self.cache
            .set(BALANCES_CACHE_KEY, balances.clone(), self.cache_ttl);
        balances
    }

    /// Drop the cached balance set so the next read goes to the providers
    pub fn invalidate_cache(&self) {
        self.cache.invalidate(BALANCES_CACHE_KEY);
    }

    // =========================================================================
    // PRIMARY PATH
    // =========================================================================

    async fn fetch_from_alchemy(&self) -> Vec<TokenBalance> {
        let entries = match self.alchemy.get_token_balances(&self.jar_address).await {
            Ok(entries) => entries,
            Err(e) => {
                log(
                    LogTag::Api,
                    "WARN",
                    &format!("alchemy balance enumeration failed: {}", e),
                );
                return Vec::new();
            }
        };

        let holdings = usable_raw_balances(&entries);
        if holdings.is_empty() {
            return Vec::new();
        }

        // Metadata lookups have no data dependency on each other; fan out.
        let resolutions = holdings
            .iter()
            .map(|(address, _)| self.resolve_metadata(address));
        let metadata = join_all(resolutions).await;

        holdings
            .into_iter()
            .zip(metadata)
            .map(|((address, raw), (symbol, decimals))| {
                TokenBalance::new(&address, &symbol, decimals, raw)
            })
            .collect()
    }

    /// Resolve `(symbol, decimals)` for a token: static registry first, then
    /// the provider metadata endpoint, then the unknown-token defaults.
    /// Metadata failure never fails the balance itself.
    async fn resolve_metadata(&self, address: &str) -> (String, u8) {
        if let Some(token) = known_token(address) {
            return (token.symbol.to_string(), token.decimals);
        }

        match self.alchemy.get_token_metadata(address).await {
            Ok(meta) => {
                let symbol = meta
                    .symbol
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| UNKNOWN_TOKEN_DEFAULTS.symbol.to_string());
                let decimals = meta.decimals.unwrap_or(UNKNOWN_TOKEN_DEFAULTS.decimals);
                (symbol, decimals)
            }
            Err(e) => {
                log(
                    LogTag::Api,
                    "WARN",
                    &format!(
                        "metadata lookup failed for {}, applying unknown-token defaults: {}",
                        address, e
                    ),
                );
                (
                    UNKNOWN_TOKEN_DEFAULTS.symbol.to_string(),
                    UNKNOWN_TOKEN_DEFAULTS.decimals,
                )
            }
        }
    }

    // =========================================================================
    // REGISTRY FALLBACK PATH
    // =========================================================================

    async fn fetch_from_registry(&self) -> Vec<TokenBalance> {
        let addresses = registry_addresses();
        let reads = addresses.iter().map(|token| {
            let http = &self.http;
            let rpc_url = &self.rpc_url;
            let owner = &self.jar_address;
            async move {
                match erc20_balance_of(http, rpc_url, token, owner).await {
                    Ok(raw) => Some((token.clone(), raw)),
                    Err(e) => {
                        log(
                            LogTag::Api,
                            "DEBUG",
                            &format!("registry balanceOf failed for {}: {}", token, e),
                        );
                        None
                    }
                }
            }
        });

        let results = join_all(reads).await;
        let balances = assemble_registry_balances(results.into_iter().flatten().collect());

        log(
            LogTag::Api,
            "REGISTRY",
            &format!(
                "registry fallback found {} non-zero holdings of {} probed",
                balances.len(),
                addresses.len()
            ),
        );

        balances
    }
}

/// Turn registry `balanceOf` reads into balances: zeros are dropped and only
/// registry-listed addresses survive (the fallback cannot name anything else)
fn assemble_registry_balances(reads: Vec<(String, U256)>) -> Vec<TokenBalance> {
    reads
        .into_iter()
        .filter(|(_, raw)| !raw.is_zero())
        .filter_map(|(address, raw)| {
            known_token(&address)
                .map(|token| TokenBalance::new(&address, token.symbol, token.decimals, raw))
        })
        .collect()
}

/// Filter the bulk enumeration down to parseable, strictly positive holdings
fn usable_raw_balances(entries: &[RawTokenBalance]) -> Vec<(String, U256)> {
    entries
        .iter()
        .filter(|e| e.error.is_none())
        .filter_map(|e| {
            let hex = e.token_balance.as_deref()?;
            let raw = parse_hex_u256(hex)?;
            if raw.is_zero() {
                None
            } else {
                Some((e.contract_address.to_lowercase(), raw))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(address: &str, balance: Option<&str>, error: Option<&str>) -> RawTokenBalance {
        RawTokenBalance {
            contract_address: address.to_string(),
            token_balance: balance.map(|s| s.to_string()),
            error: error.map(|s| s.to_string()),
        }
    }

    #[test]
    fn zero_and_malformed_balances_are_filtered() {
        let entries = vec![
            entry("0xAAA", Some("0x0"), None),
            entry("0xBBB", Some("0xde0b6b3a7640000"), None),
            entry("0xCCC", Some("not-hex"), None),
            entry("0xDDD", None, None),
            entry("0xEEE", Some("0x5"), Some("upstream error")),
        ];

        let usable = usable_raw_balances(&entries);
        assert_eq!(usable.len(), 1);
        assert_eq!(usable[0].0, "0xbbb");
        assert_eq!(usable[0].1, U256::exp10(18));
    }

    #[test]
    fn addresses_are_lowercased_for_registry_matching() {
        let entries = vec![entry(
            "0x1F9840a85d5aF5bf1D1762F925BDADdC4201F984",
            Some("0x1"),
            None,
        )];
        let usable = usable_raw_balances(&entries);
        assert_eq!(usable[0].0, "0x1f9840a85d5af5bf1d1762f925bdaddc4201f984");
        assert!(known_token(&usable[0].0).is_some());
    }

    #[test]
    fn registry_assembly_keeps_only_known_nonzero_tokens() {
        let uni = crate::constants::UNI_ADDRESS.to_string();
        let weth = "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2".to_string();
        let stranger = "0x00000000000000000000000000000000000000ff".to_string();

        let reads = vec![
            (uni.clone(), U256::exp10(18)), // known, non-zero
            (weth, U256::zero()),           // known, zero: dropped
            (stranger, U256::exp10(18)),    // non-zero but not in the registry
        ];

        let balances = assemble_registry_balances(reads);
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].address, uni);
        assert_eq!(balances[0].symbol, "UNI");
        assert_eq!(balances[0].decimals, 18);
    }

    #[tokio::test]
    async fn unknown_token_defaults_apply_only_off_the_registry() {
        // Unconfigured client: the metadata endpoint is unavailable, so an
        // unknown address must fall to the named defaults while a registry
        // address resolves without any network at all.
        let source = BalanceSource::new(
            AlchemyClient::new("", 1),
            "http://127.0.0.1:1",
            "0x1a9c8182c09f50c8318d769245bea52c32be35bc",
            Duration::from_secs(60),
            1,
        );

        let (symbol, decimals) = source
            .resolve_metadata("0x00000000000000000000000000000000000000ff")
            .await;
        assert_eq!(symbol, UNKNOWN_TOKEN_DEFAULTS.symbol);
        assert_eq!(decimals, UNKNOWN_TOKEN_DEFAULTS.decimals);

        let (symbol, decimals) = source.resolve_metadata(crate::constants::UNI_ADDRESS).await;
        assert_eq!(symbol, "UNI");
        assert_eq!(decimals, 18);
    }

    #[tokio::test]
    async fn unconfigured_primary_falls_back_without_erroring() {
        // No Alchemy key and an unreachable RPC endpoint: both paths fail,
        // which must surface as an empty set, never an error.
        let source = BalanceSource::new(
            AlchemyClient::new("", 1),
            "http://127.0.0.1:1", // nothing listens here
            "0x1a9c8182c09f50c8318d769245bea52c32be35bc",
            Duration::from_secs(60),
            1,
        );
        let balances = source.fetch_balances().await;
        assert!(balances.is_empty());
    }

    #[tokio::test]
    async fn cache_serves_within_ttl_and_invalidation_clears_it() {
        let source = BalanceSource::new(
            AlchemyClient::new("", 1),
            "http://127.0.0.1:1",
            "0x1a9c8182c09f50c8318d769245bea52c32be35bc",
            Duration::from_secs(60),
            1,
        );

        // Seed the private cache directly; fetch must serve it without I/O.
        let seeded = vec![TokenBalance::new(
            crate::constants::UNI_ADDRESS,
            "UNI",
            18,
            U256::exp10(18),
        )];
        source
            .cache
            .set(BALANCES_CACHE_KEY, seeded.clone(), Duration::from_secs(60));

        let served = source.fetch_balances().await;
        assert_eq!(served.len(), 1);
        assert_eq!(served[0].symbol, "UNI");

        source.invalidate_cache();
        assert!(source.cache.get(BALANCES_CACHE_KEY).is_none());
    }
}
