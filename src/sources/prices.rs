/// Price source orchestration
///
/// Resolves USD unit prices for sets of token addresses with its own
/// short-lived cache, independent of the shared snapshot cache. Requests are
/// answered from cache where possible: only cache-missing addresses hit the
/// aggregator, and fresh results merge into the existing cached map without
/// extending its lifetime. Once the map itself expires, the next request
/// re-fetches the full set.
use crate::cache::TtlCache;
use crate::constants::{PRICES_CACHE_KEY, UNI_ADDRESS};
use crate::jar::types::TokenPrice;
use crate::logger::{log, LogTag};
use crate::sources::coingecko::CoinGeckoClient;
use crate::sources::defillama::DefiLlamaClient;
use futures::future::join_all;
use std::collections::HashMap;
use std::time::Duration;

/// Fixed chunk size for bulk price requests (upstream request-size limit)
const PRICE_CHUNK_SIZE: usize = 25;

pub struct PriceSource {
    llama: DefiLlamaClient,
    coingecko: CoinGeckoClient,
    cache: TtlCache<HashMap<String, TokenPrice>>,
    cache_ttl: Duration,
}

impl PriceSource {
    pub fn new(
        llama: DefiLlamaClient,
        coingecko: CoinGeckoClient,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            llama,
            coingecko,
            cache: TtlCache::new(),
            cache_ttl,
        }
    }

    /// Resolve prices for a set of addresses. Addresses with no resolvable
    /// price are simply absent from the result - never mapped to zero.
    pub async fn fetch_prices(&self, addresses: &[String]) -> HashMap<String, TokenPrice> {
        let requested: Vec<String> = addresses.iter().map(|a| a.to_lowercase()).collect();

        let (mut known, remaining_ttl) = if self.cache.is_expired(PRICES_CACHE_KEY) {
            // Expired map: throw it away and re-fetch the full set.
            (HashMap::new(), self.cache_ttl)
        } else {
            match self.cache.get_entry(PRICES_CACHE_KEY) {
                Some(entry) => {
                    let remaining = (entry.expires_at - chrono::Utc::now())
                        .to_std()
                        .unwrap_or(Duration::ZERO);
                    (entry.value, remaining)
                }
                None => (HashMap::new(), self.cache_ttl),
            }
        };

        let missing: Vec<String> = requested
            .iter()
            .filter(|a| !known.contains_key(*a))
            .cloned()
            .collect();

        if !missing.is_empty() {
            let fetched = self.fetch_chunked(&missing).await;
            log(
                LogTag::Api,
                "PRICES",
                &format!(
                    "fetched {}/{} missing prices ({} already cached)",
                    fetched.len(),
                    missing.len(),
                    requested.len() - missing.len()
                ),
            );
            known.extend(fetched);
            // Merge preserves the map's remaining lifetime; only a full
            // refetch after expiry earns a fresh TTL.
            self.cache.set(PRICES_CACHE_KEY, known.clone(), remaining_ttl);
        }

        requested
            .into_iter()
            .filter_map(|a| known.get(&a).map(|p| (a.clone(), *p)))
            .collect()
    }

    /// Last-resort burn-token price when the primary aggregator has none.
    /// A resolved fallback price is merged into the cached map so the next
    /// request within the TTL window sees it.
    pub async fn fallback_uni_price(&self) -> Option<f64> {
        match self.coingecko.fetch_uni_price().await {
            Ok(price) => {
                if let Some(entry) = self.cache.get_entry(PRICES_CACHE_KEY) {
                    let mut map = entry.value;
                    map.insert(
                        UNI_ADDRESS.to_string(),
                        TokenPrice {
                            price_usd: price,
                            confidence: None,
                        },
                    );
                    let remaining = (entry.expires_at - chrono::Utc::now())
                        .to_std()
                        .unwrap_or(Duration::ZERO);
                    self.cache.set(PRICES_CACHE_KEY, map, remaining);
                }
                Some(price)
            }
            Err(e) => {
                log(
                    LogTag::Api,
                    "WARN",
                    &format!("coingecko UNI price fallback failed: {}", e),
                );
                None
            }
        }
    }

    /// Fan out fixed-size chunks and merge the successes; a failed chunk is
    /// skipped without aborting the others.
    async fn fetch_chunked(&self, addresses: &[String]) -> HashMap<String, TokenPrice> {
        let chunks: Vec<&[String]> = addresses.chunks(PRICE_CHUNK_SIZE).collect();
        let fetches = chunks.iter().map(|chunk| self.llama.fetch_chunk(chunk));
        let results = join_all(fetches).await;

        let mut merged = HashMap::new();
        for (i, result) in results.into_iter().enumerate() {
            match result {
                Ok(prices) => merged.extend(prices),
                Err(e) => {
                    log(
                        LogTag::Api,
                        "WARN",
                        &format!("price chunk {}/{} failed: {}", i + 1, chunks.len(), e),
                    );
                }
            }
        }
        merged
    }
}
