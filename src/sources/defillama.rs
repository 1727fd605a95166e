/// DefiLlama bulk price lookups
///
/// The primary price aggregator: chain-qualified addresses go in, USD price
/// plus a confidence score come out. Requests are chunked by the caller to
/// respect the upstream's request-size limits.
use crate::constants::PRICE_CHAIN_PREFIX;
use crate::errors::SourceError;
use crate::jar::types::TokenPrice;
use crate::logger::{log, LogTag};
use crate::sources::alchemy::{build_http_client, classify_reqwest_error};
use serde::Deserialize;
use std::collections::HashMap;

const DEFILLAMA_BASE_URL: &str = "https://coins.llama.fi/prices/current";

// =============================================================================
// RESPONSE SCHEMA
// =============================================================================

#[derive(Debug, Deserialize)]
struct PricesResponse {
    coins: HashMap<String, CoinPrice>,
}

#[derive(Debug, Deserialize)]
struct CoinPrice {
    price: f64,
    #[serde(default)]
    confidence: Option<f64>,
}

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Debug, Clone)]
pub struct DefiLlamaClient {
    http: reqwest::Client,
}

impl DefiLlamaClient {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            http: build_http_client(timeout_secs),
        }
    }

    /// Fetch prices for one chunk of addresses. Addresses absent from the
    /// response simply have no price - a distinguishable outcome from zero.
    pub async fn fetch_chunk(
        &self,
        addresses: &[String],
    ) -> Result<HashMap<String, TokenPrice>, SourceError> {
        if addresses.is_empty() {
            return Ok(HashMap::new());
        }

        let keys = addresses
            .iter()
            .map(|a| format!("{}:{}", PRICE_CHAIN_PREFIX, a.to_lowercase()))
            .collect::<Vec<_>>()
            .join(",");
        let url = format!("{}/{}", DEFILLAMA_BASE_URL, keys);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(DEFILLAMA_BASE_URL, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                endpoint: DEFILLAMA_BASE_URL.to_string(),
                status: status.as_u16(),
            });
        }

        let parsed: PricesResponse = response.json().await.map_err(|e| SourceError::Parse {
            what: "defillama prices",
            message: e.to_string(),
        })?;

        let prices: HashMap<String, TokenPrice> = parsed
            .coins
            .into_iter()
            .filter_map(|(key, coin)| {
                let address = strip_chain_prefix(&key)?;
                Some((
                    address,
                    TokenPrice {
                        price_usd: coin.price,
                        confidence: coin.confidence,
                    },
                ))
            })
            .collect();

        log(
            LogTag::Api,
            "DEBUG",
            &format!(
                "defillama chunk resolved {}/{} prices",
                prices.len(),
                addresses.len()
            ),
        );

        Ok(prices)
    }
}

/// "ethereum:0xAbc..." -> "0xabc..."
fn strip_chain_prefix(key: &str) -> Option<String> {
    let (chain, address) = key.split_once(':')?;
    if chain != PRICE_CHAIN_PREFIX {
        return None;
    }
    Some(address.to_lowercase())
}
