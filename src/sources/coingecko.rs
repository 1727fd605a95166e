/// CoinGecko single-asset price fallback
///
/// Last resort for the protocol-critical burn token price when the primary
/// aggregator has no quote for it. Only ever queried for one asset.
use crate::constants::UNI_COINGECKO_ID;
use crate::errors::SourceError;
use crate::logger::{log, LogTag};
use crate::sources::alchemy::{build_http_client, classify_reqwest_error};
use serde_json::Value;

const COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3/simple/price";

#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    http: reqwest::Client,
}

impl CoinGeckoClient {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            http: build_http_client(timeout_secs),
        }
    }

    /// USD price of the burn token
    pub async fn fetch_uni_price(&self) -> Result<f64, SourceError> {
        let url = format!(
            "{}?ids={}&vs_currencies=usd",
            COINGECKO_BASE_URL, UNI_COINGECKO_ID
        );

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(COINGECKO_BASE_URL, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                endpoint: COINGECKO_BASE_URL.to_string(),
                status: status.as_u16(),
            });
        }

        let body: Value = response.json().await.map_err(|e| SourceError::Parse {
            what: "coingecko simple price",
            message: e.to_string(),
        })?;

        let price = body
            .get(UNI_COINGECKO_ID)
            .and_then(|asset| asset.get("usd"))
            .and_then(|p| p.as_f64())
            .ok_or(SourceError::NoData("coingecko"))?;

        log(
            LogTag::Api,
            "FALLBACK",
            &format!("coingecko resolved UNI price: ${:.4}", price),
        );

        Ok(price)
    }
}
