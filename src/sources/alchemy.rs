/// Alchemy JSON-RPC integration
///
/// Primary balance enumeration (`alchemy_getTokenBalances`) and token
/// metadata (`alchemy_getTokenMetadata`) for the jar address, plus the plain
/// `eth_call` helper the registry fallback uses for per-token `balanceOf`
/// reads against any JSON-RPC endpoint.
use crate::errors::SourceError;
use crate::logger::{log, LogTag};
use ethers::types::U256;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Alchemy mainnet endpoint prefix; the API key is appended per instance
const ALCHEMY_BASE_URL: &str = "https://eth-mainnet.g.alchemy.com/v2";

/// ERC-20 balanceOf(address) selector
const BALANCE_OF_SELECTOR: &str = "0x70a08231";

// =============================================================================
// RESPONSE SCHEMAS
// =============================================================================

#[derive(Debug, Deserialize)]
struct JsonRpcEnvelope {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct TokenBalancesResult {
    #[serde(rename = "tokenBalances")]
    token_balances: Vec<RawTokenBalance>,
}

/// One entry of the bulk balance enumeration. `token_balance` is a hex
/// quantity; entries with a provider-side error carry `error` instead.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTokenBalance {
    #[serde(rename = "contractAddress")]
    pub contract_address: String,
    #[serde(rename = "tokenBalance")]
    pub token_balance: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Metadata for a single token contract
#[derive(Debug, Clone, Deserialize)]
pub struct TokenMetadata {
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
}

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Debug, Clone)]
pub struct AlchemyClient {
    http: reqwest::Client,
    endpoint: Option<String>,
}

impl AlchemyClient {
    /// A blank API key yields an unconfigured client; every call then returns
    /// `SourceError::Unavailable` so the caller falls through to the registry.
    pub fn new(api_key: &str, timeout_secs: u64) -> Self {
        let endpoint = if api_key.trim().is_empty() {
            None
        } else {
            Some(format!("{}/{}", ALCHEMY_BASE_URL, api_key.trim()))
        };

        Self {
            http: build_http_client(timeout_secs),
            endpoint,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    fn endpoint(&self) -> Result<&str, SourceError> {
        self.endpoint
            .as_deref()
            .ok_or(SourceError::Unavailable("alchemy"))
    }

    /// Bulk ERC-20 balance enumeration for an address
    pub async fn get_token_balances(
        &self,
        owner: &str,
    ) -> Result<Vec<RawTokenBalance>, SourceError> {
        let endpoint = self.endpoint()?;
        let result = json_rpc_call(
            &self.http,
            endpoint,
            "alchemy_getTokenBalances",
            json!([owner, "erc20"]),
        )
        .await?;

        let parsed: TokenBalancesResult =
            serde_json::from_value(result).map_err(|e| SourceError::Parse {
                what: "alchemy_getTokenBalances",
                message: e.to_string(),
            })?;

        log(
            LogTag::Api,
            "DEBUG",
            &format!(
                "alchemy enumerated {} token balances for {}",
                parsed.token_balances.len(),
                owner
            ),
        );

        Ok(parsed.token_balances)
    }

    /// Symbol + decimals for a single token contract
    pub async fn get_token_metadata(&self, token: &str) -> Result<TokenMetadata, SourceError> {
        let endpoint = self.endpoint()?;
        let result = json_rpc_call(
            &self.http,
            endpoint,
            "alchemy_getTokenMetadata",
            json!([token]),
        )
        .await?;

        serde_json::from_value(result).map_err(|e| SourceError::Parse {
            what: "alchemy_getTokenMetadata",
            message: e.to_string(),
        })
    }
}

// =============================================================================
// GENERIC JSON-RPC
// =============================================================================

pub(crate) fn build_http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Issue a JSON-RPC call and unwrap the result field
pub(crate) async fn json_rpc_call(
    http: &reqwest::Client,
    endpoint: &str,
    method: &str,
    params: Value,
) -> Result<Value, SourceError> {
    let body = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
        "params": params,
    });

    let response = http
        .post(endpoint)
        .json(&body)
        .send()
        .await
        .map_err(|e| classify_reqwest_error(endpoint, &e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        });
    }

    let envelope: JsonRpcEnvelope = response.json().await.map_err(|e| SourceError::Parse {
        what: "json-rpc envelope",
        message: e.to_string(),
    })?;

    if let Some(err) = envelope.error {
        return Err(SourceError::Network {
            endpoint: endpoint.to_string(),
            message: format!("rpc error {}: {}", err.code, err.message),
        });
    }

    envelope.result.ok_or(SourceError::Parse {
        what: "json-rpc envelope",
        message: "missing result field".to_string(),
    })
}

pub(crate) fn classify_reqwest_error(endpoint: &str, e: &reqwest::Error) -> SourceError {
    if e.is_timeout() {
        SourceError::Timeout {
            endpoint: endpoint.to_string(),
        }
    } else {
        SourceError::Network {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        }
    }
}

/// Read `balanceOf(owner)` for one token over a plain JSON-RPC endpoint
pub async fn erc20_balance_of(
    http: &reqwest::Client,
    rpc_url: &str,
    token: &str,
    owner: &str,
) -> Result<U256, SourceError> {
    let data = format!(
        "{}{:0>64}",
        BALANCE_OF_SELECTOR,
        owner.trim_start_matches("0x").to_lowercase()
    );

    let result = json_rpc_call(
        http,
        rpc_url,
        "eth_call",
        json!([{ "to": token, "data": data }, "latest"]),
    )
    .await?;

    let hex = result.as_str().ok_or(SourceError::Parse {
        what: "eth_call",
        message: "result is not a string".to_string(),
    })?;

    parse_hex_u256(hex).ok_or(SourceError::Parse {
        what: "eth_call",
        message: format!("invalid hex quantity: {}", hex),
    })
}

/// Parse a 0x-prefixed hex quantity into U256. Empty quantities ("0x") parse
/// as zero, matching provider behavior for never-touched slots.
pub fn parse_hex_u256(hex: &str) -> Option<U256> {
    let digits = hex.trim().trim_start_matches("0x");
    if digits.is_empty() {
        return Some(U256::zero());
    }
    U256::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_hex_quantities() {
        assert_eq!(parse_hex_u256("0x0"), Some(U256::zero()));
        assert_eq!(parse_hex_u256("0x"), Some(U256::zero()));
        assert_eq!(parse_hex_u256("0xde0b6b3a7640000"), Some(U256::exp10(18)));
        assert_eq!(parse_hex_u256("0xzz"), None);
    }

    #[test]
    fn unconfigured_client_reports_unavailable() {
        let client = AlchemyClient::new("  ", 5);
        assert!(!client.is_configured());
    }

    #[test]
    fn balance_of_calldata_is_padded() {
        let owner = "0x1a9C8182C09F50C8318d769245beA52c32BE35BC";
        let data = format!(
            "{}{:0>64}",
            BALANCE_OF_SELECTOR,
            owner.trim_start_matches("0x").to_lowercase()
        );
        assert_eq!(data.len(), 2 + 8 + 64);
        assert!(data.starts_with("0x70a08231000000000000000000000000"));
    }
}
