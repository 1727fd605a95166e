/// Global constants used across jarwatch
///
/// System-wide constants that are not configurable: the burn token, the
/// known-token registry, cache keys and the unknown-token fallback policy.
use once_cell::sync::Lazy;
use std::collections::HashMap;

// ============================================================================
// ETHEREUM / BURN CONSTANTS
// ============================================================================

/// UNI governance token contract (the burn token)
pub const UNI_ADDRESS: &str = "0x1f9840a85d5af5bf1d1762f925bdaddc4201f984";

/// Chain qualifier used by the bulk price aggregator ("ethereum:0x...")
pub const PRICE_CHAIN_PREFIX: &str = "ethereum";

/// CoinGecko asset id for the burn token (single-asset fallback endpoint)
pub const UNI_COINGECKO_ID: &str = "uniswap";

// ============================================================================
// CACHE KEYS
// ============================================================================
// The cache key space is a fixed small set of named caches, not request-keyed,
// which is why the TTL store carries no size bound.

pub const SNAPSHOT_CACHE_KEY: &str = "jar_snapshot";
pub const BALANCES_CACHE_KEY: &str = "jar_balances";
pub const PRICES_CACHE_KEY: &str = "token_prices";
pub const ANALYTICS_CACHE_KEY: &str = "analytics_summary";

// ============================================================================
// UNKNOWN TOKEN FALLBACK POLICY
// ============================================================================

/// Defaults applied when token metadata cannot be resolved from the registry
/// or the provider. Applied only on that documented failure path, never as a
/// silent default elsewhere.
#[derive(Debug, Clone, Copy)]
pub struct UnknownTokenDefaults {
    pub symbol: &'static str,
    pub decimals: u8,
}

pub const UNKNOWN_TOKEN_DEFAULTS: UnknownTokenDefaults = UnknownTokenDefaults {
    symbol: "UNKNOWN",
    decimals: 18,
};

// ============================================================================
// KNOWN TOKEN REGISTRY
// ============================================================================

/// Static registry entry: symbol + decimals for a known mainnet token
#[derive(Debug, Clone, Copy)]
pub struct KnownToken {
    pub symbol: &'static str,
    pub decimals: u8,
}

/// Tokens the fallback balance path can discover. Keys are lower-cased
/// contract addresses. The fallback cannot see holdings outside this list -
/// a documented limitation of the registry path, not a bug.
static KNOWN_TOKEN_LIST: &[(&str, KnownToken)] = &[
    ("0x1f9840a85d5af5bf1d1762f925bdaddc4201f984", KnownToken { symbol: "UNI", decimals: 18 }),
    ("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2", KnownToken { symbol: "WETH", decimals: 18 }),
    ("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48", KnownToken { symbol: "USDC", decimals: 6 }),
    ("0xdac17f958d2ee523a2206206994597c13d831ec7", KnownToken { symbol: "USDT", decimals: 6 }),
    ("0x6b175474e89094c44da98b954eedeac495271d0f", KnownToken { symbol: "DAI", decimals: 18 }),
    ("0x2260fac5e5542a773aa44fbcfedf7c193bc2c599", KnownToken { symbol: "WBTC", decimals: 8 }),
    ("0x514910771af9ca656af840dff83e8264ecf986ca", KnownToken { symbol: "LINK", decimals: 18 }),
    ("0x7fc66500c84a76ad7e9c93437bfc5ac33e2ddae9", KnownToken { symbol: "AAVE", decimals: 18 }),
    ("0x9f8f72aa9304c8b593d555f12ef6589cc3a579a2", KnownToken { symbol: "MKR", decimals: 18 }),
    ("0xc00e94cb662c3520282e6f5717214004a7f26888", KnownToken { symbol: "COMP", decimals: 18 }),
    ("0xd533a949740bb3306d119cc777fa900ba034cd52", KnownToken { symbol: "CRV", decimals: 18 }),
    ("0x5a98fcbea516cf06857215779fd812ca3bef1b32", KnownToken { symbol: "LDO", decimals: 18 }),
    ("0x111111111117dc0aa78b770fa6a738034120c302", KnownToken { symbol: "1INCH", decimals: 18 }),
    ("0x7d1afa7b718fb893db30a3abc0cfc608aacfebb0", KnownToken { symbol: "MATIC", decimals: 18 }),
];

/// Known-token registry: lower-cased address -> (symbol, decimals).
/// Loaded once at process start, immutable thereafter.
pub static KNOWN_TOKENS: Lazy<HashMap<&'static str, KnownToken>> =
    Lazy::new(|| KNOWN_TOKEN_LIST.iter().cloned().collect());

/// Look up a token in the static registry (exact match on lower-cased address)
pub fn known_token(address: &str) -> Option<KnownToken> {
    KNOWN_TOKENS.get(address.to_lowercase().as_str()).copied()
}

/// Addresses the registry fallback path probes on-chain
pub fn registry_addresses() -> Vec<String> {
    KNOWN_TOKEN_LIST.iter().map(|(addr, _)| addr.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lookup_is_case_insensitive() {
        let upper = "0x1F9840a85d5aF5bf1D1762F925BDADdC4201F984";
        let token = known_token(upper).expect("UNI should be in the registry");
        assert_eq!(token.symbol, "UNI");
        assert_eq!(token.decimals, 18);
    }

    #[test]
    fn unknown_address_returns_none() {
        assert!(known_token("0x0000000000000000000000000000000000000001").is_none());
    }
}
