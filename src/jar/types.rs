/// Core data model for jar valuation
///
/// Raw token amounts stay in 256-bit integers with lossless decimal-string
/// formatting; only USD values (price * formatted amount) use floating point.
use chrono::{DateTime, Utc};
use ethers::types::U256;
use serde::{Serialize, Serializer};

// =============================================================================
// TOKEN BALANCES
// =============================================================================

/// A single token holding of the jar. `raw_amount` is ground truth;
/// `formatted_amount` is `raw / 10^decimals` as a decimal string so large
/// supplies survive display without float precision loss.
#[derive(Debug, Clone, Serialize)]
pub struct TokenBalance {
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
    #[serde(serialize_with = "serialize_u256_decimal")]
    pub raw_amount: U256,
    pub formatted_amount: String,
}

impl TokenBalance {
    pub fn new(address: &str, symbol: &str, decimals: u8, raw_amount: U256) -> Self {
        Self {
            address: address.to_lowercase(),
            symbol: symbol.to_string(),
            decimals,
            raw_amount,
            formatted_amount: format_units(raw_amount, decimals),
        }
    }

    /// Formatted amount as f64, for USD math only
    pub fn formatted_as_f64(&self) -> f64 {
        self.formatted_amount.parse::<f64>().unwrap_or(0.0)
    }
}

/// Resolved unit price for a token
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TokenPrice {
    pub price_usd: f64,
    pub confidence: Option<f64>,
}

/// A balance with its (possibly absent) USD pricing. `value_usd` is present
/// iff `unit_price_usd` is; an unpriced token is never coerced to zero value.
#[derive(Debug, Clone, Serialize)]
pub struct PricedToken {
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
    #[serde(serialize_with = "serialize_u256_decimal")]
    pub raw_amount: U256,
    pub formatted_amount: String,
    pub unit_price_usd: Option<f64>,
    pub value_usd: Option<f64>,
    pub confidence: Option<f64>,
}

impl PricedToken {
    pub fn from_balance(balance: TokenBalance, price: Option<TokenPrice>) -> Self {
        let value_usd = price.map(|p| p.price_usd * balance.formatted_as_f64());
        Self {
            unit_price_usd: price.map(|p| p.price_usd),
            confidence: price.and_then(|p| p.confidence),
            value_usd,
            address: balance.address,
            symbol: balance.symbol,
            decimals: balance.decimals,
            raw_amount: balance.raw_amount,
            formatted_amount: balance.formatted_amount,
        }
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Which source produced the headline valuation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    BalanceDerived,
    Analytics,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::BalanceDerived => "balance-derived",
            Provenance::Analytics => "analytics",
        }
    }

    /// Human-readable description of the underlying providers
    pub fn source_label(&self) -> &'static str {
        match self {
            Provenance::BalanceDerived => "alchemy + defillama",
            Provenance::Analytics => "dune analytics",
        }
    }
}

/// Cache state of a served snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Fresh,
    Stale,
    Miss,
    Live,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Fresh => "fresh",
            CacheStatus::Stale => "stale",
            CacheStatus::Miss => "miss",
            CacheStatus::Live => "live",
        }
    }
}

/// One aggregator run's verdict. Immutable once created; the next run
/// supersedes it in the cache rather than mutating it.
#[derive(Debug, Clone, Serialize)]
pub struct ProfitabilitySnapshot {
    pub total_jar_value_usd: f64,
    pub burn_cost_usd: f64,
    pub gas_estimate_usd: f64,
    pub net_profit_usd: f64,
    pub is_profitable: bool,
    pub uni_price_usd: Option<f64>,
    pub burn_threshold_units: f64,
    /// Tokens at or above the display floor, descending by value
    pub display_tokens: Vec<PricedToken>,
    /// Priced tokens below the display floor
    pub other_tokens_count: usize,
    pub other_tokens_value_usd: f64,
    /// Tokens with no resolvable price (counted, never valued as zero)
    pub unpriced_tokens_count: usize,
    pub provenance: Provenance,
    /// Analytics breakdown, attached (not merged) when the overlay applied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics: Option<AnalyticsSummary>,
    pub fetched_at: DateTime<Utc>,
}

// =============================================================================
// ANALYTICS SUMMARY
// =============================================================================

/// One entry of the analytics top-N breakdown
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsEntry {
    pub symbol: String,
    pub value_usd: f64,
}

/// Vault-wide valuation from the analytics warehouse. `vault_value_usd`
/// (upstream's combined jar + unclaimed total) and `jar_only_value_usd` are
/// observed to disagree upstream; both are preserved distinctly and neither
/// is derived from the other.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSummary {
    pub vault_value_usd: f64,
    pub jar_only_value_usd: Option<f64>,
    pub unclaimed_value_usd: f64,
    pub token_count: usize,
    /// Distance to the burn threshold as pre-computed by the source,
    /// treated as more authoritative than local math when present
    pub distance_to_threshold_usd: Option<f64>,
    pub top_entries: Vec<AnalyticsEntry>,
    pub fetched_at: DateTime<Utc>,
}

// =============================================================================
// UNIT FORMATTING
// =============================================================================

/// Convert a raw integer amount to its decimal-string representation
/// (`raw / 10^decimals`), losslessly. Trailing fractional zeros are trimmed.
pub fn format_units(raw: U256, decimals: u8) -> String {
    let digits = raw.to_string();
    if decimals == 0 {
        return digits;
    }

    let decimals = decimals as usize;
    let (int_part, frac_part) = if digits.len() > decimals {
        let split = digits.len() - decimals;
        (digits[..split].to_string(), digits[split..].to_string())
    } else {
        (
            "0".to_string(),
            format!("{:0>width$}", digits, width = decimals),
        )
    };

    let frac_trimmed = frac_part.trim_end_matches('0');
    if frac_trimmed.is_empty() {
        int_part
    } else {
        format!("{}.{}", int_part, frac_trimmed)
    }
}

fn serialize_u256_decimal<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn u256(s: &str) -> U256 {
        U256::from_dec_str(s).unwrap()
    }

    #[test]
    fn format_units_whole_amount() {
        // 10,000 UNI at 18 decimals
        assert_eq!(format_units(u256("10000000000000000000000"), 18), "10000");
    }

    #[test]
    fn format_units_fractional() {
        assert_eq!(format_units(u256("1234500000"), 6), "1234.5");
        assert_eq!(format_units(u256("1"), 18), "0.000000000000000001");
    }

    #[test]
    fn format_units_zero_decimals() {
        assert_eq!(format_units(u256("42"), 0), "42");
    }

    #[test]
    fn format_units_zero_amount() {
        assert_eq!(format_units(U256::zero(), 18), "0");
    }

    #[test]
    fn format_units_survives_large_supply() {
        // 10^30 raw units - beyond f64's exact integer range
        let formatted = format_units(u256("1000000000000000000000000000000"), 18);
        assert_eq!(formatted, "1000000000000");
    }

    #[test]
    fn priced_token_value_present_iff_price_present() {
        let balance = TokenBalance::new(
            "0x1f9840a85d5af5bf1d1762f925bdaddc4201f984",
            "UNI",
            18,
            u256("10000000000000000000000"),
        );

        let unpriced = PricedToken::from_balance(balance.clone(), None);
        assert!(unpriced.unit_price_usd.is_none());
        assert!(unpriced.value_usd.is_none());

        let priced = PricedToken::from_balance(
            balance,
            Some(TokenPrice {
                price_usd: 5.0,
                confidence: Some(0.99),
            }),
        );
        assert_eq!(priced.unit_price_usd, Some(5.0));
        assert_eq!(priced.value_usd, Some(50_000.0));
    }

    #[test]
    fn balance_normalizes_address_case() {
        let balance = TokenBalance::new(
            "0x1F9840a85d5aF5bf1D1762F925BDADdC4201F984",
            "UNI",
            18,
            U256::one(),
        );
        assert_eq!(balance.address, "0x1f9840a85d5af5bf1d1762f925bdaddc4201f984");
    }
}
