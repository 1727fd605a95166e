/// Profitability calculator
///
/// Pure function from priced balances to a profitability verdict. No I/O, no
/// clock dependence beyond stamping `fetched_at` - same inputs always produce
/// the same verdict, which is what makes this the unit boundary for the
/// numeric invariants:
///
///   burn_cost = threshold * uni_price
///   net       = total - (burn_cost + gas)
///   display + other + unpriced == total token count
use crate::jar::types::{PricedToken, ProfitabilitySnapshot, Provenance};

/// Fixed inputs of the computation (from config)
#[derive(Debug, Clone, Copy)]
pub struct CalculatorParams {
    pub burn_threshold_units: f64,
    pub gas_estimate_usd: f64,
    pub display_floor_usd: f64,
}

/// Compute the burn profitability verdict for one set of priced tokens
pub fn compute(
    priced: Vec<PricedToken>,
    uni_price_usd: Option<f64>,
    params: &CalculatorParams,
) -> ProfitabilitySnapshot {
    let total_jar_value_usd: f64 = priced.iter().filter_map(|t| t.value_usd).sum();

    let burn_cost_usd = params.burn_threshold_units * uni_price_usd.unwrap_or(0.0);
    let net_profit_usd = total_jar_value_usd - (burn_cost_usd + params.gas_estimate_usd);

    let mut display_tokens = Vec::new();
    let mut other_tokens_count = 0;
    let mut other_tokens_value_usd = 0.0;
    let mut unpriced_tokens_count = 0;

    for token in priced {
        match token.value_usd {
            Some(value) if value >= params.display_floor_usd => display_tokens.push(token),
            Some(value) => {
                other_tokens_count += 1;
                other_tokens_value_usd += value;
            }
            None => unpriced_tokens_count += 1,
        }
    }

    display_tokens.sort_by(|a, b| {
        b.value_usd
            .partial_cmp(&a.value_usd)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    ProfitabilitySnapshot {
        total_jar_value_usd,
        burn_cost_usd,
        gas_estimate_usd: params.gas_estimate_usd,
        net_profit_usd,
        is_profitable: net_profit_usd > 0.0,
        uni_price_usd,
        burn_threshold_units: params.burn_threshold_units,
        display_tokens,
        other_tokens_count,
        other_tokens_value_usd,
        unpriced_tokens_count,
        provenance: Provenance::BalanceDerived,
        analytics: None,
        fetched_at: chrono::Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jar::types::{TokenBalance, TokenPrice};
    use assert_approx_eq::assert_approx_eq;
    use ethers::types::U256;
    use pretty_assertions::assert_eq;

    const PARAMS: CalculatorParams = CalculatorParams {
        burn_threshold_units: 4000.0,
        gas_estimate_usd: 50.0,
        display_floor_usd: 10.0,
    };

    fn priced(symbol: &str, whole_units: u64, decimals: u8, price: Option<f64>) -> PricedToken {
        let raw = U256::from(whole_units) * U256::exp10(decimals as usize);
        let balance = TokenBalance::new(
            &format!("0x{:0>40}", symbol.to_lowercase()),
            symbol,
            decimals,
            raw,
        );
        PricedToken::from_balance(
            balance,
            price.map(|p| TokenPrice {
                price_usd: p,
                confidence: Some(0.99),
            }),
        )
    }

    #[test]
    fn uni_jar_scenario() {
        // 10,000 UNI at $5, threshold 4,000 UNI, $50 gas
        let snapshot = compute(vec![priced("UNI", 10_000, 18, Some(5.0))], Some(5.0), &PARAMS);

        assert_approx_eq!(snapshot.burn_cost_usd, 20_000.0);
        assert_approx_eq!(snapshot.total_jar_value_usd, 50_000.0);
        assert_approx_eq!(snapshot.net_profit_usd, 29_950.0);
        assert!(snapshot.is_profitable);
    }

    #[test]
    fn empty_jar_is_never_profitable() {
        let snapshot = compute(vec![], Some(5.0), &PARAMS);

        assert_approx_eq!(snapshot.total_jar_value_usd, 0.0);
        assert_approx_eq!(
            snapshot.net_profit_usd,
            -(snapshot.burn_cost_usd + snapshot.gas_estimate_usd)
        );
        assert!(!snapshot.is_profitable);
        assert!(snapshot.display_tokens.is_empty());
    }

    #[test]
    fn burn_cost_invariant_holds_exactly() {
        for price in [0.0, 0.01, 5.0, 12_345.678] {
            let snapshot = compute(vec![], Some(price), &PARAMS);
            assert_eq!(snapshot.burn_cost_usd, PARAMS.burn_threshold_units * price);
            assert_eq!(snapshot.is_profitable, snapshot.net_profit_usd > 0.0);
        }
    }

    #[test]
    fn partition_law() {
        let tokens = vec![
            priced("WETH", 10, 18, Some(3_000.0)), // display
            priced("USDC", 5_000, 6, Some(1.0)),   // display
            priced("DUST", 2, 18, Some(0.5)),      // other (below floor)
            priced("MYST", 1, 18, None),           // unpriced
            priced("JUNK", 9, 18, None),           // unpriced
        ];
        let total = tokens.len();
        let snapshot = compute(tokens, Some(5.0), &PARAMS);

        assert_eq!(
            snapshot.display_tokens.len()
                + snapshot.other_tokens_count
                + snapshot.unpriced_tokens_count,
            total
        );
        assert_eq!(snapshot.other_tokens_count, 1);
        assert_approx_eq!(snapshot.other_tokens_value_usd, 1.0);
        assert_eq!(snapshot.unpriced_tokens_count, 2);
    }

    #[test]
    fn display_tokens_sorted_descending_by_value() {
        let tokens = vec![
            priced("USDC", 5_000, 6, Some(1.0)),
            priced("WETH", 10, 18, Some(3_000.0)),
            priced("UNI", 100, 18, Some(5.0)),
        ];
        let snapshot = compute(tokens, Some(5.0), &PARAMS);

        let values: Vec<f64> = snapshot
            .display_tokens
            .iter()
            .map(|t| t.value_usd.unwrap())
            .collect();
        assert_eq!(values, vec![30_000.0, 5_000.0, 500.0]);
    }

    #[test]
    fn unpriced_tokens_do_not_contribute_value() {
        let tokens = vec![
            priced("WETH", 1, 18, Some(3_000.0)),
            priced("MYST", 1_000_000, 18, None),
        ];
        let snapshot = compute(tokens, Some(5.0), &PARAMS);
        assert_approx_eq!(snapshot.total_jar_value_usd, 3_000.0);
        assert_eq!(snapshot.unpriced_tokens_count, 1);
    }

    #[test]
    fn deterministic_excluding_fetched_at() {
        let build = || {
            compute(
                vec![
                    priced("WETH", 10, 18, Some(3_000.0)),
                    priced("MYST", 1, 18, None),
                ],
                Some(5.0),
                &PARAMS,
            )
        };
        let a = build();
        let b = build();

        assert_eq!(a.total_jar_value_usd, b.total_jar_value_usd);
        assert_eq!(a.burn_cost_usd, b.burn_cost_usd);
        assert_eq!(a.net_profit_usd, b.net_profit_usd);
        assert_eq!(a.is_profitable, b.is_profitable);
        assert_eq!(a.display_tokens.len(), b.display_tokens.len());
        assert_eq!(a.unpriced_tokens_count, b.unpriced_tokens_count);
    }

    #[test]
    fn missing_uni_price_means_zero_burn_cost() {
        let snapshot = compute(vec![priced("WETH", 1, 18, Some(100.0))], None, &PARAMS);
        assert_eq!(snapshot.uni_price_usd, None);
        assert_approx_eq!(snapshot.burn_cost_usd, 0.0);
    }
}
