/// Snapshot aggregator
///
/// Orchestrates one full valuation run: balances, then prices, then the pure
/// profitability computation, then the optional analytics overlay. Partial
/// data is always preferred over no data - every source failure short of a
/// calculator defect still produces a snapshot.
use crate::constants::UNI_ADDRESS;
use crate::errors::JarError;
use crate::jar::calculator::{self, CalculatorParams};
use crate::jar::service::SnapshotProducer;
use crate::jar::types::{PricedToken, ProfitabilitySnapshot, Provenance};
use crate::logger::{log, LogTag};
use crate::sources::balances::BalanceSource;
use crate::sources::dune::AnalyticsSource;
use crate::sources::prices::PriceSource;
use async_trait::async_trait;
use std::sync::Arc;

pub struct Aggregator {
    balances: BalanceSource,
    prices: PriceSource,
    analytics: Arc<AnalyticsSource>,
    params: CalculatorParams,
}

impl Aggregator {
    pub fn new(
        balances: BalanceSource,
        prices: PriceSource,
        analytics: Arc<AnalyticsSource>,
        params: CalculatorParams,
    ) -> Self {
        Self {
            balances,
            prices,
            analytics,
            params,
        }
    }

    /// Run the full pipeline and produce one snapshot
    pub async fn compute_snapshot(
        &self,
        force_refresh_analytics: bool,
    ) -> Result<ProfitabilitySnapshot, JarError> {
        if !self.params.burn_threshold_units.is_finite()
            || !self.params.gas_estimate_usd.is_finite()
        {
            return Err(JarError::Computation(
                "burn parameters are not finite".to_string(),
            ));
        }

        let balances = self.balances.fetch_balances().await;
        log(
            LogTag::Jar,
            "BALANCES",
            &format!("jar holds {} non-zero tokens", balances.len()),
        );

        // The burn token price is needed even when the jar holds no UNI.
        let mut addresses: Vec<String> = balances.iter().map(|b| b.address.clone()).collect();
        if !addresses.iter().any(|a| a == UNI_ADDRESS) {
            addresses.push(UNI_ADDRESS.to_string());
        }

        let price_map = self.prices.fetch_prices(&addresses).await;

        let uni_price_usd = match price_map.get(UNI_ADDRESS) {
            Some(price) => Some(price.price_usd),
            None => self.prices.fallback_uni_price().await,
        };
        if uni_price_usd.is_none() {
            log(
                LogTag::Jar,
                "WARN",
                "UNI price unresolved on both endpoints; burn cost unknown",
            );
        }

        let priced: Vec<PricedToken> = balances
            .into_iter()
            .map(|balance| {
                let price = price_map.get(&balance.address).copied();
                PricedToken::from_balance(balance, price)
            })
            .collect();

        let base = calculator::compute(priced, uni_price_usd, &self.params);

        let snapshot = if self.analytics.is_configured() {
            match self.analytics.fetch_summary(force_refresh_analytics).await {
                Some(summary) => {
                    log(
                        LogTag::Jar,
                        "OVERLAY",
                        &format!(
                            "analytics overlay applied: ${:.2} vault value",
                            summary.vault_value_usd
                        ),
                    );
                    apply_analytics_overlay(base, summary)
                }
                None => base,
            }
        } else {
            base
        };

        log(
            LogTag::Jar,
            "SNAPSHOT",
            &format!(
                "total ${:.2}, net ${:.2}, profitable: {} ({})",
                snapshot.total_jar_value_usd,
                snapshot.net_profit_usd,
                snapshot.is_profitable,
                snapshot.provenance.as_str()
            ),
        );

        Ok(snapshot)
    }
}

#[async_trait]
impl SnapshotProducer for Aggregator {
    async fn produce(&self, force_refresh_analytics: bool) -> Result<ProfitabilitySnapshot, JarError> {
        self.compute_snapshot(force_refresh_analytics).await
    }
}

/// Replace the headline valuation with the analytics figure and recompute
/// what depends on it. The token-level breakdown stays balance-derived: the
/// overlay is attached, never merged field-by-field.
fn apply_analytics_overlay(
    base: ProfitabilitySnapshot,
    summary: crate::jar::types::AnalyticsSummary,
) -> ProfitabilitySnapshot {
    let total_jar_value_usd = summary.vault_value_usd;
    let net_profit_usd = total_jar_value_usd - (base.burn_cost_usd + base.gas_estimate_usd);

    ProfitabilitySnapshot {
        total_jar_value_usd,
        net_profit_usd,
        is_profitable: net_profit_usd > 0.0,
        provenance: Provenance::Analytics,
        analytics: Some(summary),
        ..base
    }
}
