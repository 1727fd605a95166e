/// Dune analytics integration (optional, credential-gated)
///
/// Fetches the vault-wide valuation query and condenses its per-token result
/// set into an `AnalyticsSummary`. Treated as authoritative for the headline
/// valuation when available; any HTTP, parse or empty-result failure yields
/// `None` so callers always fall back to the balance-derived pipeline.
///
/// Results are cached under their own key with a long TTL - the upstream
/// query only refreshes a few times a day.
use crate::cache::TtlCache;
use crate::constants::ANALYTICS_CACHE_KEY;
use crate::errors::SourceError;
use crate::jar::types::{AnalyticsEntry, AnalyticsSummary};
use crate::logger::{log, LogTag};
use crate::sources::alchemy::{build_http_client, classify_reqwest_error};
use serde::Deserialize;
use std::time::Duration;

const DUNE_BASE_URL: &str = "https://api.dune.com/api/v1";

/// Length cap for the top-entries breakdown
const TOP_ENTRIES_LIMIT: usize = 10;

// =============================================================================
// RESPONSE SCHEMA
// =============================================================================

#[derive(Debug, Deserialize)]
struct DuneResultsResponse {
    result: Option<DuneResult>,
}

#[derive(Debug, Deserialize)]
struct DuneResult {
    rows: Vec<DuneRow>,
}

/// One per-token row of the valuation query. `value_usd` is upstream's
/// combined jar + unclaimed total while `jar_value_usd` is nominally the jar
/// portion only; the two are not always consistent upstream, so both are
/// carried through distinctly and neither is derived from the other.
#[derive(Debug, Clone, Deserialize)]
struct DuneRow {
    #[serde(alias = "token_symbol")]
    symbol: Option<String>,
    value_usd: Option<f64>,
    #[serde(default)]
    jar_value_usd: Option<f64>,
    #[serde(default)]
    unclaimed_value_usd: Option<f64>,
    /// Distance to the burn threshold as computed inside the query itself
    #[serde(default)]
    distance_to_threshold_usd: Option<f64>,
}

// =============================================================================
// SOURCE
// =============================================================================

pub struct AnalyticsSource {
    http: reqwest::Client,
    api_key: Option<String>,
    query_id: u64,
    cache: TtlCache<AnalyticsSummary>,
    cache_ttl: Duration,
}

impl AnalyticsSource {
    pub fn new(api_key: &str, query_id: u64, cache_ttl: Duration, timeout_secs: u64) -> Self {
        let api_key = if api_key.trim().is_empty() {
            None
        } else {
            Some(api_key.trim().to_string())
        };

        Self {
            http: build_http_client(timeout_secs),
            api_key,
            query_id,
            cache: TtlCache::new(),
            cache_ttl,
        }
    }

    /// True iff the credential is present. Absence is a supported
    /// configuration: the aggregator simply never applies the overlay.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Fetch the vault summary. `force_refresh` bypasses the cache read but
    /// still writes through on success.
    pub async fn fetch_summary(&self, force_refresh: bool) -> Option<AnalyticsSummary> {
        if !self.is_configured() {
            return None;
        }

        if !force_refresh && !self.cache.is_expired(ANALYTICS_CACHE_KEY) {
            if let Some((cached, _)) = self.cache.get(ANALYTICS_CACHE_KEY) {
                return Some(cached);
            }
        }

        match self.fetch_from_dune().await {
            Ok(summary) => {
                self.cache
                    .set(ANALYTICS_CACHE_KEY, summary.clone(), self.cache_ttl);
                Some(summary)
            }
            Err(e) => {
                log(
                    LogTag::Api,
                    "WARN",
                    &format!("analytics fetch failed, overlay skipped: {}", e),
                );
                None
            }
        }
    }

    async fn fetch_from_dune(&self) -> Result<AnalyticsSummary, SourceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(SourceError::Unavailable("dune"))?;
        let url = format!("{}/query/{}/results", DUNE_BASE_URL, self.query_id);

        let response = self
            .http
            .get(&url)
            .header("X-Dune-API-Key", api_key)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(DUNE_BASE_URL, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                endpoint: DUNE_BASE_URL.to_string(),
                status: status.as_u16(),
            });
        }

        let parsed: DuneResultsResponse =
            response.json().await.map_err(|e| SourceError::Parse {
                what: "dune results",
                message: e.to_string(),
            })?;

        let rows = parsed
            .result
            .map(|r| r.rows)
            .filter(|rows| !rows.is_empty())
            .ok_or(SourceError::NoData("dune"))?;

        Ok(summarize_rows(rows))
    }
}

/// Aggregate the per-token result set into the summary shape
fn summarize_rows(rows: Vec<DuneRow>) -> AnalyticsSummary {
    let token_count = rows.len();
    let vault_value_usd: f64 = rows.iter().filter_map(|r| r.value_usd).sum();
    let unclaimed_value_usd: f64 = rows.iter().filter_map(|r| r.unclaimed_value_usd).sum();

    let jar_only_values: Vec<f64> = rows.iter().filter_map(|r| r.jar_value_usd).collect();
    let jar_only_value_usd = if jar_only_values.is_empty() {
        None
    } else {
        Some(jar_only_values.iter().sum())
    };

    let distance_to_threshold_usd = rows.iter().find_map(|r| r.distance_to_threshold_usd);

    let mut entries: Vec<AnalyticsEntry> = rows
        .into_iter()
        .filter_map(|row| {
            Some(AnalyticsEntry {
                symbol: row.symbol?,
                value_usd: row.value_usd?,
            })
        })
        .collect();
    entries.sort_by(|a, b| {
        b.value_usd
            .partial_cmp(&a.value_usd)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    entries.truncate(TOP_ENTRIES_LIMIT);

    AnalyticsSummary {
        vault_value_usd,
        jar_only_value_usd,
        unclaimed_value_usd,
        token_count,
        distance_to_threshold_usd,
        top_entries: entries,
        fetched_at: chrono::Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use pretty_assertions::assert_eq;

    fn row(symbol: &str, value: f64, jar: Option<f64>, unclaimed: Option<f64>) -> DuneRow {
        DuneRow {
            symbol: Some(symbol.to_string()),
            value_usd: Some(value),
            jar_value_usd: jar,
            unclaimed_value_usd: unclaimed,
            distance_to_threshold_usd: None,
        }
    }

    #[test]
    fn summary_totals_and_top_entries() {
        let rows = vec![
            row("WETH", 60_000.0, Some(55_000.0), Some(5_000.0)),
            row("USDC", 30_000.0, Some(30_000.0), None),
            row("UNI", 10_000.0, Some(9_000.0), Some(1_000.0)),
        ];
        let summary = summarize_rows(rows);

        assert_approx_eq!(summary.vault_value_usd, 100_000.0);
        assert_approx_eq!(summary.unclaimed_value_usd, 6_000.0);
        assert_approx_eq!(summary.jar_only_value_usd.unwrap(), 94_000.0);
        assert_eq!(summary.token_count, 3);
        assert_eq!(summary.top_entries[0].symbol, "WETH");
        assert_eq!(summary.top_entries[2].symbol, "UNI");
    }

    #[test]
    fn jar_only_field_is_not_derived_when_absent() {
        let rows = vec![row("WETH", 10.0, None, None)];
        let summary = summarize_rows(rows);
        // Upstream inconsistency is preserved, not papered over.
        assert!(summary.jar_only_value_usd.is_none());
        assert_approx_eq!(summary.vault_value_usd, 10.0);
    }

    #[test]
    fn top_entries_are_length_capped() {
        let rows: Vec<DuneRow> = (0..25)
            .map(|i| row(&format!("T{}", i), i as f64, None, None))
            .collect();
        let summary = summarize_rows(rows);
        assert_eq!(summary.top_entries.len(), TOP_ENTRIES_LIMIT);
        assert_eq!(summary.top_entries[0].symbol, "T24");
    }

    #[test]
    fn unconfigured_source_reports_not_configured() {
        let source = AnalyticsSource::new("", 1, Duration::from_secs(60), 5);
        assert!(!source.is_configured());
    }

    #[tokio::test]
    async fn unconfigured_fetch_returns_none() {
        let source = AnalyticsSource::new("  ", 1, Duration::from_secs(60), 5);
        assert!(source.fetch_summary(false).await.is_none());
        assert!(source.fetch_summary(true).await.is_none());
    }
}
