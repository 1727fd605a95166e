use std::sync::Arc;
use std::time::Duration;

use jarwatch::{
    arguments::{
        get_arg_value, is_help_requested, is_snapshot_mode_enabled, print_help, set_cmd_args,
    },
    config::{Config, DEFAULT_CONFIG_PATH},
    jar::{
        aggregator::Aggregator,
        calculator::CalculatorParams,
        service::SnapshotService,
    },
    logger::{self, LogTag},
    sources::{
        alchemy::AlchemyClient, balances::BalanceSource, coingecko::CoinGeckoClient,
        defillama::DefiLlamaClient, dune::AnalyticsSource, prices::PriceSource,
    },
    webserver::{self, state::AppState},
};

/// Main entry point for jarwatch
///
/// Headless service: loads the config, wires the sources into the snapshot
/// pipeline and serves the API until shutdown. `--snapshot` instead runs the
/// pipeline once, prints the snapshot as JSON and exits.
#[tokio::main]
async fn main() {
    set_cmd_args(std::env::args().collect());
    logger::init();

    if is_help_requested() {
        print_help();
        std::process::exit(0);
    }

    logger::info(LogTag::System, "jarwatch starting up...");

    // =========================================================================
    // CONFIGURATION
    // =========================================================================

    let config_path =
        get_arg_value("--config").unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            logger::error(
                LogTag::System,
                &format!("Failed to load config from {}: {:#}", config_path, e),
            );
            std::process::exit(1);
        }
    };

    if !config.has_alchemy_key() {
        logger::warning(
            LogTag::System,
            "No Alchemy API key configured; balances come from the registry fallback only",
        );
    }
    if !config.has_dune_key() {
        logger::info(
            LogTag::System,
            "No Dune API key configured; analytics overlay disabled",
        );
    }

    // =========================================================================
    // PIPELINE WIRING
    // =========================================================================

    let alchemy = AlchemyClient::new(&config.alchemy_api_key, config.request_timeout_secs);
    let balances = BalanceSource::new(
        alchemy,
        &config.rpc_url,
        &config.jar_address,
        Duration::from_secs(config.cache.balances_ttl_secs),
        config.request_timeout_secs,
    );
    let prices = PriceSource::new(
        DefiLlamaClient::new(config.request_timeout_secs),
        CoinGeckoClient::new(config.request_timeout_secs),
        Duration::from_secs(config.cache.prices_ttl_secs),
    );
    let analytics = Arc::new(AnalyticsSource::new(
        &config.dune_api_key,
        config.dune_query_id,
        Duration::from_secs(config.cache.analytics_ttl_secs),
        config.request_timeout_secs,
    ));

    let params = CalculatorParams {
        burn_threshold_units: config.burn.threshold_units,
        gas_estimate_usd: config.burn.gas_estimate_usd,
        display_floor_usd: config.burn.display_floor_usd,
    };

    let aggregator = Arc::new(Aggregator::new(
        balances,
        prices,
        Arc::clone(&analytics),
        params,
    ));
    let snapshots = Arc::new(SnapshotService::new(
        aggregator,
        Duration::from_secs(config.cache.snapshot_ttl_secs),
    ));

    // =========================================================================
    // SPECIAL MODES (execute and exit)
    // =========================================================================

    if is_snapshot_mode_enabled() {
        match snapshots.get_snapshot(false).await {
            Ok(served) => match serde_json::to_string_pretty(&served.snapshot) {
                Ok(json) => {
                    println!("{}", json);
                    std::process::exit(0);
                }
                Err(e) => {
                    logger::error(
                        LogTag::System,
                        &format!("Failed to serialize snapshot: {}", e),
                    );
                    std::process::exit(1);
                }
            },
            Err(e) => {
                logger::error(LogTag::System, &format!("Snapshot failed: {}", e));
                std::process::exit(1);
            }
        }
    }

    // =========================================================================
    // HEADLESS SERVICE
    // =========================================================================

    if let Err(e) = ctrlc::set_handler(|| {
        println!();
        webserver::shutdown();
    }) {
        logger::error(
            LogTag::System,
            &format!("Failed to install Ctrl+C handler: {}", e),
        );
        std::process::exit(1);
    }

    let state = Arc::new(AppState::new(
        config.webserver.clone(),
        snapshots,
        analytics,
    ));

    if let Err(e) = webserver::start_server(state).await {
        logger::error(LogTag::System, &format!("Webserver failed: {}", e));
        std::process::exit(1);
    }

    logger::info(LogTag::System, "jarwatch stopped");
}
