/// Centralized argument handling for jarwatch
///
/// Consolidates command-line argument parsing and debug flag checking so that
/// every module gates its diagnostic output the same way.
use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

/// Global command-line arguments storage
/// Thread-safe singleton that stores arguments for access throughout the application
pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

/// Sets the global command-line arguments
/// Used by tests to override the default env::args() collection
pub fn set_cmd_args(args: Vec<String>) {
    if let Ok(mut cmd_args) = CMD_ARGS.lock() {
        *cmd_args = args;
    }
}

/// Gets a copy of the current command-line arguments
pub fn get_cmd_args() -> Vec<String> {
    match CMD_ARGS.lock() {
        Ok(args) => args.clone(),
        Err(_) => env::args().collect(),
    }
}

/// Checks if a specific argument is present in the command line
pub fn has_arg(arg: &str) -> bool {
    get_cmd_args().iter().any(|a| a == arg)
}

/// Gets the value of a command-line argument that follows a flag
/// Returns None if the flag is not found or has no value
pub fn get_arg_value(flag: &str) -> Option<String> {
    let args = get_cmd_args();
    for (i, arg) in args.iter().enumerate() {
        if arg == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

// =============================================================================
// DEBUG FLAG CHECKING FUNCTIONS
// =============================================================================

/// API calls debug mode (balance/price/analytics providers)
pub fn is_debug_api_enabled() -> bool {
    has_arg("--debug-api")
}

/// Jar aggregation and refresh coordination debug mode
pub fn is_debug_jar_enabled() -> bool {
    has_arg("--debug-jar")
}

/// Webserver debug mode
pub fn is_debug_webserver_enabled() -> bool {
    has_arg("--debug-webserver")
}

/// Cache store debug mode
pub fn is_debug_cache_enabled() -> bool {
    has_arg("--debug-cache")
}

// =============================================================================
// SPECIAL MODES
// =============================================================================

/// Help requested via --help or -h
pub fn is_help_requested() -> bool {
    has_arg("--help") || has_arg("-h")
}

/// One-shot mode: compute a snapshot, print JSON, exit
pub fn is_snapshot_mode_enabled() -> bool {
    has_arg("--snapshot")
}

/// Print usage information
pub fn print_help() {
    println!("jarwatch - fee jar burn profitability watcher");
    println!();
    println!("USAGE:");
    println!("    jarwatch [FLAGS]");
    println!();
    println!("FLAGS:");
    println!("    --config <path>       Config file path (default: jarwatch.json)");
    println!("    --snapshot            Compute one snapshot, print JSON and exit");
    println!("    --debug-api           Log provider request/response details");
    println!("    --debug-jar           Log aggregation and refresh coordination");
    println!("    --debug-cache         Log cache hits/misses/staleness");
    println!("    --debug-webserver     Log webserver request handling");
    println!("    --help, -h            Show this help");
}
