/// Structured error types for jarwatch
///
/// Source-boundary failures are absorbed where they occur and converted into
/// fallbacks or absent fields; only `JarError` ever reaches a caller, and only
/// when there is no cached value left to serve.
use thiserror::Error;

/// Failure of a single external data source
///
/// These never propagate past the owning source module: a balance failure
/// falls through to the registry path, a price failure to the single-asset
/// endpoint, an analytics failure to `None`.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// Source not configured (missing credential) - a supported state, not a defect
    #[error("{0} is not configured")]
    Unavailable(&'static str),

    /// Network-level failure (connect, DNS, TLS)
    #[error("request to {endpoint} failed: {message}")]
    Network { endpoint: String, message: String },

    /// Request exceeded its deadline
    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },

    /// Non-success HTTP status
    #[error("HTTP {status} from {endpoint}")]
    Status { endpoint: String, status: u16 },

    /// Response body did not match the expected schema
    #[error("failed to parse {what} response: {message}")]
    Parse { what: &'static str, message: String },

    /// Source reachable but returned nothing usable
    #[error("{0} returned no data")]
    NoData(&'static str),
}

/// Top-level failure surfaced to the inbound contract
#[derive(Debug, Clone, Error)]
pub enum JarError {
    /// All sources failed and no cached snapshot exists to fall back to
    #[error("no snapshot available: {0}")]
    NoSnapshot(String),

    /// Invariant violation in the pure calculator - indicates a defect,
    /// should be unreachable with valid inputs
    #[error("computation error: {0}")]
    Computation(String),
}
