//! Error taxonomy for the recovery pipeline

use thiserror::Error;

/// Terminal failure of a single recovery operation.
///
/// Every variant aborts the current operation and none is retried
/// automatically; the trigger re-enables afterwards so the operator can
/// fire again. Parse failures of nested script strings are deliberately
/// absent here — those are the expected leaf case and are swallowed by the
/// recovery engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Non-success HTTP status from the raw-document endpoint.
    #[error("HTTP {status} fetching raw document")]
    Http { status: u16 },

    /// Transport-level failure reaching the host.
    #[error("network error: {0}")]
    Network(String),

    /// The returned page has no `<pre>` content container.
    #[error("no content container found")]
    NoContentContainer,

    /// The outermost document is not valid JSON.
    #[error("JSON parse failed: {0}")]
    Parse(#[from] serde_json::Error),

    /// The current page does not match the expected script page pattern.
    #[error("navigation precondition failed: {0}")]
    Precondition(String),

    /// Both the in-page probe and the injection fallback came up empty.
    #[error("content extraction failed: probe and injection both returned nothing")]
    Extraction,

    /// The network fetch exceeded its timeout.
    #[error("timed out fetching raw document")]
    Timeout,

    /// Another operation is already in flight; the page handle is shared.
    #[error("an operation is already in flight")]
    Busy,

    /// The HTTP client could not be built from the pipeline configuration.
    #[error("invalid pipeline configuration: {0}")]
    Config(String),
}
