use thiserror::Error;

/// Errors produced by a single scrape cycle.
///
/// A scrape is all-or-nothing: any of these aborts the cycle and no partial
/// server info is returned. The exporter never retries on its own; the next
/// Prometheus pull starts a fresh scrape.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Network or timeout failure while talking to the server.
    #[error("connection error: {0}")]
    Connection(#[from] reqwest::Error),
    /// Server rejected the configured credentials (HTTP 401).
    #[error("wrong credentials")]
    NotAuthorized,
    /// Server throttled the request (HTTP 429).
    #[error("too many requests")]
    RateLimited,
    /// Server answered 503 without the maintenance marker header.
    #[error("service unavailable")]
    Unavailable,
    /// Server answered 503 and flagged itself as in maintenance mode.
    #[error("maintenance mode")]
    MaintenanceMode,
    /// Any other non-200 response.
    #[error("unexpected status code: {0}")]
    UnexpectedStatus(u16),
    /// Malformed or truncated payload.
    #[error("can not parse server info: {0}")]
    Decode(String),
    /// A field was present but carried an unusable value, e.g. a negative
    /// database size or a size string that is not a number.
    #[error("invalid field value: {0}")]
    FieldType(String),
}

impl ScrapeError {
    /// Label value for the scrape error counter. Auth failures are surfaced
    /// separately so they can be alerted on; everything else is "other".
    pub fn cause_label(&self) -> &'static str {
        match self {
            ScrapeError::NotAuthorized => "auth",
            _ => "other",
        }
    }
}
