//! Error taxonomy for the ingestion path.
//!
//! Every failure an ingestion unit can hit is mapped onto one of a handful of
//! categories. The category decides whether the driver retries, skips, or
//! aborts the whole run.

use thiserror::Error;

use crate::repository::StoreError;

/// Result alias used across the ingestion core.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors raised while configuring or running an ingestion.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Missing or invalid proxy credentials, empty pool, bad settings.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// The upstream API (or the proxy in front of it) refused the request.
    #[error("Upstream blocked the request (HTTP {status})")]
    UpstreamBlocked { status: u16 },
    /// Timeouts, connection resets and server-side failures.
    #[error("Transient network error: {0}")]
    TransientNetwork(String),
    /// The response could not be mapped onto the expected fields.
    #[error("Unexpected response shape: {0}")]
    DataShape(String),
    /// Writing rows to the store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Coarse classification used for retry decisions and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCategory {
    Configuration,
    UpstreamBlocked,
    TransientNetwork,
    DataShape,
    Storage,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::UpstreamBlocked => write!(f, "upstream-blocked"),
            ErrorCategory::TransientNetwork => write!(f, "transient-network"),
            ErrorCategory::DataShape => write!(f, "data-shape"),
            ErrorCategory::Storage => write!(f, "storage"),
        }
    }
}

impl IngestError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        IngestError::Configuration(msg.into())
    }

    pub fn data_shape(msg: impl Into<String>) -> Self {
        IngestError::DataShape(msg.into())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            IngestError::Configuration(_) => ErrorCategory::Configuration,
            IngestError::UpstreamBlocked { .. } => ErrorCategory::UpstreamBlocked,
            IngestError::TransientNetwork(_) => ErrorCategory::TransientNetwork,
            IngestError::DataShape(_) => ErrorCategory::DataShape,
            IngestError::Storage(_) => ErrorCategory::Storage,
        }
    }

    /// Whether another attempt (with a freshly selected proxy) may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            IngestError::UpstreamBlocked { .. } | IngestError::TransientNetwork(_)
        )
    }

    /// Whether the error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, IngestError::Configuration(_))
    }

    /// Classify a non-success HTTP status from the stats API.
    pub fn from_status(status: u16) -> Self {
        match status {
            403 | 407 | 429 => IngestError::UpstreamBlocked { status },
            500..=599 => IngestError::TransientNetwork(format!("server returned HTTP {}", status)),
            _ => IngestError::DataShape(format!("unexpected HTTP status {}", status)),
        }
    }
}

impl From<reqwest::Error> for IngestError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return IngestError::from_status(status.as_u16());
        }
        if e.is_decode() {
            return IngestError::DataShape(e.to_string());
        }
        if e.is_builder() {
            return IngestError::Configuration(e.to_string());
        }
        if e.is_connect() {
            if let Some(status) = tunnel_rejection_status(&e) {
                return IngestError::UpstreamBlocked { status };
            }
        }
        // timeouts, connect failures, resets, body read failures
        IngestError::TransientNetwork(e.to_string())
    }
}

/// Status reported for a CONNECT the proxy refused without a usable code.
const TUNNEL_REJECTED_STATUS: u16 = 502;

/// reqwest surfaces a refused proxy CONNECT as a connect error whose source
/// chain carries the tunnel failure text rather than a status.
fn tunnel_rejection_status(e: &(dyn std::error::Error + 'static)) -> Option<u16> {
    let mut source = Some(e);
    while let Some(err) = source {
        if let Some(status) = classify_tunnel_message(&err.to_string()) {
            return Some(status);
        }
        source = err.source();
    }
    None
}

fn classify_tunnel_message(message: &str) -> Option<u16> {
    let message = message.to_ascii_lowercase();
    if message.contains("proxy authentication required")
        || message.contains("proxy authorization required")
    {
        Some(407)
    } else if message.contains("unsuccessful tunnel") || message.contains("tunnel error") {
        Some(TUNNEL_REJECTED_STATUS)
    } else {
        None
    }
}

impl From<crate::rate_limit::RateLimitError> for IngestError {
    fn from(e: crate::rate_limit::RateLimitError) -> Self {
        IngestError::TransientNetwork(format!("rate limiter: {}", e))
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(e: serde_json::Error) -> Self {
        IngestError::DataShape(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(
            IngestError::from_status(403).category(),
            ErrorCategory::UpstreamBlocked
        );
        assert_eq!(
            IngestError::from_status(429).category(),
            ErrorCategory::UpstreamBlocked
        );
        assert_eq!(
            IngestError::from_status(502).category(),
            ErrorCategory::TransientNetwork
        );
        assert_eq!(
            IngestError::from_status(404).category(),
            ErrorCategory::DataShape
        );
    }

    #[derive(Debug)]
    struct Wrapped(&'static str, Option<Box<Wrapped>>);

    impl std::fmt::Display for Wrapped {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.0)
        }
    }

    impl std::error::Error for Wrapped {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            self.1.as_deref().map(|e| e as _)
        }
    }

    #[test]
    fn test_tunnel_rejections_are_blocked() {
        assert_eq!(
            classify_tunnel_message("proxy authentication required"),
            Some(407)
        );
        assert_eq!(
            classify_tunnel_message("tunnel error: proxy authorization required"),
            Some(407)
        );
        assert_eq!(
            classify_tunnel_message("unsuccessful tunnel"),
            Some(TUNNEL_REJECTED_STATUS)
        );
        assert_eq!(classify_tunnel_message("connection refused"), None);
    }

    #[test]
    fn test_tunnel_rejection_found_in_source_chain() {
        let err = Wrapped(
            "error sending request",
            Some(Box::new(Wrapped(
                "client error (Connect)",
                Some(Box::new(Wrapped("unsuccessful tunnel", None))),
            ))),
        );
        assert_eq!(tunnel_rejection_status(&err), Some(TUNNEL_REJECTED_STATUS));

        let refused = Wrapped("tcp connect error", None);
        assert_eq!(tunnel_rejection_status(&refused), None);
    }

    #[test]
    fn test_retryable() {
        assert!(IngestError::UpstreamBlocked { status: 429 }.is_retryable());
        assert!(IngestError::TransientNetwork("reset".into()).is_retryable());
        assert!(!IngestError::data_shape("no rowSet").is_retryable());
        assert!(!IngestError::configuration("no pool").is_retryable());
        assert!(IngestError::configuration("no pool").is_fatal());
    }
}
