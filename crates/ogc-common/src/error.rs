//! Error types for catalogue scanning and endpoint probing.

use thiserror::Error;

use crate::xml::XmlParseError;

/// Result type alias using ScanError.
pub type ScanResult<T> = Result<T, ScanError>;

/// Primary error type for scan operations.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Transport failure, timeout, or a non-2xx response.
    #[error("Fetch failed for {uri}{}: {message}", status_suffix(.status))]
    Fetch {
        uri: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Malformed XML document from {uri}: {message}")]
    MalformedDocument { uri: String, message: String },

    /// An expected element or attribute is absent.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

impl ScanError {
    /// Build a fetch error for a response that came back with a non-2xx status.
    pub fn http_status(uri: impl Into<String>, status: u16, body: &str) -> Self {
        ScanError::Fetch {
            uri: uri.into(),
            status: Some(status),
            message: body.to_string(),
        }
    }

    /// Build a fetch error from a transport-level failure.
    pub fn transport(uri: impl Into<String>, err: &reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("request timed out: {}", err)
        } else {
            err.to_string()
        };
        ScanError::Fetch {
            uri: uri.into(),
            status: err.status().map(|s| s.as_u16()),
            message,
        }
    }

    /// Attach the source URI to an XML parse failure.
    pub fn malformed(uri: impl Into<String>, err: XmlParseError) -> Self {
        ScanError::MalformedDocument {
            uri: uri.into(),
            message: err.to_string(),
        }
    }

    /// HTTP status associated with this error, if the server answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ScanError::Fetch { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ScanError::NotFound(_))
    }
}

impl From<reqwest::Error> for ScanError {
    fn from(err: reqwest::Error) -> Self {
        let uri = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        ScanError::transport(uri, &err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display_includes_status() {
        let err = ScanError::http_status("http://tds/catalog.xml", 404, "missing");
        assert_eq!(
            err.to_string(),
            "Fetch failed for http://tds/catalog.xml (HTTP 404): missing"
        );
        assert_eq!(err.status_code(), Some(404));
    }

    #[test]
    fn test_fetch_error_display_without_status() {
        let err = ScanError::Fetch {
            uri: "http://tds/x".to_string(),
            status: None,
            message: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "Fetch failed for http://tds/x: connection refused");
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn test_not_found_predicate() {
        assert!(ScanError::NotFound("service WMS".into()).is_not_found());
        assert!(!ScanError::Config("x".into()).is_not_found());
    }
}
