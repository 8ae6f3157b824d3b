//! Thin HTTP GET wrapper shared by the catalogue walker and the probes.

use std::borrow::Cow;
use std::time::Duration;

use bytes::Bytes;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::error::{ScanError, ScanResult};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest body excerpt written to log lines.
pub const LOG_BODY_LIMIT: usize = 1024;

/// Body and status of a completed GET, whatever the status was.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub uri: String,
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Body with line breaks removed, for single-line diagnostics.
    pub fn stripped_body(&self) -> String {
        strip_newlines(&self.text())
    }
}

/// Remove carriage returns and newlines.
pub fn strip_newlines(text: &str) -> String {
    text.chars().filter(|c| *c != '\r' && *c != '\n').collect()
}

/// Cut `text` to at most `limit` characters, marking the cut.
pub fn truncate(text: &str, limit: usize) -> Cow<'_, str> {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => Cow::Owned(format!("{}...", &text[..idx])),
        None => Cow::Borrowed(text),
    }
}

/// Read-only HTTP client with a bounded per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> ScanResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()
            .map_err(|e| ScanError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// GET `uri` and return the response whatever its status.
    ///
    /// Only transport failures (including timeouts) are errors here.
    #[instrument(skip(self), level = "debug")]
    pub async fn get(&self, uri: &str) -> ScanResult<HttpResponse> {
        let response = self
            .client
            .get(uri)
            .send()
            .await
            .map_err(|e| ScanError::transport(uri, &e))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| ScanError::transport(uri, &e))?;

        debug!(status, bytes = body.len(), "GET complete");

        Ok(HttpResponse {
            uri: uri.to_string(),
            status,
            body,
        })
    }

    /// GET `uri`, treating any non-2xx status as a fetch error.
    pub async fn get_ok(&self, uri: &str) -> ScanResult<HttpResponse> {
        let response = self.get(uri).await?;
        if !response.is_success() {
            return Err(ScanError::http_status(
                uri,
                response.status,
                &truncate(&response.stripped_body(), LOG_BODY_LIMIT),
            ));
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            uri: "http://h/x".to_string(),
            status,
            body: Bytes::from(body.to_string()),
        }
    }

    #[test]
    fn test_success_range() {
        assert!(response(200, "").is_success());
        assert!(response(204, "").is_success());
        assert!(!response(302, "").is_success());
        assert!(!response(404, "").is_success());
        assert!(!response(500, "").is_success());
    }

    #[test]
    fn test_stripped_body_removes_line_breaks() {
        let r = response(500, "<error>\r\n  boom\n</error>");
        assert_eq!(r.stripped_body(), "<error>  boom</error>");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("abc", 3), "abc");
        assert_eq!(truncate("ééé", 1), "é...");
    }
}
