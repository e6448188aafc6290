//! HEAD-based reachability checks for candidate media URLs

use crate::error::Result;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Default timeout for a reachability check
pub const DEFAULT_CHECK_TIMEOUT_SECS: u64 = 10;

/// Issues a HEAD request against a URL and reports whether it answered with
/// a success status
///
/// Any other outcome, network errors included, counts as unreachable and is
/// never surfaced as an error.
#[derive(Debug, Clone)]
pub struct LinkChecker {
    client: Client,
    timeout: Duration,
}

impl LinkChecker {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_CHECK_TIMEOUT_SECS))
            .build()?;
        Ok(Self::with_client(client))
    }

    /// Shares an existing connection pool
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            timeout: Duration::from_secs(DEFAULT_CHECK_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn is_reachable(&self, url: &str) -> bool {
        match self.client.head(url).timeout(self.timeout).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(status = %response.status(), "Stream reachable");
                true
            }
            Ok(response) => {
                warn!(status = %response.status(), "Stream not reachable");
                false
            }
            Err(e) => {
                warn!("Reachability check failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_success_and_failure_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let checker = LinkChecker::new().unwrap();
        assert!(checker.is_reachable(&format!("{}/ok", server.uri())).await);
        assert!(!checker.is_reachable(&format!("{}/gone", server.uri())).await);
    }

    #[tokio::test]
    async fn test_network_error_is_unreachable() {
        let checker = LinkChecker::new()
            .unwrap()
            .with_timeout(Duration::from_millis(500));
        assert!(!checker.is_reachable("http://127.0.0.1:9/nothing").await);
        assert!(!checker.is_reachable("not a url").await);
    }
}
