//! HTTP health probing for the analysis backend.
//!
//! One bounded request per call; every transport failure means "not
//! healthy". This keeps the polling loops trivial - callers just retry on
//! `false`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use timelens_core::HealthProbe;

/// Timeout for a single probe request.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// reqwest-backed [`HealthProbe`] against `127.0.0.1:<port>`.
#[derive(Debug, Clone)]
pub struct HttpHealthProbe {
    client: Client,
}

impl HttpHealthProbe {
    /// Create a probe with the standard 2 s request timeout.
    #[must_use]
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for HttpHealthProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn check(&self, port: u16) -> bool {
        let url = format!("http://127.0.0.1:{port}/health");
        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                debug!(port, status = %response.status(), "health check returned non-200");
                false
            }
            Err(e) => {
                debug!(port, error = %e, "health check failed");
                false
            }
        }
    }

    async fn request_shutdown(&self, port: u16) -> bool {
        let url = format!("http://127.0.0.1:{port}/api/shutdown");
        match self.client.post(&url).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                debug!(port, status = %response.status(), "shutdown request returned non-200");
                false
            }
            Err(e) => {
                debug!(port, error = %e, "shutdown request failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a random local port.
    async fn one_shot_server(response: &'static str) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        port
    }

    #[tokio::test]
    async fn check_accepts_http_200() {
        let port =
            one_shot_server("HTTP/1.1 200 OK\r\ncontent-length: 2\r\n\r\n{}").await;
        assert!(HttpHealthProbe::new().check(port).await);
    }

    #[tokio::test]
    async fn check_rejects_non_200() {
        let port = one_shot_server(
            "HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\n\r\n",
        )
        .await;
        assert!(!HttpHealthProbe::new().check(port).await);
    }

    #[tokio::test]
    async fn check_treats_connection_refused_as_unhealthy() {
        // Bind and immediately drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        assert!(!HttpHealthProbe::new().check(port).await);
    }

    #[tokio::test]
    async fn shutdown_request_reports_acknowledgment() {
        let port = one_shot_server(
            "HTTP/1.1 200 OK\r\ncontent-length: 26\r\n\r\n{\"status\":\"shutting_down\"}",
        )
        .await;
        assert!(HttpHealthProbe::new().request_shutdown(port).await);
    }
}
