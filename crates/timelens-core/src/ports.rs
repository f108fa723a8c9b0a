//! Ports implemented by the runtime layer.

use async_trait::async_trait;

/// Single-shot liveness checking against the backend's HTTP surface.
///
/// # Design
///
/// - **Object-safe**: used as `Arc<dyn HealthProbe>` so supervisor tests
///   can substitute deterministic probes.
/// - **Never errors**: any network failure, refusal, or timeout is simply
///   "not healthy". Polling loops just retry on `false`.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// One bounded-timeout check of `GET /health` on the given port.
    async fn check(&self, port: u16) -> bool;

    /// Ask an externally-owned backend to terminate via
    /// `POST /api/shutdown`. Returns whether the request was acknowledged
    /// with HTTP 200; an unacknowledged request does not block the local
    /// shutdown decision.
    async fn request_shutdown(&self, port: u16) -> bool;
}
