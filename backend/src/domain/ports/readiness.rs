//! Port for dependencies that gate the readiness endpoint.

use async_trait::async_trait;

/// A dependency the service needs before it can take traffic.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReadinessCheck: Send + Sync {
    /// Name reported when the check fails.
    fn name(&self) -> &'static str;

    async fn is_ready(&self) -> bool;
}
