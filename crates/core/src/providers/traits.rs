use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::api::ApiResponse;

/// One named strategy in the gateway's ordered fallback chain.
///
/// A source claims a fixed set of (module, action) pairs and attempts to
/// answer them by querying an upstream market-data provider directly,
/// bypassing the backend. Any error, including a structurally valid but
/// empty result, must surface as `Err`; the gateway reads that as
/// "not handled" and falls through to the next source, then the backend.
#[async_trait]
pub trait UpstreamSource: Send + Sync {
    /// Name of this source (for logs).
    fn name(&self) -> &str;

    /// Whether this source answers the given (module, action) pair.
    fn handles(&self, module: &str, action: &str) -> bool;

    /// Attempt the request. A returned payload with `success: true` is
    /// written through to the response cache by the gateway.
    async fn fetch(&self, params: &[(&str, &str)]) -> Result<ApiResponse, CoreError>;
}
