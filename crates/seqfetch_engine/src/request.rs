use std::future::Future;

use serde_json::Value;
use seqfetch_core::{Generation, RequestError};
use tokio_util::sync::CancellationToken;

/// One invocation of a request function.
#[derive(Debug, Clone)]
pub struct RequestCall {
    pub params: Value,
    pub generation: Generation,
    /// Cancelled once this call is superseded or cancelled.
    ///
    /// Observing it is optional: a stale result is discarded either way, the
    /// token only lets the transport stop early.
    pub cancel: CancellationToken,
}

/// The async request function a sequencer drives.
#[async_trait::async_trait]
pub trait Requester: Send + Sync {
    async fn request(&self, call: RequestCall) -> Result<Value, RequestError>;
}

#[async_trait::async_trait]
impl<F, Fut> Requester for F
where
    F: Fn(RequestCall) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, RequestError>> + Send + 'static,
{
    async fn request(&self, call: RequestCall) -> Result<Value, RequestError> {
        (self)(call).await
    }
}

/// Wraps an async closure as a [`Requester`], pinning down its types.
///
/// ```
/// use seqfetch_engine::{request_fn, RequestCall};
///
/// let backend = request_fn(|call: RequestCall| async move {
///     Ok(serde_json::json!({ "data": call.params }))
/// });
/// # let _ = backend;
/// ```
pub fn request_fn<F, Fut>(f: F) -> F
where
    F: Fn(RequestCall) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, RequestError>> + Send + 'static,
{
    f
}
