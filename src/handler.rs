use std::sync::Arc;

use super::config::RequestConfig;
use super::executor::CallbackExecutor;
use super::request::Request;

/// The queue scheduler a request is submitted to.
///
/// The scheduler executes requests in order and reports their progress back with
/// [`Request::notify_started`] followed by exactly one of [`Request::notify_success`],
/// [`Request::notify_fail`] or [`Request::notify_invalid_request`].
pub trait RequestHandler: Send + Sync {
    /// Submits the request for ordered execution.
    fn enqueue(&self, request: Request);

    /// Called after a request failed with [`crate::Status::TIMEOUT`]. The device
    /// probably stopped responding, so the transport may need to be reset.
    fn on_request_timeout(&self, request: &Request);

    /// The executor callbacks are delivered on, unless a request overrides it.
    fn executor(&self) -> Arc<dyn CallbackExecutor>;

    /// Defaults applied to requests at enqueue time.
    fn config(&self) -> RequestConfig {
        RequestConfig::default()
    }
}
