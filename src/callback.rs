//! Callback slots of a request.

use std::sync::Arc;

use super::error::Status;
use super::types::{DeviceId, Response};

/// Called when the request starts executing.
pub type BeforeCallback = Arc<dyn Fn(&DeviceId) + Send + Sync>;
/// Called when the request completes successfully.
pub type SuccessCallback = Arc<dyn Fn(&DeviceId) + Send + Sync>;
/// Called when the request fails.
pub type FailCallback = Arc<dyn Fn(&DeviceId, Status) + Send + Sync>;
/// Called when the request could not be associated with a device.
pub type InvalidRequestCallback = Arc<dyn Fn() + Send + Sync>;
/// Called for each value the request produces.
pub type ValueCallback = Arc<dyn Fn(&DeviceId, &Response) + Send + Sync>;

/// User-facing callbacks, posted to the executor, plus internal callbacks used
/// for chaining requests, which run synchronously on the notifying thread.
#[derive(Clone, Default)]
pub(crate) struct CallbackSet {
    pub before: Option<BeforeCallback>,
    pub success: Option<SuccessCallback>,
    pub fail: Option<FailCallback>,
    pub invalid: Option<InvalidRequestCallback>,
    pub value: Option<ValueCallback>,
    pub internal_before: Option<BeforeCallback>,
    pub internal_success: Option<SuccessCallback>,
    pub internal_fail: Option<FailCallback>,
}

/// The user callbacks replaced while a request is awaited synchronously.
pub(crate) struct TerminalCallbacks {
    pub success: Option<SuccessCallback>,
    pub fail: Option<FailCallback>,
    pub invalid: Option<InvalidRequestCallback>,
    pub value: Option<ValueCallback>,
}

impl CallbackSet {
    pub fn replace_terminal(&mut self, with: TerminalCallbacks) -> TerminalCallbacks {
        TerminalCallbacks {
            success: std::mem::replace(&mut self.success, with.success),
            fail: std::mem::replace(&mut self.fail, with.fail),
            invalid: std::mem::replace(&mut self.invalid, with.invalid),
            value: std::mem::replace(&mut self.value, with.value),
        }
    }
}

impl std::fmt::Debug for CallbackSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackSet")
            .field("before", &self.before.is_some())
            .field("success", &self.success.is_some())
            .field("fail", &self.fail.is_some())
            .field("invalid", &self.invalid.is_some())
            .field("value", &self.value.is_some())
            .finish_non_exhaustive()
    }
}
