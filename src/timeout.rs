use std::sync::Arc;
use std::time::Duration;

use async_lock::Mutex;
use log::{debug, warn};

use super::error::{Error, Status};
use super::executor::{ActionHandle, CallbackExecutor};
use super::request::Request;
use super::types::DeviceId;
use super::Result;

/// Deadline bookkeeping of a timeoutable request.
///
/// The deadline is armed when the request starts and disarmed by whichever terminal
/// notification comes first. Arming happens under the `pending` lock and re-checks
/// that the request has not finished, so a completion racing with the start cannot
/// leave a live timer behind.
pub(crate) struct TimeoutPolicy {
    deadline: Mutex<Option<Duration>>,
    pending: Mutex<Option<(Arc<dyn CallbackExecutor>, ActionHandle)>>,
}

impl TimeoutPolicy {
    pub fn new() -> Self {
        Self {
            deadline: Mutex::new(None),
            pending: Mutex::new(None),
        }
    }

    /// Zero means no deadline.
    pub fn deadline(&self) -> Duration {
        self.deadline.lock_blocking().unwrap_or(Duration::ZERO)
    }

    pub fn set_deadline(&self, timeout: Duration) {
        self.deadline.lock_blocking().replace(timeout);
    }

    /// Uses `timeout` unless a deadline was set explicitly.
    pub fn apply_default(&self, timeout: Duration) {
        self.deadline.lock_blocking().get_or_insert(timeout);
    }

    pub fn arm(&self, request: &Request, device: &DeviceId) {
        let deadline = self.deadline();
        if deadline.is_zero() {
            return;
        }
        let Some(executor) = request.executor() else {
            warn!("{request} has no callback executor, its timeout is ignored");
            return;
        };
        let mut pending = self.pending.lock_blocking();
        if request.is_finished() {
            return;
        }
        let weak = request.downgrade();
        let device = device.clone();
        let handle = executor.post_delayed(
            Box::new(move || {
                if let Some(request) = Request::upgrade(&weak) {
                    request.on_timeout(&device);
                }
            }),
            deadline,
        );
        *pending = Some((executor, handle));
    }

    pub fn cancel(&self) {
        let taken = self.pending.lock_blocking().take();
        if let Some((executor, handle)) = taken {
            executor.cancel(handle);
        }
    }

    fn disarmed(&self) {
        self.pending.lock_blocking().take();
    }
}

impl Request {
    /// Sets the time after which the request fails with [`Status::TIMEOUT`] if it has
    /// not completed. The deadline starts when the request starts executing; zero
    /// means no deadline. If never set, the request handler's default is used.
    ///
    /// Only requests that wait for a response accept a timeout, see
    /// [`RequestKind::is_timeoutable`](crate::RequestKind::is_timeoutable).
    pub fn timeout(&self, timeout: Duration) -> Result<&Self> {
        let policy = self.inner.timeout.as_ref().ok_or_else(|| {
            Error::violation(self, format!("{} requests cannot time out", self.kind()))
        })?;
        self.ensure_created("timeout")?;
        policy.set_deadline(timeout);
        Ok(self)
    }

    /// The current deadline; zero if none is set.
    pub fn timeout_duration(&self) -> Duration {
        self.inner
            .timeout
            .as_ref()
            .map(TimeoutPolicy::deadline)
            .unwrap_or(Duration::ZERO)
    }

    pub(crate) fn cancel_timeout(&self) {
        if let Some(policy) = &self.inner.timeout {
            policy.cancel();
        }
    }

    fn on_timeout(&self, device: &DeviceId) {
        if let Some(policy) = &self.inner.timeout {
            policy.disarmed();
        }
        if !self.notify_fail(device, Status::TIMEOUT) {
            debug!("{self} finished before its timeout fired");
            return;
        }
        warn!("{self} timed out after {:?}", self.timeout_duration());
        if let Some(handler) = self.request_handler() {
            handler.on_request_timeout(self);
        }
    }
}
