use std::sync::Arc;

use async_lock::Mutex;
use log::debug;

use super::async_util::RequestCallback;
use super::callback::TerminalCallbacks;
use super::error::{Error, ErrorKind, Status};
use super::request::{Request, RequestState};
use super::trigger::TriggerStatus;
use super::types::{DeviceId, Response, ResponseSlot};
use super::util::{defer, BoolExt};
use super::Result;

impl Request {
    /// Enqueues the request and blocks the calling thread until it finishes.
    ///
    /// See [`Request::await_with`].
    pub fn await_done(&self) -> Result<()> {
        self.await_with(())
    }

    /// Enqueues the request and blocks the calling thread until it finishes, collecting
    /// the values it produces into `response`.
    ///
    /// While waiting, the success, fail, invalid and value callbacks set on the request
    /// are not called; they are restored before this returns.
    ///
    /// Must not be called on the thread of the callback executor, which would deadlock.
    /// If this request has a [trigger](Request::trigger) that fails, the error is a
    /// [`ErrorKind::TriggerFailure`] blaming the trigger.
    pub fn await_with<R: ResponseSlot>(&self, response: R) -> Result<R> {
        let executor = self
            .executor()
            .ok_or_else(|| Error::violation(self, "no request handler set"))?;
        (!executor.is_current_thread()).or_violation(
            self,
            "cannot await a request on the thread its callbacks are delivered on",
        )?;
        if let Some(trigger) = self.trigger_request() {
            (!trigger.is_enqueued()).or_violation(&trigger, "trigger request already enqueued")?;
        }
        (self.state() == RequestState::Created).or_violation(self, "request already enqueued")?;

        let slot = Arc::new(Mutex::new(Some(response)));
        let bridge = RequestCallback::arm(&self.inner.gate);
        let (on_success, on_fail, on_invalid) = (bridge.clone(), bridge.clone(), bridge.clone());
        let slot_filler = slot.clone();
        let saved = self
            .inner
            .callbacks
            .lock_blocking()
            .replace_terminal(TerminalCallbacks {
                success: Some(Arc::new(move |_: &DeviceId| on_success.on_success())),
                fail: Some(Arc::new(move |_: &DeviceId, status: Status| {
                    on_fail.on_fail(status)
                })),
                invalid: Some(Arc::new(move || on_invalid.on_invalid())),
                value: Some(Arc::new(move |device: &DeviceId, val: &Response| {
                    if let Some(slot) = slot_filler.lock_blocking().as_mut() {
                        slot.on_response(device, val);
                    }
                })),
            });
        let inner = &self.inner;
        let _restore = defer(move || {
            inner.callbacks.lock_blocking().replace_terminal(saved);
        });

        self.enqueue()?;
        let timeout = self.timeout_duration();
        debug!("awaiting {self}");
        match bridge.wait((!timeout.is_zero()).then_some(timeout)) {
            None => Err(Error::new(
                ErrorKind::Timeout,
                Some(self),
                format!("no result within {timeout:?}"),
            )),
            Some(status) if status.is_success() => slot
                .lock_blocking()
                .take()
                .ok_or_else(|| Error::violation(self, "response already taken")),
            Some(status) => Err(self.failure(status)),
        }
    }

    fn failure(&self, status: Status) -> Error {
        if let Some((trigger, TriggerStatus::Failed(trigger_status))) = self.trigger_link() {
            return Error::new(ErrorKind::TriggerFailure(trigger_status), Some(&trigger), "");
        }
        Error::new(ErrorKind::from(status), Some(self), "")
    }
}
