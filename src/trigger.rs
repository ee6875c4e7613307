use std::sync::Arc;

use async_lock::Mutex;
use log::debug;

use super::error::{Error, Status};
use super::request::{Request, RequestState};
use super::types::DeviceId;
use super::util::BoolExt;
use super::Result;

/// Progress of the trigger of an awaiting request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerStatus {
    NotStarted,
    Started,
    Succeeded,
    Failed(Status),
}

/// The trigger link of an awaiting request.
pub(crate) struct TriggerPolicy {
    link: Mutex<Option<(Request, TriggerStatus)>>,
}

impl TriggerPolicy {
    pub fn new() -> Self {
        Self {
            link: Mutex::new(None),
        }
    }

    fn get(&self) -> Option<(Request, TriggerStatus)> {
        self.link.lock_blocking().clone()
    }

    /// Moves the trigger status forward; an outcome is never replaced.
    fn set_status(&self, status: TriggerStatus) {
        if let Some((_, cur)) = self.link.lock_blocking().as_mut() {
            if status.rank() > cur.rank() {
                *cur = status;
            }
        }
    }
}

impl TriggerStatus {
    fn rank(self) -> u8 {
        match self {
            TriggerStatus::NotStarted => 0,
            TriggerStatus::Started => 1,
            TriggerStatus::Succeeded | TriggerStatus::Failed(_) => 2,
        }
    }
}

impl Request {
    /// Sets the request whose execution should cause the awaited event, for example
    /// a write that makes the remote device send a notification.
    ///
    /// The trigger is executed by the scheduler right after this request starts waiting,
    /// and must not be enqueued separately. If it fails, this request fails with the
    /// same status.
    pub fn trigger(&self, trigger: &Request) -> Result<&Self> {
        let policy = self.inner.trigger.as_ref().ok_or_else(|| {
            Error::violation(self, format!("{} requests cannot have a trigger", self.kind()))
        })?;
        (trigger != self).or_violation(self, "a request cannot trigger itself")?;
        self.ensure_created("trigger")?;

        // holding the lock keeps the trigger from being enqueued meanwhile
        let mut callbacks = trigger.inner.callbacks.lock_blocking();
        (trigger.state() == RequestState::Created)
            .or_violation(trigger, "trigger request already enqueued")?;
        policy
            .link
            .lock_blocking()
            .replace((trigger.clone(), TriggerStatus::NotStarted));

        let weak = self.downgrade();
        callbacks.internal_before = Some(Arc::new(move |_: &DeviceId| {
            if let Some(outer) = Request::upgrade(&weak) {
                outer.set_trigger_status(TriggerStatus::Started);
            }
        }));
        let weak = self.downgrade();
        callbacks.internal_success = Some(Arc::new(move |_: &DeviceId| {
            if let Some(outer) = Request::upgrade(&weak) {
                outer.set_trigger_status(TriggerStatus::Succeeded);
            }
        }));
        let weak = self.downgrade();
        callbacks.internal_fail = Some(Arc::new(move |device: &DeviceId, status: Status| {
            let Some(outer) = Request::upgrade(&weak) else {
                return;
            };
            debug!("trigger of {outer} failed: {status}");
            outer.set_trigger_status(TriggerStatus::Failed(status));
            outer.inner.gate.open(status);
            outer.notify_fail(device, status);
        }));
        Ok(self)
    }

    fn set_trigger_status(&self, status: TriggerStatus) {
        if let Some(policy) = &self.inner.trigger {
            policy.set_status(status);
        }
    }

    pub(crate) fn trigger_link(&self) -> Option<(Request, TriggerStatus)> {
        self.inner.trigger.as_ref().and_then(TriggerPolicy::get)
    }

    /// The request set with [`Request::trigger`].
    pub fn trigger_request(&self) -> Option<Request> {
        self.trigger_link().map(|(trigger, _)| trigger)
    }

    pub fn trigger_status(&self) -> Option<TriggerStatus> {
        self.trigger_link().map(|(_, status)| status)
    }

    /// Checks if a trigger is set and has not started yet. The scheduler uses this to
    /// know it should run the trigger next.
    pub fn is_trigger_pending(&self) -> bool {
        self.trigger_status() == Some(TriggerStatus::NotStarted)
    }

    /// Checks if there is no trigger or the trigger is not currently running.
    pub fn is_trigger_complete_or_null(&self) -> bool {
        self.trigger_status() != Some(TriggerStatus::Started)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ManualExecutor;
    use crate::{CharacteristicRef, ErrorKind};
    use uuid::Uuid;

    fn target() -> CharacteristicRef {
        CharacteristicRef::new(Uuid::from_u128(1), Uuid::from_u128(2))
    }

    #[test]
    fn trigger_progress_is_tracked() {
        let exec = Arc::new(ManualExecutor::new());
        let wait = Request::wait_for_notification(target());
        let write = Request::write(target(), vec![0x01], Default::default());
        write.set_executor(exec.clone()).unwrap();
        wait.set_executor(exec).unwrap();
        wait.trigger(&write).unwrap();

        assert!(wait.is_trigger_pending());
        assert!(wait.is_trigger_complete_or_null());
        let dev = DeviceId::from("dev");
        write.notify_started(&dev);
        assert_eq!(wait.trigger_status(), Some(TriggerStatus::Started));
        assert!(!wait.is_trigger_complete_or_null());
        write.notify_success(&dev);
        assert_eq!(wait.trigger_status(), Some(TriggerStatus::Succeeded));
        assert!(!wait.is_finished());
    }

    #[test]
    fn failing_trigger_fails_the_awaiting_request() {
        let exec = Arc::new(ManualExecutor::new());
        let wait = Request::wait_for_indication(target());
        let write = Request::write(target(), vec![0x01], Default::default());
        write.set_executor(exec.clone()).unwrap();
        wait.set_executor(exec).unwrap();
        wait.trigger(&write).unwrap();

        let dev = DeviceId::from("dev");
        wait.notify_started(&dev);
        write.notify_started(&dev);
        write.notify_fail(&dev, Status::GATT_WRITE_NOT_PERMITTED);
        assert!(wait.is_finished());
        assert_eq!(
            wait.trigger_status(),
            Some(TriggerStatus::Failed(Status::GATT_WRITE_NOT_PERMITTED))
        );
    }

    #[test]
    fn trigger_outcome_is_never_replaced() {
        let wait = Request::wait_for_notification(target());
        let write = Request::write(target(), vec![0x01], Default::default());
        wait.trigger(&write).unwrap();

        let failed = TriggerStatus::Failed(Status::GATT_WRITE_NOT_PERMITTED);
        wait.set_trigger_status(failed);
        wait.set_trigger_status(TriggerStatus::Started);
        assert_eq!(wait.trigger_status(), Some(failed));
        wait.set_trigger_status(TriggerStatus::Succeeded);
        assert_eq!(wait.trigger_status(), Some(failed));
        assert!(wait.is_trigger_complete_or_null());
    }

    #[test]
    fn trigger_preconditions() {
        let wait = Request::wait_for_write(target());
        let err = wait.trigger(&wait).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionViolation);

        let read = Request::read(target());
        let err = read.trigger(&Request::read_rssi()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionViolation);
        assert_eq!(read.trigger_status(), None);
        assert!(read.is_trigger_complete_or_null());
        assert!(!read.is_trigger_pending());
    }
}
