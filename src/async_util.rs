use std::sync::Arc;
use std::time::Duration;

use async_channel::{Receiver, Sender};
use async_lock::Mutex;
use futures_lite::future::{self, FutureExt};
use futures_timer::Delay;

use super::error::Status;

/// Binary gate a synchronous caller blocks on until the request terminates.
///
/// The gate starts open. [`SyncGate::close`] arms it for one wait; the first
/// [`SyncGate::open`] afterwards records the terminal status and releases the waiter,
/// later calls are ignored.
pub(crate) struct SyncGate {
    inner: Mutex<GateState>,
}

enum GateState {
    Open(Option<Status>),
    Closed {
        sender: Sender<Status>,
        receiver: Receiver<Status>,
    },
}

impl SyncGate {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(GateState::Open(None)),
        }
    }

    pub fn close(&self) {
        let (sender, receiver) = async_channel::bounded(1);
        *self.inner.lock_blocking() = GateState::Closed { sender, receiver };
    }

    /// Returns `false` if the gate was already open.
    pub fn open(&self, status: Status) -> bool {
        let mut guard_inner = self.inner.lock_blocking();
        match &*guard_inner {
            GateState::Open(_) => false,
            GateState::Closed { sender, .. } => {
                // the receiver still holds the status after the sender is dropped.
                let _ = sender.try_send(status);
                *guard_inner = GateState::Open(Some(status));
                true
            }
        }
    }

    /// Blocks until the gate opens and returns the recorded status, or returns `None`
    /// when `timeout` elapses first. `None` for `timeout` waits forever.
    pub fn wait(&self, timeout: Option<Duration>) -> Option<Status> {
        let receiver = match &*self.inner.lock_blocking() {
            GateState::Open(status) => return *status,
            GateState::Closed { receiver, .. } => receiver.clone(),
        };
        let recv = async { receiver.recv().await.ok() };
        match timeout {
            Some(dur_wait) => future::block_on(recv.or(async {
                Delay::new(dur_wait).await;
                None
            })),
            None => future::block_on(recv),
        }
    }
}

impl Default for SyncGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-use bridge between the terminal callbacks of a request and a blocked
/// synchronous caller. Clones share the same armed gate.
#[derive(Clone)]
pub(crate) struct RequestCallback {
    gate: Arc<SyncGate>,
}

impl RequestCallback {
    /// Closes the gate; the returned bridge is the one meant to reopen it.
    pub fn arm(gate: &Arc<SyncGate>) -> Self {
        gate.close();
        Self { gate: gate.clone() }
    }

    pub fn on_success(&self) {
        self.gate.open(Status::SUCCESS);
    }

    pub fn on_fail(&self, status: Status) {
        self.gate.open(status);
    }

    pub fn on_invalid(&self) {
        self.gate.open(Status::REQUEST_INVALID);
    }

    /// Waits for the recorded status; see [`SyncGate::wait`].
    pub fn wait(self, timeout: Option<Duration>) -> Option<Status> {
        self.gate.wait(timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn open_gate_does_not_block() {
        let gate = SyncGate::new();
        assert_eq!(gate.wait(Some(Duration::from_secs(5))), None);
        assert!(!gate.open(Status::SUCCESS));
    }

    #[test]
    fn first_open_wins() {
        let gate = SyncGate::new();
        gate.close();
        assert!(gate.open(Status::TIMEOUT));
        assert!(!gate.open(Status::SUCCESS));
        assert_eq!(gate.wait(None), Some(Status::TIMEOUT));
    }

    #[test]
    fn bounded_wait_times_out() {
        let gate = Arc::new(SyncGate::new());
        let bridge = RequestCallback::arm(&gate);
        let start = Instant::now();
        assert_eq!(bridge.wait(Some(Duration::from_millis(30))), None);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn opened_from_another_thread() {
        let gate = Arc::new(SyncGate::new());
        let bridge = RequestCallback::arm(&gate);
        let bridge_2 = bridge.clone();
        let opener = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            bridge_2.on_fail(Status::GATT_FAILURE);
            bridge_2.on_success();
        });
        assert_eq!(bridge.wait(Some(Duration::from_secs(5))), Some(Status::GATT_FAILURE));
        opener.join().unwrap();
    }
}
