//! A callback executor implemented outside the crate, the way a scheduler with its
//! own event loop would plug one in.

mod common;

use std::collections::HashSet;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;
use std::time::Duration;

use async_channel::Sender;
use ble_requests::{
    Action, ActionHandle, CallbackExecutor, Request, Response, Status, TriggerStatus,
};
use common::{control_point, device, later, measurement, FakeScheduler};
use futures_lite::future;

/// Runs posted actions in order on a worker thread. Delayed actions fire on a
/// timer thread of their own.
struct WorkerExecutor {
    queue: Sender<Action>,
    worker: ThreadId,
    live: Arc<Mutex<HashSet<ActionHandle>>>,
}

impl WorkerExecutor {
    fn new() -> Arc<Self> {
        let (queue, actions) = async_channel::unbounded::<Action>();
        let worker = std::thread::spawn(move || {
            while let Ok(action) = future::block_on(actions.recv()) {
                action();
            }
        });
        Arc::new(Self {
            queue,
            worker: worker.thread().id(),
            live: Arc::new(Mutex::new(HashSet::new())),
        })
    }
}

impl CallbackExecutor for WorkerExecutor {
    fn post(&self, action: Action) {
        self.queue.try_send(action).unwrap();
    }

    fn post_delayed(&self, action: Action, delay: Duration) -> ActionHandle {
        let handle = ActionHandle::next();
        self.live.lock().unwrap().insert(handle);
        let live = self.live.clone();
        std::thread::spawn(move || {
            std::thread::sleep(delay);
            if live.lock().unwrap().remove(&handle) {
                action();
            }
        });
        handle
    }

    fn cancel(&self, handle: ActionHandle) {
        self.live.lock().unwrap().remove(&handle);
    }

    fn is_current_thread(&self) -> bool {
        std::thread::current().id() == self.worker
    }
}

fn record(req: &Request) -> mpsc::Receiver<&'static str> {
    let (tx, rx) = mpsc::channel();
    let tx_2 = tx.clone();
    req.before(move |_| tx_2.send("before").unwrap()).unwrap();
    let tx_2 = tx.clone();
    req.done(move |_| tx_2.send("success").unwrap()).unwrap();
    req.fail(move |_, _| tx.send("fail").unwrap()).unwrap();
    rx
}

#[test]
fn immediate_timeout_fails_after_the_before_callback() {
    let exec = WorkerExecutor::new();
    for _ in 0..500 {
        let req = Request::read(measurement());
        req.set_executor(exec.clone()).unwrap();
        req.timeout(Duration::from_nanos(1)).unwrap();
        let events = record(&req);

        req.notify_started(&device());
        let got: Vec<_> = (0..2)
            .map(|_| events.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        assert_eq!(got, vec!["before", "fail"]);
        assert_eq!(req.status(), Some(Status::TIMEOUT));
    }
}

#[test]
fn triggered_wait_times_out_after_its_trigger_started() {
    let exec = WorkerExecutor::new();
    for _ in 0..200 {
        let wait = Request::wait_for_notification(measurement());
        let write = Request::write(control_point(), vec![0x01], Default::default());
        wait.set_executor(exec.clone()).unwrap();
        write.set_executor(exec.clone()).unwrap();
        wait.timeout(Duration::from_nanos(1)).unwrap();
        wait.trigger(&write).unwrap();
        let events = record(&wait);

        wait.notify_started(&device());
        write.notify_started(&device());
        let got: Vec<_> = (0..2)
            .map(|_| events.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        assert_eq!(got, vec!["before", "fail"]);
        assert_eq!(wait.trigger_status(), Some(TriggerStatus::Started));
    }
}

#[test]
fn scheduler_executor_drives_timeouts_and_awaits() {
    let exec = WorkerExecutor::new();
    let handler = FakeScheduler::new(exec.clone()).into_handler();
    let req = Request::wait_for_notification(measurement());
    req.set_request_handler(handler.clone());
    req.timeout(Duration::from_millis(20)).unwrap();
    let events = record(&req);
    req.enqueue().unwrap();
    req.notify_started(&device());

    assert_eq!(events.recv_timeout(Duration::from_secs(5)).unwrap(), "before");
    assert_eq!(events.recv_timeout(Duration::from_secs(5)).unwrap(), "fail");
    // the scheduler hears of the timeout right after the fail callback is posted
    for _ in 0..100 {
        if !handler.timed_out().is_empty() {
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(handler.timed_out(), vec![req.clone()]);

    let handler = FakeScheduler::new(exec)
        .on_enqueue(|req| {
            let req = req.clone();
            later(Duration::from_millis(10), move || {
                req.notify_started(&device());
                req.notify_value(&device(), Response::Rssi(-60));
                req.notify_success(&device());
            });
        })
        .into_handler();
    let req = Request::read_rssi();
    req.set_request_handler(handler);
    assert_eq!(
        req.await_with(None::<Response>).unwrap(),
        Some(Response::Rssi(-60))
    );
}
