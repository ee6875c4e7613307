//! Execution contexts for request callbacks.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use async_channel::{Receiver, Sender};
use async_lock::Mutex;
use futures_lite::future::{self, FutureExt};
use futures_timer::Delay;
use log::{error, warn};

use super::util::{defer, ScopeGuard};

/// A unit of work posted to an executor.
pub type Action = Box<dyn FnOnce() + Send + 'static>;

/// Identifies a delayed action so that it can be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionHandle(u64);

impl ActionHandle {
    /// Allocates a handle no other call of this function returns.
    pub fn next() -> Self {
        static NEXT_ACTION_ID: AtomicU64 = AtomicU64::new(0);
        ActionHandle(NEXT_ACTION_ID.fetch_add(1, Ordering::SeqCst))
    }

    /// Wraps an identifier allocated by the executor itself, e.g. a timer id of
    /// an event loop.
    pub const fn from_raw(id: u64) -> Self {
        ActionHandle(id)
    }

    pub const fn into_raw(self) -> u64 {
        self.0
    }
}

/// The context user callbacks and timeout actions run on.
///
/// Actions posted with [`CallbackExecutor::post`] must run in posting order.
pub trait CallbackExecutor: Send + Sync {
    /// Runs `action` as soon as possible.
    fn post(&self, action: Action);

    /// Runs `action` after `delay`, unless it is cancelled before.
    fn post_delayed(&self, action: Action, delay: Duration) -> ActionHandle;

    /// Cancels a delayed action. Once this returns, the action will not start.
    /// Cancelling an action that already ran is a no-op.
    fn cancel(&self, handle: ActionHandle);

    /// Checks if the calling thread is the one running this executor's actions.
    fn is_current_thread(&self) -> bool;
}

enum Message {
    Run(Action),
    RunAt(ActionHandle, Instant, Action),
    Cancel(ActionHandle),
}

enum Wakeup {
    Message(Message),
    Tick,
    Closed,
}

/// Runs actions on a dedicated thread, in order.
///
/// The thread exits once the executor is dropped and the already posted actions
/// have run; delayed actions that are not yet due are discarded.
pub struct LooperExecutor {
    sender: Sender<Message>,
    live: Arc<Mutex<HashSet<ActionHandle>>>,
    thread_id: ThreadId,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl LooperExecutor {
    /// Spawns the looper thread.
    pub fn new(thread_name: impl Into<String>) -> std::io::Result<Self> {
        let (sender, receiver) = async_channel::unbounded();
        let live = Arc::new(Mutex::new(HashSet::new()));
        let live_2 = live.clone();
        let join = std::thread::Builder::new()
            .name(thread_name.into())
            .spawn(move || run_looper(receiver, live_2))?;
        Ok(Self {
            sender,
            live,
            thread_id: join.thread().id(),
            join: Mutex::new(Some(join)),
        })
    }

    fn send(&self, message: Message) -> bool {
        if self.sender.try_send(message).is_err() {
            warn!("looper thread is gone, action discarded");
            return false;
        }
        true
    }
}

fn run_looper(receiver: Receiver<Message>, live: Arc<Mutex<HashSet<ActionHandle>>>) {
    let mut delayed: BTreeMap<(Instant, ActionHandle), Action> = BTreeMap::new();
    let mut deadlines: HashMap<ActionHandle, Instant> = HashMap::new();
    loop {
        let now = Instant::now();
        while let Some(entry) = delayed.first_entry() {
            if entry.key().0 > now {
                break;
            }
            let ((_, handle), action) = entry.remove_entry();
            deadlines.remove(&handle);
            // the handle leaves the live set here, so a concurrent `cancel`
            // either wins before this point or is a no-op.
            if live.lock_blocking().remove(&handle) {
                run_action(action);
            }
        }

        let recv = async {
            match receiver.recv().await {
                Ok(message) => Wakeup::Message(message),
                Err(_) => Wakeup::Closed,
            }
        };
        let wakeup = match delayed.keys().next() {
            Some(&(at, _)) => future::block_on(recv.or(async {
                Delay::new(at.saturating_duration_since(Instant::now())).await;
                Wakeup::Tick
            })),
            None => future::block_on(recv),
        };

        match wakeup {
            Wakeup::Message(Message::Run(action)) => run_action(action),
            Wakeup::Message(Message::RunAt(handle, at, action)) => {
                deadlines.insert(handle, at);
                delayed.insert((at, handle), action);
            }
            Wakeup::Message(Message::Cancel(handle)) => {
                if let Some(at) = deadlines.remove(&handle) {
                    delayed.remove(&(at, handle));
                }
            }
            Wakeup::Tick => (),
            Wakeup::Closed => break,
        }
    }
}

fn run_action(action: Action) {
    if catch_unwind(AssertUnwindSafe(action)).is_err() {
        error!("a callback panicked on the looper thread");
    }
}

impl CallbackExecutor for LooperExecutor {
    fn post(&self, action: Action) {
        self.send(Message::Run(action));
    }

    fn post_delayed(&self, action: Action, delay: Duration) -> ActionHandle {
        let handle = ActionHandle::next();
        self.live.lock_blocking().insert(handle);
        if !self.send(Message::RunAt(handle, Instant::now() + delay, action)) {
            self.live.lock_blocking().remove(&handle);
        }
        handle
    }

    fn cancel(&self, handle: ActionHandle) {
        if self.live.lock_blocking().remove(&handle) {
            self.send(Message::Cancel(handle));
        }
    }

    fn is_current_thread(&self) -> bool {
        std::thread::current().id() == self.thread_id
    }
}

impl Drop for LooperExecutor {
    fn drop(&mut self) {
        self.sender.close();
        if self.is_current_thread() {
            return;
        }
        if let Some(join) = self.join.lock_blocking().take() {
            let _ = join.join();
        }
    }
}

/// A single-threaded executor driven by its owner, with a virtual clock.
///
/// Nothing runs until [`ManualExecutor::run_pending`] or [`ManualExecutor::advance`]
/// is called; delayed actions become due when the virtual clock passes their deadline.
#[derive(Default)]
pub struct ManualExecutor {
    state: Mutex<ManualState>,
    runner: Mutex<Option<ThreadId>>,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    queue: VecDeque<Action>,
    delayed: BTreeMap<(Duration, ActionHandle), Action>,
    deadlines: HashMap<ActionHandle, Duration>,
}

impl ManualExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.state.lock_blocking().now
    }

    /// Number of posted actions waiting to run.
    pub fn pending(&self) -> usize {
        self.state.lock_blocking().queue.len()
    }

    /// Number of delayed actions not yet due.
    pub fn scheduled(&self) -> usize {
        self.state.lock_blocking().delayed.len()
    }

    /// Runs posted actions, including those posted meanwhile, until the queue is empty.
    /// Returns the number of actions run.
    pub fn run_pending(&self) -> usize {
        let _runner = self.enter();
        let mut ran = 0;
        loop {
            let next = self.state.lock_blocking().queue.pop_front();
            match next {
                Some(action) => {
                    action();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    /// Moves the virtual clock forward, running delayed actions as they become due
    /// and everything they post. Returns the number of actions run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now() + by;
        let mut ran = self.run_pending();
        loop {
            let due = {
                let mut state = self.state.lock_blocking();
                match state.delayed.first_entry() {
                    Some(entry) if entry.key().0 <= target => {
                        let ((at, handle), action) = entry.remove_entry();
                        state.deadlines.remove(&handle);
                        state.now = at;
                        Some(action)
                    }
                    _ => None,
                }
            };
            let Some(action) = due else {
                break;
            };
            {
                let _runner = self.enter();
                action();
            }
            ran += 1 + self.run_pending();
        }
        self.state.lock_blocking().now = target;
        ran
    }

    fn enter(&self) -> ScopeGuard<impl FnOnce() + '_> {
        let prev = self
            .runner
            .lock_blocking()
            .replace(std::thread::current().id());
        defer(move || *self.runner.lock_blocking() = prev)
    }
}

impl CallbackExecutor for ManualExecutor {
    fn post(&self, action: Action) {
        self.state.lock_blocking().queue.push_back(action);
    }

    fn post_delayed(&self, action: Action, delay: Duration) -> ActionHandle {
        let handle = ActionHandle::next();
        let mut state = self.state.lock_blocking();
        let at = state.now + delay;
        state.deadlines.insert(handle, at);
        state.delayed.insert((at, handle), action);
        handle
    }

    fn cancel(&self, handle: ActionHandle) {
        let mut state = self.state.lock_blocking();
        if let Some(at) = state.deadlines.remove(&handle) {
            state.delayed.remove(&(at, handle));
        }
    }

    fn is_current_thread(&self) -> bool {
        *self.runner.lock_blocking() == Some(std::thread::current().id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Action) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_2 = count.clone();
        (count, move || {
            let count = count_2.clone();
            Box::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            })
        })
    }

    #[test]
    fn manual_runs_in_post_order() {
        let exec = Arc::new(ManualExecutor::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let log = log.clone();
            exec.post(Box::new(move || log.lock_blocking().push(i)));
        }
        assert_eq!(exec.pending(), 3);
        assert_eq!(exec.run_pending(), 3);
        assert_eq!(*log.lock_blocking(), vec![0, 1, 2]);
    }

    #[test]
    fn manual_delayed_fires_at_deadline() {
        let exec = ManualExecutor::new();
        let (count, action) = counter();
        exec.post_delayed(action(), Duration::from_millis(100));
        assert_eq!(exec.advance(Duration::from_millis(99)), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(exec.advance(Duration::from_millis(1)), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(exec.now(), Duration::from_millis(100));
    }

    #[test]
    fn manual_cancel_prevents_run() {
        let exec = ManualExecutor::new();
        let (count, action) = counter();
        let handle = exec.post_delayed(action(), Duration::from_millis(10));
        exec.cancel(handle);
        assert_eq!(exec.scheduled(), 0);
        exec.advance(Duration::from_secs(1));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn manual_reports_its_thread_only_while_running() {
        let exec = Arc::new(ManualExecutor::new());
        assert!(!exec.is_current_thread());
        let (tx, rx) = mpsc::channel();
        let exec_2 = exec.clone();
        exec.post(Box::new(move || tx.send(exec_2.is_current_thread()).unwrap()));
        exec.run_pending();
        assert!(rx.recv().unwrap());
        assert!(!exec.is_current_thread());
    }

    #[test]
    fn looper_runs_posts_in_order_on_its_thread() {
        let exec = Arc::new(LooperExecutor::new("looper-test").unwrap());
        let (tx, rx) = mpsc::channel();
        for i in 0..5 {
            let tx = tx.clone();
            let exec_2 = exec.clone();
            exec.post(Box::new(move || {
                tx.send((i, exec_2.is_current_thread())).unwrap();
            }));
        }
        let got: Vec<_> = (0..5).map(|_| rx.recv().unwrap()).collect();
        assert_eq!(got, (0..5).map(|i| (i, true)).collect::<Vec<_>>());
        assert!(!exec.is_current_thread());
    }

    #[test]
    fn looper_delayed_and_cancelled() {
        let exec = LooperExecutor::new("looper-delay").unwrap();
        let (tx, rx) = mpsc::channel();
        let tx_2 = tx.clone();
        let cancelled = exec.post_delayed(
            Box::new(move || tx_2.send("cancelled").unwrap()),
            Duration::from_millis(20),
        );
        exec.post_delayed(
            Box::new(move || tx.send("fired").unwrap()),
            Duration::from_millis(40),
        );
        exec.cancel(cancelled);
        let start = Instant::now();
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "fired");
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn looper_forgets_delayed_actions_it_cannot_take() {
        let exec = LooperExecutor::new("looper-closed").unwrap();
        exec.sender.close();
        let (count, action) = counter();
        let handle = exec.post_delayed(action(), Duration::from_millis(1));
        assert!(exec.live.lock_blocking().is_empty());
        exec.cancel(handle);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn handles_round_trip_raw_ids() {
        let handle = ActionHandle::from_raw(42);
        assert_eq!(handle.into_raw(), 42);
        assert_ne!(ActionHandle::next(), ActionHandle::next());
    }

    #[test]
    fn looper_survives_a_panicking_action() {
        let exec = LooperExecutor::new("looper-panic").unwrap();
        let (tx, rx) = mpsc::channel();
        exec.post(Box::new(|| panic!("boom")));
        exec.post(Box::new(move || tx.send(()).unwrap()));
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }
}
