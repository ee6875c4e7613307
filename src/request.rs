//! The request lifecycle.
//!
//! A [`Request`] moves through [`RequestState::Created`], [`RequestState::Enqueued`],
//! [`RequestState::Started`] and [`RequestState::Finished`], never backwards and never
//! entering a state twice. The scheduler and a firing timeout may race to finish a
//! request; the state word is the only arbiter, so exactly one terminal notification
//! takes effect and only that one reaches the user callbacks.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use async_lock::Mutex;
use log::{debug, warn};

use super::async_util::SyncGate;
use super::callback::CallbackSet;
use super::condition::ConditionalWait;
use super::config::RequestConfig;
use super::descriptor::AttributeRef;
use super::error::{Error, Status};
use super::executor::CallbackExecutor;
use super::handler::RequestHandler;
use super::kind::RequestKind;
use super::timeout::TimeoutPolicy;
use super::trigger::TriggerPolicy;
use super::types::{DeviceId, Response};
use super::util::BoolExt;
use super::Result;

/// Process-unique identifier of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    fn next() -> Self {
        static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);
        RequestId(NEXT_REQUEST_ID.fetch_add(1, Ordering::SeqCst))
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum RequestState {
    Created = 0,
    Enqueued = 1,
    Started = 2,
    Finished = 3,
}

impl RequestState {
    fn from_u8(val: u8) -> Self {
        match val {
            0 => Self::Created,
            1 => Self::Enqueued,
            2 => Self::Started,
            _ => Self::Finished,
        }
    }
}

/// A queued BLE operation.
///
/// This is a cheap handle; clones refer to the same request. Requests are created with
/// the constructor functions (e.g. [`Request::read`]), configured with the builder
/// methods while still in [`RequestState::Created`], then either enqueued
/// ([`Request::enqueue`]) or executed synchronously ([`Request::await_done`]).
#[derive(Clone)]
pub struct Request {
    pub(crate) inner: Arc<RequestInner>,
}

pub(crate) struct RequestInner {
    id: RequestId,
    kind: RequestKind,
    target: Option<AttributeRef>,
    state: AtomicU8,
    status: Mutex<Option<Status>>,
    pub(crate) callbacks: Mutex<CallbackSet>,
    handler: Mutex<Option<Arc<dyn RequestHandler>>>,
    executor: Mutex<Option<Arc<dyn CallbackExecutor>>>,
    pub(crate) timeout: Option<TimeoutPolicy>,
    pub(crate) trigger: Option<TriggerPolicy>,
    pub(crate) condition: Option<ConditionalWait>,
    pub(crate) gate: Arc<SyncGate>,
}

impl PartialEq for Request {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Request {}

impl std::hash::Hash for Request {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut f = f.debug_struct("Request");
        f.field("id", &self.inner.id);
        f.field("kind", &self.inner.kind);
        if let Some(target) = &self.inner.target {
            f.field("target", target);
        }
        f.field("state", &self.state());
        f.finish()
    }
}

impl std::fmt::Display for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} request {}", self.inner.kind, self.inner.id)
    }
}

impl Request {
    pub(crate) fn new(kind: RequestKind, target: Option<AttributeRef>) -> Self {
        Self::build(kind, target, None)
    }

    pub(crate) fn build(
        kind: RequestKind,
        target: Option<AttributeRef>,
        condition: Option<ConditionalWait>,
    ) -> Self {
        let timeout = kind.is_timeoutable().then(TimeoutPolicy::new);
        let trigger = kind.is_awaiting().then(TriggerPolicy::new);
        Self {
            inner: Arc::new(RequestInner {
                id: RequestId::next(),
                kind,
                target,
                state: AtomicU8::new(RequestState::Created as u8),
                status: Mutex::new(None),
                callbacks: Mutex::new(CallbackSet::default()),
                handler: Mutex::new(None),
                executor: Mutex::new(None),
                timeout,
                trigger,
                condition,
                gate: Arc::new(SyncGate::new()),
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<RequestInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<RequestInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// This request's unique identifier.
    pub fn id(&self) -> RequestId {
        self.inner.id
    }

    /// The operation this request performs.
    pub fn kind(&self) -> &RequestKind {
        &self.inner.kind
    }

    /// The attribute this request operates on, if any.
    pub fn target(&self) -> Option<&AttributeRef> {
        self.inner.target.as_ref()
    }

    pub fn state(&self) -> RequestState {
        RequestState::from_u8(self.inner.state.load(Ordering::SeqCst))
    }

    pub fn is_enqueued(&self) -> bool {
        self.state() >= RequestState::Enqueued
    }

    pub fn is_started(&self) -> bool {
        self.state() >= RequestState::Started
    }

    pub fn is_finished(&self) -> bool {
        self.state() == RequestState::Finished
    }

    /// The status the request finished with; `None` while it is not finished.
    pub fn status(&self) -> Option<Status> {
        *self.inner.status.lock_blocking()
    }

    /// Marks the request finished with `status`. Returns `false` if it already was.
    fn finish(&self, status: Status) -> bool {
        if !self.advance(RequestState::Finished) {
            return false;
        }
        self.inner.status.lock_blocking().replace(status);
        self.cancel_timeout();
        true
    }

    /// Moves the state forward to `to`. Returns `false` if the request is already
    /// there or beyond.
    fn advance(&self, to: RequestState) -> bool {
        self.inner
            .state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cur| {
                (cur < to as u8).then_some(to as u8)
            })
            .is_ok()
    }

    /// Runs `f` on the callback set if the request has not been enqueued yet.
    /// [`Request::enqueue`] holds the same lock while it changes the state.
    fn configure(&self, what: &str, f: impl FnOnce(&mut CallbackSet)) -> Result<&Self> {
        let mut callbacks = self.inner.callbacks.lock_blocking();
        (self.state() == RequestState::Created).or_violation(
            self,
            &format!("cannot set {what}: request already enqueued"),
        )?;
        f(&mut callbacks);
        Ok(self)
    }

    pub(crate) fn ensure_created(&self, what: &str) -> Result<()> {
        let _callbacks = self.inner.callbacks.lock_blocking();
        let message = match self.state() {
            RequestState::Created => return Ok(()),
            RequestState::Enqueued => format!("cannot set {what}: request already enqueued"),
            _ => format!("cannot set {what}: request already started"),
        };
        Err(Error::violation(self, message))
    }

    /// Sets a callback run when the operation starts executing.
    pub fn before(&self, callback: impl Fn(&DeviceId) + Send + Sync + 'static) -> Result<&Self> {
        self.configure("before callback", |cbs| cbs.before = Some(Arc::new(callback)))
    }

    /// Sets a callback run when the operation completes successfully.
    ///
    /// Ignored when the request is executed with [`Request::await_done`].
    pub fn done(&self, callback: impl Fn(&DeviceId) + Send + Sync + 'static) -> Result<&Self> {
        self.configure("success callback", |cbs| cbs.success = Some(Arc::new(callback)))
    }

    /// Sets a callback run when the operation fails, with the failure status.
    ///
    /// If the request cannot be associated with a device, the
    /// [invalid request callback](Request::invalid) is used instead.
    pub fn fail(
        &self,
        callback: impl Fn(&DeviceId, Status) + Send + Sync + 'static,
    ) -> Result<&Self> {
        self.configure("fail callback", |cbs| cbs.fail = Some(Arc::new(callback)))
    }

    /// Sets a callback run when the request was issued before any device was known.
    pub fn invalid(&self, callback: impl Fn() + Send + Sync + 'static) -> Result<&Self> {
        self.configure("invalid request callback", |cbs| {
            cbs.invalid = Some(Arc::new(callback))
        })
    }

    /// Sets a callback receiving the values this request produces.
    pub fn with(
        &self,
        callback: impl Fn(&DeviceId, &Response) + Send + Sync + 'static,
    ) -> Result<&Self> {
        self.configure("value callback", |cbs| cbs.value = Some(Arc::new(callback)))
    }

    /// Overrides the executor the callbacks of this request are delivered on.
    pub fn set_executor(&self, executor: Arc<dyn CallbackExecutor>) -> Result<&Self> {
        self.configure("executor", |_| ())?;
        self.inner.executor.lock_blocking().replace(executor);
        Ok(self)
    }

    /// Binds the request to the scheduler that will execute it.
    pub fn set_request_handler(&self, handler: Arc<dyn RequestHandler>) -> &Self {
        self.inner.handler.lock_blocking().replace(handler);
        self
    }

    pub(crate) fn request_handler(&self) -> Option<Arc<dyn RequestHandler>> {
        self.inner.handler.lock_blocking().clone()
    }

    /// The executor callbacks are delivered on: the one set on the request, or the
    /// request handler's.
    pub fn executor(&self) -> Option<Arc<dyn CallbackExecutor>> {
        if let Some(executor) = self.inner.executor.lock_blocking().clone() {
            return Some(executor);
        }
        self.request_handler().map(|handler| handler.executor())
    }

    /// Submits the request to its request handler for asynchronous execution.
    /// The outcome is delivered through the callbacks.
    pub fn enqueue(&self) -> Result<()> {
        let handler = self
            .request_handler()
            .ok_or_else(|| Error::violation(self, "no request handler set"))?;
        {
            let _callbacks = self.inner.callbacks.lock_blocking();
            self.advance(RequestState::Enqueued)
                .or_violation(self, "request already enqueued")?;
        }
        self.apply_config(&handler.config());
        debug!("enqueued {self}");
        handler.enqueue(self.clone());
        Ok(())
    }

    fn apply_config(&self, config: &RequestConfig) {
        if let Some(timeout) = &self.inner.timeout {
            timeout.apply_default(config.default_timeout);
        }
        if let Some(condition) = &self.inner.condition {
            condition.apply_default_policy(config.predicate_error_policy);
        }
    }

    /// Posts `action` to the callback executor.
    fn post(&self, action: impl FnOnce() + Send + 'static) {
        match self.executor() {
            Some(executor) => executor.post(Box::new(action)),
            None => {
                warn!("{self} has no callback executor, running callback inline");
                action()
            }
        }
    }

    /// Called by the scheduler when the transport starts executing the operation.
    /// Only the first call has an effect.
    pub fn notify_started(&self, device: &DeviceId) {
        if !self.advance(RequestState::Started) {
            return;
        }
        debug!("started {self} on {device}");
        let (internal, user) = {
            let cbs = self.inner.callbacks.lock_blocking();
            (cbs.internal_before.clone(), cbs.before.clone())
        };
        if let Some(cb) = internal {
            cb(device);
        }
        if let Some(cb) = user {
            let device = device.clone();
            self.post(move || cb(&device));
        }
        // armed last, so a firing timeout posts its fail callback after `before`
        if let Some(timeout) = &self.inner.timeout {
            timeout.arm(self, device);
        }
    }

    /// Called by the scheduler when the operation completed successfully.
    ///
    /// Returns `false` if the request had already finished, in which case nothing happens.
    pub fn notify_success(&self, device: &DeviceId) -> bool {
        if !self.finish(Status::SUCCESS) {
            return false;
        }
        debug!("{self} succeeded on {device}");
        let (internal, user) = {
            let cbs = self.inner.callbacks.lock_blocking();
            (cbs.internal_success.clone(), cbs.success.clone())
        };
        if let Some(cb) = internal {
            cb(device);
        }
        if let Some(cb) = user {
            let device = device.clone();
            self.post(move || cb(&device));
        }
        true
    }

    /// Called by the scheduler, or by a firing timeout, when the operation failed.
    ///
    /// Returns `false` if the request had already finished, in which case nothing happens.
    pub fn notify_fail(&self, device: &DeviceId, status: Status) -> bool {
        if !self.finish(status) {
            return false;
        }
        debug!("{self} failed on {device}: {status}");
        let (internal, user) = {
            let cbs = self.inner.callbacks.lock_blocking();
            (cbs.internal_fail.clone(), cbs.fail.clone())
        };
        if let Some(cb) = internal {
            cb(device, status);
        }
        if let Some(cb) = user {
            let device = device.clone();
            self.post(move || cb(&device, status));
        }
        true
    }

    /// Called by the scheduler when the request cannot be associated with a device,
    /// e.g. because no connection was ever attempted.
    ///
    /// Returns `false` if the request had already finished, in which case nothing happens.
    pub fn notify_invalid_request(&self) -> bool {
        if !self.finish(Status::REQUEST_INVALID) {
            return false;
        }
        debug!("{self} is invalid");
        let user = self.inner.callbacks.lock_blocking().invalid.clone();
        if let Some(cb) = user {
            self.post(move || cb());
        }
        true
    }

    /// Called by the scheduler for each value the operation produces, before the
    /// terminal notification.
    pub fn notify_value(&self, device: &DeviceId, response: Response) {
        let user = self.inner.callbacks.lock_blocking().value.clone();
        if let Some(cb) = user {
            let device = device.clone();
            self.post(move || cb(&device, &response));
        }
    }
}
