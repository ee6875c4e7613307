//! A fake scheduler standing in for the transport in integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use ble_requests::{
    CallbackExecutor, CharacteristicRef, DeviceId, LooperExecutor, ManualExecutor, Request,
    RequestConfig, RequestHandler, Uuid,
};

pub const HEART_RATE_SERVICE: Uuid = Uuid::from_u128(0x0000180d_0000_1000_8000_00805f9b34fb);
pub const HEART_RATE_MEASUREMENT: Uuid = Uuid::from_u128(0x00002a37_0000_1000_8000_00805f9b34fb);
pub const HEART_RATE_CONTROL_POINT: Uuid = Uuid::from_u128(0x00002a39_0000_1000_8000_00805f9b34fb);

pub fn measurement() -> CharacteristicRef {
    CharacteristicRef::new(HEART_RATE_SERVICE, HEART_RATE_MEASUREMENT)
}

pub fn control_point() -> CharacteristicRef {
    CharacteristicRef::new(HEART_RATE_SERVICE, HEART_RATE_CONTROL_POINT)
}

pub fn device() -> DeviceId {
    DeviceId::from("C0:FF:EE:00:00:01")
}

type OnEnqueue = Box<dyn Fn(&Request) + Send + Sync>;

/// Records what the request engine hands to the scheduler. An optional hook plays
/// the transport when a request is enqueued.
pub struct FakeScheduler {
    executor: Arc<dyn CallbackExecutor>,
    config: RequestConfig,
    on_enqueue: Option<OnEnqueue>,
    enqueued: Mutex<Vec<Request>>,
    timed_out: Mutex<Vec<Request>>,
}

impl FakeScheduler {
    pub fn new(executor: Arc<dyn CallbackExecutor>) -> Self {
        Self {
            executor,
            config: RequestConfig::default(),
            on_enqueue: None,
            enqueued: Mutex::new(Vec::new()),
            timed_out: Mutex::new(Vec::new()),
        }
    }

    pub fn with_config(mut self, config: RequestConfig) -> Self {
        self.config = config;
        self
    }

    pub fn on_enqueue(mut self, hook: impl Fn(&Request) + Send + Sync + 'static) -> Self {
        self.on_enqueue = Some(Box::new(hook));
        self
    }

    pub fn into_handler(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn enqueued(&self) -> Vec<Request> {
        self.enqueued.lock().unwrap().clone()
    }

    pub fn timed_out(&self) -> Vec<Request> {
        self.timed_out.lock().unwrap().clone()
    }
}

impl RequestHandler for FakeScheduler {
    fn enqueue(&self, request: Request) {
        self.enqueued.lock().unwrap().push(request.clone());
        if let Some(hook) = &self.on_enqueue {
            hook(&request);
        }
    }

    fn on_request_timeout(&self, request: &Request) {
        self.timed_out.lock().unwrap().push(request.clone());
    }

    fn executor(&self) -> Arc<dyn CallbackExecutor> {
        self.executor.clone()
    }

    fn config(&self) -> RequestConfig {
        self.config.clone()
    }
}

pub fn manual() -> Arc<ManualExecutor> {
    Arc::new(ManualExecutor::new())
}

pub fn looper(name: &str) -> Arc<LooperExecutor> {
    Arc::new(LooperExecutor::new(name).unwrap())
}

/// Runs `f` on a new thread after `delay`, like a transport answering later.
pub fn later(delay: Duration, f: impl FnOnce() + Send + 'static) {
    std::thread::spawn(move || {
        std::thread::sleep(delay);
        f();
    });
}
