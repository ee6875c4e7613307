//! Ordered BLE GATT request engine.
//!
//! This crate models the requests an application sends to a Bluetooth LE device (connect,
//! read, write, enable notifications, wait for a notification, request MTU and so on) and
//! drives their lifecycle: callbacks, timeouts, trigger linkage between a write and the
//! notification it causes, and a blocking bridge for synchronous callers.
//!
//! It does not talk to a Bluetooth stack. A scheduler, implementing [`RequestHandler`],
//! receives enqueued requests, executes them in order on some transport and reports back
//! with [`Request::notify_started`] followed by exactly one of [`Request::notify_success`],
//! [`Request::notify_fail`] or [`Request::notify_invalid_request`]. User callbacks are
//! delivered through a [`CallbackExecutor`]; [`LooperExecutor`] runs them on a dedicated
//! thread and [`ManualExecutor`] runs them on demand with a virtual clock.
//!
//! Logging is done with the `log` crate; the application picks the logger.

pub use callback::{
    BeforeCallback, FailCallback, InvalidRequestCallback, SuccessCallback, ValueCallback,
};
pub use characteristic::CharacteristicRef;
pub use condition::PredicateError;
pub use config::{PredicateErrorPolicy, RequestConfig};
pub use descriptor::{AttributeRef, DescriptorRef};
pub use error::{Error, ErrorKind, Status};
pub use executor::{Action, ActionHandle, CallbackExecutor, LooperExecutor, ManualExecutor};
pub use handler::RequestHandler;
pub use kind::{RequestKind, MTU_MAX, MTU_MIN};
pub use request::{Request, RequestId, RequestState};
pub use trigger::TriggerStatus;
pub use types::*;

/// Convenience alias for a result with [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

pub use uuid::Uuid;
pub mod error;
mod types;

mod async_util;
mod blocking;
mod callback;
mod characteristic;
mod condition;
mod config;
mod constructors;
mod descriptor;
mod executor;
mod handler;
mod kind;
mod request;
mod timeout;
mod trigger;
mod util;
