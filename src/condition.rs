use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

use async_lock::Mutex;
use log::error;

use super::config::PredicateErrorPolicy;
use super::error::Error;
use super::request::Request;
use super::util::BoolExt;
use super::Result;

/// Error a fallible predicate may return.
pub type PredicateError = Box<dyn std::error::Error + Send + Sync>;

type Predicate = Box<dyn Fn() -> std::result::Result<bool, PredicateError> + Send + Sync>;

/// The predicate of a wait-for-condition request, bound to its parameter.
pub(crate) struct ConditionalWait {
    predicate: Predicate,
    negated: AtomicBool,
    policy: Mutex<Option<PredicateErrorPolicy>>,
}

impl ConditionalWait {
    pub fn new<T, F, E>(predicate: F, parameter: T) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&T) -> std::result::Result<bool, E> + Send + Sync + 'static,
        E: Into<PredicateError>,
    {
        Self {
            predicate: Box::new(move || predicate(&parameter).map_err(Into::into)),
            negated: AtomicBool::new(false),
            policy: Mutex::new(None),
        }
    }

    pub fn negate(&self) {
        self.negated.store(true, Ordering::SeqCst);
    }

    pub fn set_policy(&self, policy: PredicateErrorPolicy) {
        self.policy.lock_blocking().replace(policy);
    }

    pub fn apply_default_policy(&self, policy: PredicateErrorPolicy) {
        self.policy.lock_blocking().get_or_insert(policy);
    }

    pub fn is_fulfilled(&self) -> bool {
        let negated = self.negated.load(Ordering::SeqCst);
        match catch_unwind(AssertUnwindSafe(|| (self.predicate)())) {
            Ok(Ok(val)) => val != negated,
            Ok(Err(e)) => {
                error!("error evaluating wait condition: {e}");
                self.on_error()
            }
            Err(_) => {
                error!("wait condition panicked");
                self.on_error()
            }
        }
    }

    fn on_error(&self) -> bool {
        match self.policy.lock_blocking().unwrap_or_default() {
            PredicateErrorPolicy::FailOpen => true,
            PredicateErrorPolicy::FailClosed => false,
        }
    }
}

impl Request {
    fn condition(&self) -> Result<&ConditionalWait> {
        self.inner.condition.as_ref().ok_or_else(|| {
            Error::violation(self, format!("{} requests have no condition", self.kind()))
        })
    }

    /// Makes the condition fulfilled when the predicate returns `false`.
    ///
    /// Must be called before the request starts.
    pub fn negate(&self) -> Result<&Self> {
        let condition = self.condition()?;
        (!self.is_started()).or_violation(self, "cannot negate: request already started")?;
        condition.negate();
        Ok(self)
    }

    /// Sets how a predicate that fails or panics is treated. If never set, the request
    /// handler's configured policy is used.
    pub fn on_predicate_error(&self, policy: PredicateErrorPolicy) -> Result<&Self> {
        let condition = self.condition()?;
        self.ensure_created("predicate error policy")?;
        condition.set_policy(policy);
        Ok(self)
    }

    /// Evaluates the condition of a wait-for-condition request; `None` for other kinds.
    ///
    /// A predicate that fails or panics is logged and yields `true` under
    /// [`PredicateErrorPolicy::FailOpen`], `false` under
    /// [`PredicateErrorPolicy::FailClosed`].
    pub fn is_fulfilled(&self) -> Option<bool> {
        self.inner
            .condition
            .as_ref()
            .map(ConditionalWait::is_fulfilled)
    }
}
