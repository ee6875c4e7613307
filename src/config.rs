use std::time::Duration;

/// What a conditional wait does when its predicate returns an error or panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PredicateErrorPolicy {
    /// Treat the condition as fulfilled, so the queue moves on.
    #[default]
    FailOpen,
    /// Treat the condition as not fulfilled; the request keeps waiting
    /// until its timeout, if any.
    FailClosed,
}

/// Defaults a [`crate::RequestHandler`] applies to the requests it receives.
///
/// Values chosen explicitly on a request take precedence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestConfig {
    /// Timeout of requests that support one, zero to disable.
    pub default_timeout: Duration,
    /// Error policy of conditional waits.
    pub predicate_error_policy: PredicateErrorPolicy,
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn predicate_error_policy(mut self, policy: PredicateErrorPolicy) -> Self {
        self.predicate_error_policy = policy;
        self
    }
}
