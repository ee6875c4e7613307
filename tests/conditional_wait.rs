mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ble_requests::{ErrorKind, PredicateErrorPolicy, Request, RequestConfig};
use common::{device, manual, FakeScheduler};

#[test]
fn negated_wait_is_fulfilled_when_the_predicate_is_false() {
    let connected = Arc::new(AtomicBool::new(true));
    let req = Request::wait_until(
        |c: &Arc<AtomicBool>| c.load(Ordering::SeqCst),
        connected.clone(),
    );
    assert_eq!(req.is_fulfilled(), Some(true));

    req.negate().unwrap();
    assert_eq!(req.is_fulfilled(), Some(false));
    connected.store(false, Ordering::SeqCst);
    assert_eq!(req.is_fulfilled(), Some(true));
}

#[test]
fn negate_is_rejected_once_started() {
    let exec = manual();
    let req = Request::wait_until(|_: &()| false, ());
    req.set_executor(exec).unwrap();
    req.notify_started(&device());
    assert_eq!(
        req.negate().unwrap_err().kind(),
        ErrorKind::PreconditionViolation
    );
    assert_eq!(req.is_fulfilled(), Some(false));
}

#[test]
fn failing_predicate_is_fulfilled_by_default() {
    let req = Request::try_wait_until(
        |_: &()| -> Result<bool, std::io::Error> { Err(std::io::Error::other("link lost")) },
        (),
    );
    assert_eq!(req.is_fulfilled(), Some(true));
}

#[test]
fn scheduler_policy_applies_at_enqueue() {
    let exec = manual();
    let config = RequestConfig::new().predicate_error_policy(PredicateErrorPolicy::FailClosed);
    let handler = FakeScheduler::new(exec).with_config(config).into_handler();

    let req = Request::try_wait_until(|_: &()| Err::<bool, _>("no reading"), ());
    req.set_request_handler(handler.clone());
    req.enqueue().unwrap();
    assert_eq!(req.is_fulfilled(), Some(false));

    // an explicit choice on the request wins
    let req = Request::try_wait_until(|_: &()| Err::<bool, _>("no reading"), ());
    req.set_request_handler(handler);
    req.on_predicate_error(PredicateErrorPolicy::FailOpen).unwrap();
    req.enqueue().unwrap();
    assert_eq!(req.is_fulfilled(), Some(true));
}

#[test]
fn scheduler_completes_a_fulfilled_wait() {
    let exec = manual();
    let ready = Arc::new(AtomicBool::new(false));
    let handler = FakeScheduler::new(exec.clone())
        .on_enqueue(|req| {
            if req.is_fulfilled() == Some(true) {
                req.notify_started(&device());
                req.notify_success(&device());
            }
        })
        .into_handler();

    let is_ready = |r: &Arc<AtomicBool>| r.load(Ordering::SeqCst);
    let req = Request::wait_until(is_ready, ready.clone());
    req.set_request_handler(handler.clone());
    req.enqueue().unwrap();
    assert!(!req.is_finished());

    ready.store(true, Ordering::SeqCst);
    let req = Request::wait_until(is_ready, ready);
    req.set_request_handler(handler);
    req.enqueue().unwrap();
    assert!(req.is_finished());
}
