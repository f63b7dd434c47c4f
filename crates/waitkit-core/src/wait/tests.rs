//! Engine tests for the blocking driver: termination conditions, policies,
//! events and throw-on-failure.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::control::CancelToken;
use crate::wait::{Abort, Attempt, Facade, Options, Outcome, RunEvent, Status};

/// Facade with a generous clock bound and no pause between polls.
fn quick() -> Facade {
    Facade::new(
        "test",
        Options {
            trace_exceptions: true,
            max_accepted_exceptions: None,
            max_retry_count: None,
            timeout: Some(Duration::from_secs(5)),
            time_gap: Duration::ZERO,
        },
    )
}

fn counter() -> (Arc<AtomicU32>, Arc<AtomicU32>) {
    let c = Arc::new(AtomicU32::new(0));
    (Arc::clone(&c), c)
}

// ============================================================================
// Termination
// ============================================================================

#[test]
fn first_value_wins() {
    let (calls, seen) = counter();
    let mut w = quick().until(move |_| {
        let n = seen.fetch_add(1, Ordering::SeqCst) + 1;
        Ok((n >= 3).then_some(n * 10))
    });
    let r = w.start().unwrap();
    assert_eq!(r.status(), Status::SUCCESS);
    assert_eq!(r.value(), Some(&30));
    assert_eq!(r.attempts(), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn zero_is_a_real_value() {
    let mut w = quick().until(|_| Ok(Some(0u8)));
    let r = w.start().unwrap();
    assert_eq!(r.value(), Some(&0));
    assert_eq!(r.attempts(), 1);
}

#[test]
fn retry_budget_allows_r_plus_one_calls() {
    let (calls, seen) = counter();
    let mut w = quick()
        .until(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(false)
        })
        .with_max_retry_count(Some(4));
    let r = w.start().unwrap();
    assert_eq!(r.status(), Status::TOO_MANY_RETRIES);
    assert_eq!(calls.load(Ordering::SeqCst), 5);
    assert_eq!(r.attempts(), 5);
    assert!(r.value().is_none());
}

#[test]
fn retry_count_is_passed_to_condition() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    let mut w = quick()
        .until(move |a: Attempt| {
            log.lock().unwrap().push(a.retry_count);
            Ok(false)
        })
        .with_max_retry_count(Some(2));
    w.start().unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
}

#[test]
fn exception_budget_records_n_plus_one_faults() {
    let mut w = quick()
        .until(|_| -> anyhow::Result<bool> { anyhow::bail!("element not found") })
        .with_max_exception_count(Some(2));
    let r = w.start().unwrap();
    assert_eq!(r.status(), Status::TOO_MANY_EXCEPTIONS);
    assert_eq!(r.faults().len(), 3);
    assert_eq!(r.attempts(), 3);
    assert!(r
        .faults()
        .iter()
        .all(|f| f.to_string() == "element not found"));
}

#[test]
fn attempt_reports_faults_so_far() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    let mut w = quick()
        .until(move |a: Attempt| -> anyhow::Result<bool> {
            log.lock().unwrap().push(a.faults);
            anyhow::bail!("nope")
        })
        .with_max_exception_count(Some(1));
    w.start().unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
}

#[test]
fn zero_timeout_never_polls() {
    let mut w = quick()
        .until(|_| Ok(true))
        .with_timeout(Duration::ZERO);
    let r = w.start().unwrap();
    assert_eq!(r.status(), Status::TIMED_OUT);
    assert_eq!(r.attempts(), 0);
}

#[test]
fn clock_bound_wins_a_tie_with_retry_bound() {
    let mut w = quick()
        .until(|_| Ok(false))
        .with_timeout(Duration::from_millis(20))
        .with_time_gap(Duration::from_millis(40))
        .with_max_retry_count(Some(0));
    let r = w.start().unwrap();
    assert_eq!(r.attempts(), 1);
    assert_eq!(r.status(), Status::TIMED_OUT);
}

#[test]
fn unbounded_run_ends_on_value() {
    let (_, seen) = counter();
    let mut w = quick()
        .until(move |_| Ok(seen.fetch_add(1, Ordering::SeqCst) == 50))
        .without_timeout()
        .with_max_retry_count(None);
    let r = w.start().unwrap();
    assert_eq!(r.value(), Some(&true));
    assert_eq!(r.attempts(), 51);
}

// ============================================================================
// Abort
// ============================================================================

#[test]
fn abort_without_value() {
    let mut w = quick().until(|_| Ok(Outcome::<u32>::Aborted(None)));
    let r = w.start().unwrap();
    assert_eq!(r.status(), Status::CALLER_ABORTED_WITHOUT_VALUE);
    assert!(r.value().is_none());
}

#[test]
fn abort_with_value() {
    let mut w = quick().until(|a: Attempt| {
        Ok(if a.retry_count == 1 {
            Outcome::Aborted(Some("partial"))
        } else {
            Outcome::Pending
        })
    });
    let r = w.start().unwrap();
    assert_eq!(r.status(), Status::CALLER_ABORTED_WITH_VALUE);
    assert!(r.has_value());
    assert_eq!(r.value(), Some(&"partial"));
    assert_eq!(r.attempts(), 2);
}

#[test]
fn abort_error_bypasses_fault_budget() {
    let mut w = quick()
        .until(|_| Abort::err::<bool>("stop"))
        .with_max_exception_count(Some(0));
    let r = w.start().unwrap();
    assert_eq!(r.status(), Status::CALLER_ABORTED_WITHOUT_VALUE);
    assert!(r.faults().is_empty());
}

#[test]
fn abort_wrapped_in_context_is_still_honored() {
    use anyhow::Context;
    let mut w = quick().until(|_| -> anyhow::Result<bool> {
        Abort::err::<bool>("stop").context("while polling")
    });
    let r = w.start().unwrap();
    assert_eq!(r.status(), Status::CALLER_ABORTED_WITHOUT_VALUE);
}

// ============================================================================
// Error policies
// ============================================================================

fn always_fails(_: Attempt) -> anyhow::Result<bool> {
    anyhow::bail!("stale element")
}

#[test]
fn on_error_abort_stops_on_first_fault() {
    let mut w = quick()
        .until(always_fails)
        .with_max_exception_count(Some(10))
        .on_error()
        .abort();
    let r = w.start().unwrap();
    assert_eq!(r.status(), Status::CALLER_ABORTED_WITHOUT_VALUE);
    assert_eq!(r.faults().len(), 1);
}

#[test]
fn on_error_return_value_succeeds() {
    let mut w = quick().until(always_fails).on_error().return_value(false);
    let r = w.start().unwrap();
    assert_eq!(r.status(), Status::SUCCESS);
    assert_eq!(r.value(), Some(&false));
    assert_eq!(r.faults().len(), 1);
}

#[test]
fn on_error_return_with_derives_from_fault() {
    let mut w = quick()
        .until(|_| -> anyhow::Result<Option<String>> { anyhow::bail!("gone") })
        .on_error()
        .return_with(|f| format!("fallback after {f}"));
    let r = w.start().unwrap();
    assert_eq!(r.value().map(String::as_str), Some("fallback after gone"));
}

#[test]
fn on_error_call_observes_and_keeps_polling() {
    let (handled, h) = counter();
    let mut w = quick()
        .until(always_fails)
        .with_max_exception_count(Some(3))
        .on_error()
        .call(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("handler trouble is ignored")
        });
    let r = w.start().unwrap();
    assert_eq!(r.status(), Status::TOO_MANY_EXCEPTIONS);
    assert_eq!(r.faults().len(), 4);
    assert_eq!(handled.load(Ordering::SeqCst), 4);
}

#[test]
fn on_error_call_can_abort() {
    let mut w = quick()
        .until(always_fails)
        .on_error()
        .call(|f| {
            if f.to_string().contains("stale") {
                Abort::err("no point retrying")
            } else {
                Ok(())
            }
        });
    let r = w.start().unwrap();
    assert_eq!(r.status(), Status::CALLER_ABORTED_WITHOUT_VALUE);
    assert_eq!(r.attempts(), 1);
}

#[test]
fn faults_without_policy_are_tolerated_until_value() {
    let mut w = quick().until(|a: Attempt| {
        if a.retry_count < 2 {
            anyhow::bail!("not yet")
        }
        Ok(Some(a.retry_count))
    });
    let r = w.start().unwrap();
    assert_eq!(r.status(), Status::SUCCESS);
    assert_eq!(r.value(), Some(&2));
    assert_eq!(r.faults().len(), 2);
}

// ============================================================================
// Events
// ============================================================================

#[test]
fn events_fire_once_per_run_with_tags() {
    let facade = quick();
    let starting = Arc::new(Mutex::new(Vec::<RunEvent>::new()));
    let finished = Arc::new(Mutex::new(Vec::<RunEvent>::new()));
    let s = Arc::clone(&starting);
    facade.events().subscribe_starting(move |e| {
        s.lock().unwrap().push(e.clone());
        Ok(())
    });
    let f = Arc::clone(&finished);
    facade.events().subscribe_finished(move |e| {
        f.lock().unwrap().push(e.clone());
        Ok(())
    });

    let mut w = facade
        .until(|a: Attempt| Ok(a.retry_count == 2))
        .with_tag("control", "login-button");
    w.start().unwrap();

    let starting = starting.lock().unwrap();
    let finished = finished.lock().unwrap();
    assert_eq!(starting.len(), 1);
    assert_eq!(finished.len(), 1);
    assert_eq!(starting[0].status, Status::NONE);
    assert_eq!(starting[0].profile, "test");
    assert_eq!(
        starting[0].tags.get("control").map(String::as_str),
        Some("login-button")
    );
    assert_eq!(finished[0].status, Status::SUCCESS);
    assert_eq!(finished[0].attempts, 3);
}

#[test]
fn exception_event_sees_every_fault() {
    let facade = quick();
    let (seen, s) = counter();
    facade.events().subscribe_exception(move |_| {
        s.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    let mut w = facade.until(always_fails).with_max_exception_count(Some(2));
    w.start().unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 3);
}

#[test]
fn abort_from_exception_subscriber_ends_run() {
    let facade = quick();
    facade
        .events()
        .subscribe_exception(|_| Abort::err("subscriber gave up"));
    let mut w = facade.until(always_fails);
    let r = w.start().unwrap();
    assert_eq!(r.status(), Status::CALLER_ABORTED_WITHOUT_VALUE);
    assert_eq!(r.faults().len(), 1);
}

#[test]
fn failing_subscribers_do_not_disturb_run() {
    let facade = quick();
    facade.events().subscribe_starting(|_| anyhow::bail!("broken sink"));
    facade.events().subscribe_finished(|_| anyhow::bail!("broken sink"));
    facade
        .events()
        .subscribe_exception(|_| anyhow::bail!("broken sink"));
    let mut w = facade.until(|a: Attempt| {
        if a.retry_count == 0 {
            anyhow::bail!("first poll fails")
        }
        Ok(true)
    });
    let r = w.start().unwrap();
    assert_eq!(r.status(), Status::SUCCESS);
}

#[test]
fn facades_do_not_share_subscribers() {
    let a = quick();
    let b = quick();
    let (hits, h) = counter();
    a.events().subscribe_finished(move |_| {
        h.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    b.until(|_| Ok(true)).start().unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    a.until(|_| Ok(true)).start().unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Throw-on-failure and reuse
// ============================================================================

#[test]
fn throw_on_failure_carries_same_result() {
    let facade = quick();
    let plain = facade
        .until(always_fails)
        .with_max_exception_count(Some(1))
        .start()
        .unwrap();

    let failed = facade
        .until(always_fails)
        .with_max_exception_count(Some(1))
        .throw_on_failure()
        .start()
        .unwrap_err();

    assert_eq!(failed.status(), plain.status());
    assert_eq!(failed.result().attempts(), plain.attempts());
    assert_eq!(failed.result().faults().len(), plain.faults().len());
    assert!(failed.result().value().is_none());
    assert_eq!(failed.message(), "exceeded 1 accepted exceptions");
    assert_eq!(
        std::error::Error::source(&failed).map(|e| e.to_string()),
        Some("stale element".to_string())
    );
}

#[test]
fn custom_failure_message_takes_precedence() {
    let err = quick()
        .until(|_| Ok(false))
        .with_max_retry_count(Some(0))
        .throw_on_failure_with("login button never appeared")
        .start()
        .unwrap_err();
    assert_eq!(err.to_string(), "login button never appeared");
    assert_eq!(err.status(), Status::TOO_MANY_RETRIES);
}

#[test]
fn throw_on_failure_is_silent_on_success() {
    let r = quick()
        .until(|_| Ok(Some(1)))
        .throw_on_failure()
        .start()
        .unwrap();
    assert_eq!(r.value(), Some(&1));
}

#[test]
fn builder_runs_are_independent() {
    let (_, seen) = counter();
    let mut w = quick()
        .until(move |_| -> anyhow::Result<bool> {
            let n = seen.fetch_add(1, Ordering::SeqCst);
            if n % 2 == 0 {
                anyhow::bail!("even call")
            }
            Ok(true)
        })
        .with_max_exception_count(Some(5));
    let first = w.start().unwrap();
    let second = w.start().unwrap();
    assert_eq!(first.faults().len(), 1);
    assert_eq!(second.faults().len(), 1);
    assert_eq!(first.attempts(), 2);
    assert_eq!(second.attempts(), 2);
}

#[test]
fn action_maps_ok_to_true() {
    let (calls, seen) = counter();
    let mut w = quick()
        .action(move |_| {
            if seen.fetch_add(1, Ordering::SeqCst) < 2 {
                anyhow::bail!("click intercepted")
            }
            Ok(())
        })
        .with_max_retry_count(Some(5));
    let r = w.start().unwrap();
    assert_eq!(r.value(), Some(&true));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(r.faults().len(), 2);
}

// ============================================================================
// Cancellation
// ============================================================================

#[test]
fn cancelled_token_stops_before_first_poll() {
    let token = CancelToken::new();
    token.cancel();
    let r = quick()
        .until(|_| Ok(true))
        .with_cancel_token(token)
        .start()
        .unwrap();
    assert_eq!(r.status(), Status::CANCELLED_BY_TOKEN);
    assert_eq!(r.attempts(), 0);
}

#[test]
fn cancel_interrupts_pause() {
    let token = CancelToken::new();
    let remote = token.clone();
    let polls = Arc::new(AtomicUsize::new(0));
    let p = Arc::clone(&polls);
    let handle = std::thread::spawn(move || {
        while p.load(Ordering::SeqCst) == 0 {
            std::thread::sleep(Duration::from_millis(1));
        }
        remote.cancel();
    });

    let started = Instant::now();
    let seen = Arc::clone(&polls);
    let r = quick()
        .until(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(false)
        })
        .with_time_gap(Duration::from_secs(30))
        .with_timeout(Duration::from_secs(60))
        .with_cancel_token(token)
        .start()
        .unwrap();
    handle.join().unwrap();

    assert_eq!(r.status(), Status::CANCELLED_BY_TOKEN);
    assert!(started.elapsed() < Duration::from_secs(10));
}
