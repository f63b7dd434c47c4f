//! End-to-end scenarios through the public API.

mod common;

use std::fs;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;
use waitkit_core::wait::{Abort, Status};

#[test]
fn counter_becomes_non_zero_on_fourth_call() {
    let calls = Arc::new(AtomicU32::new(0));
    let seen = Arc::clone(&calls);
    let mut w = common::facade(Duration::from_secs(5), Duration::from_millis(10)).until(move |_| {
        let n = seen.fetch_add(1, Ordering::SeqCst) + 1;
        let value = if n >= 4 { 1 } else { 0 };
        Ok(Some(value).filter(|v| *v != 0))
    });

    let r = w.start().unwrap();
    assert_eq!(r.status(), Status::SUCCESS);
    assert_eq!(r.value(), Some(&1));
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[test]
fn never_ready_times_out() {
    let mut w = common::facade(Duration::from_millis(200), Duration::from_millis(50))
        .until(|_| Ok(Some(0).filter(|v: &i32| *v != 0)));

    let r = w.start().unwrap();
    assert_eq!(r.status(), Status::TIMED_OUT);
    assert!(r.value().is_none());
    assert!(r.elapsed() >= Duration::from_millis(200));
    assert!(r.elapsed() < Duration::from_secs(2), "elapsed {:?}", r.elapsed());
}

#[test]
fn always_throwing_exceeds_fault_budget() {
    let mut w = common::facade(Duration::from_secs(5), Duration::ZERO)
        .until(|_| -> anyhow::Result<bool> { anyhow::bail!("no such window") })
        .with_max_exception_count(Some(2));

    let r = w.start().unwrap();
    assert_eq!(r.status(), Status::TOO_MANY_EXCEPTIONS);
    assert_eq!(r.faults().len(), 3);
}

#[test]
fn action_raising_abort_stops() {
    let mut w = common::facade(Duration::from_secs(5), Duration::ZERO)
        .action(|_| Err(Abort::new("stop").into()));

    let r = w.start().unwrap();
    assert_eq!(r.status(), Status::CALLER_ABORTED_WITHOUT_VALUE);
    assert!(r.value().is_none());
    assert!(r.faults().is_empty());
}

#[test]
fn resource_appears_on_third_poll() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("export.csv");
    let calls = Arc::new(AtomicU32::new(0));
    let seen = Arc::clone(&calls);
    let target = path.clone();

    let mut w = common::facade(Duration::from_secs(5), Duration::from_millis(5))
        .until(move |_| {
            if seen.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
                fs::write(&target, b"id,name\n")?;
            }
            Ok(target.exists())
        })
        .with_max_retry_count(Some(5));

    let r = w.start().unwrap();
    assert_eq!(r.value(), Some(&true));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(path.exists());
}

#[test]
fn retry_facade_defaults_bound_attempts() {
    let calls = Arc::new(AtomicU32::new(0));
    let seen = Arc::clone(&calls);
    let mut w = waitkit_core::wait::retry().action(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("flaky click")
    });

    let r = w.start().unwrap();
    let retries = w.options().max_retry_count.unwrap_or_default();
    assert_eq!(r.status(), Status::TOO_MANY_RETRIES);
    assert_eq!(calls.load(Ordering::SeqCst), retries + 1);
}
