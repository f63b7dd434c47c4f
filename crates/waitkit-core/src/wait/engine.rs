//! Blocking and async drivers over the shared [`RunContext`].

use std::future::Future;
use std::time::{Duration, Instant};

use crate::control::CancelToken;

use super::builder::Settings;
use super::error::WaitFailed;
use super::outcome::{Attempt, IntoOutcome};
use super::policy::{decide_async, decide_blocking};
use super::result::WaitResult;
use super::run::{Flow, RunContext};

pub(crate) fn drive_blocking<T, F, O>(
    settings: &mut Settings<T>,
    condition: &mut F,
) -> Result<WaitResult<T>, WaitFailed<T>>
where
    F: FnMut(Attempt) -> anyhow::Result<O>,
    O: IntoOutcome<Value = T>,
{
    let mut run = RunContext::begin(settings);
    while run.poll_allowed() {
        let attempt = run.next_attempt();
        match run.observe(condition(attempt)) {
            Flow::Stop => break,
            Flow::Continue => {}
            Flow::Fault(fault) => {
                let decision = decide_blocking(settings.policy.as_mut(), &fault);
                if run.settle_fault(decision) {
                    break;
                }
            }
        }
        run.advance();
        pause_blocking(run.time_gap(), run.cancel_token());
    }
    run.finish()
}

pub(crate) async fn drive_async<T, F, Fut, O>(
    settings: &mut Settings<T>,
    condition: &mut F,
) -> Result<WaitResult<T>, WaitFailed<T>>
where
    F: FnMut(Attempt) -> Fut,
    Fut: Future<Output = anyhow::Result<O>>,
    O: IntoOutcome<Value = T>,
{
    let abandon_at_deadline = settings.abandon_at_deadline;
    let mut run = RunContext::begin(settings);
    while run.poll_allowed() {
        let attempt = run.next_attempt();
        let cancel = run.cancel_token().cloned();
        let deadline = run.deadline().filter(|_| abandon_at_deadline);
        let returned = match race(condition(attempt), deadline, cancel.as_ref()).await {
            Raced::Finished(r) => r,
            Raced::Expired => {
                run.expire();
                break;
            }
            Raced::Cancelled => {
                run.cancel();
                break;
            }
        };
        match run.observe(returned) {
            Flow::Stop => break,
            Flow::Continue => {}
            Flow::Fault(fault) => {
                let decision = decide_async(settings.policy.as_mut(), &fault).await;
                if run.settle_fault(decision) {
                    break;
                }
            }
        }
        run.advance();
        pause_async(run.time_gap(), cancel.as_ref()).await;
    }
    run.finish()
}

fn pause_blocking(gap: Duration, cancel: Option<&CancelToken>) {
    if gap.is_zero() {
        return;
    }
    match cancel {
        Some(token) => {
            token.sleep(gap);
        }
        None => std::thread::sleep(gap),
    }
}

async fn pause_async(gap: Duration, cancel: Option<&CancelToken>) {
    if gap.is_zero() {
        tokio::task::yield_now().await;
        return;
    }
    tokio::select! {
        _ = tokio::time::sleep(gap) => {}
        _ = until_cancelled(cancel) => {}
    }
}

enum Raced<R> {
    Finished(R),
    Expired,
    Cancelled,
}

/// Await the condition, giving up on cancellation or, when given, at the
/// deadline. A condition that is already ready always wins.
async fn race<Fut: Future>(
    condition: Fut,
    deadline: Option<Instant>,
    cancel: Option<&CancelToken>,
) -> Raced<Fut::Output> {
    tokio::select! {
        biased;
        r = condition => Raced::Finished(r),
        _ = until_deadline(deadline) => Raced::Expired,
        _ = until_cancelled(cancel) => Raced::Cancelled,
    }
}

async fn until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}

async fn until_cancelled(cancel: Option<&CancelToken>) {
    match cancel {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}
