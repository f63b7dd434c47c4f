//! `waitkit file <path> [--gone]` – wait for a path to appear or disappear.

use anyhow::Result;
use std::path::Path;
use waitkit_core::wait;

use crate::cli::Limits;

pub async fn run_file(path: &Path, gone: bool, limits: &Limits) -> Result<()> {
    let (wanted, message) = if gone {
        (false, format!("{} still exists", path.display()))
    } else {
        (true, format!("{} did not appear", path.display()))
    };

    let mut waiting = limits
        .apply(wait::wait().until(|_| Ok(path.exists() == wanted)))
        .with_tag("path", path.display().to_string())
        .throw_on_failure_with(message);
    let result = waiting.start_async().await?;

    let state = if gone { "gone" } else { "present" };
    println!(
        "{} is {state} after {} attempt(s), {:.2}s",
        path.display(),
        result.attempts(),
        result.elapsed().as_secs_f64()
    );
    Ok(())
}
