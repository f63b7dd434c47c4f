//! `waitkit exec -- <cmd>...` – run a command until it exits successfully.

use anyhow::{bail, Context, Result};
use tokio::process::Command;
use waitkit_core::wait;

use crate::cli::Limits;

async fn run_once(program: String, args: Vec<String>, retry: u32) -> Result<()> {
    tracing::debug!(%program, retry, "running command");
    let status = Command::new(&program)
        .args(&args)
        .status()
        .await
        .with_context(|| format!("failed to spawn {program}"))?;
    if !status.success() {
        bail!("{program} exited with {status}");
    }
    Ok(())
}

pub async fn run_exec(cmd: &[String], limits: &Limits) -> Result<()> {
    let Some((program, args)) = cmd.split_first() else {
        bail!("no command given");
    };

    let mut retrying = limits
        .apply(wait::retry().action_async(|attempt| {
            run_once(program.clone(), args.to_vec(), attempt.retry_count)
        }))
        .with_tag("command", program.as_str())
        .throw_on_failure_with(format!("{program} did not succeed"));
    let result = retrying.start_async().await?;

    println!(
        "{program} succeeded after {} attempt(s), {:.2}s",
        result.attempts(),
        result.elapsed().as_secs_f64()
    );
    Ok(())
}
