//! CLI for the waitkit wait/retry engine.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use waitkit_core::config;
use waitkit_core::wait::Builder;

use commands::{run_config, run_exec, run_file, run_port};

/// Top-level CLI for waitkit.
#[derive(Debug, Parser)]
#[command(name = "waitkit")]
#[command(about = "waitkit: poll until a condition holds, or retry a command", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub limits: Limits,

    #[command(subcommand)]
    pub command: CliCommand,
}

/// Overrides applied on top of the configured profile defaults.
#[derive(Debug, Clone, Default, Args)]
pub struct Limits {
    /// Give up after this many milliseconds.
    #[arg(long, global = true, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Pause between attempts, in milliseconds.
    #[arg(long, global = true, value_name = "MS")]
    pub gap_ms: Option<u64>,

    /// Highest retry counter that may still run.
    #[arg(long, global = true, value_name = "N")]
    pub retries: Option<u32>,
}

impl Limits {
    pub fn apply<T, C>(&self, builder: Builder<T, C>) -> Builder<T, C> {
        let mut builder = builder;
        if let Some(ms) = self.timeout_ms {
            builder = builder.with_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = self.gap_ms {
            builder = builder.with_time_gap(Duration::from_millis(ms));
        }
        if let Some(n) = self.retries {
            builder = builder.with_max_retry_count(Some(n));
        }
        builder
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Wait until a path exists (or, with --gone, no longer exists).
    File {
        /// Path to watch.
        path: PathBuf,

        /// Wait for the path to disappear instead.
        #[arg(long)]
        gone: bool,
    },

    /// Wait until a TCP port accepts connections.
    Port {
        /// Address such as 127.0.0.1:8080 or localhost:5432.
        addr: String,
    },

    /// Run a command, retrying while it exits non-zero.
    Exec {
        /// Program and its arguments.
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        cmd: Vec<String>,
    },

    /// Print the config file path and the effective profiles.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        cfg.apply();

        match cli.command {
            CliCommand::File { path, gone } => run_file(&path, gone, &cli.limits).await?,
            CliCommand::Port { addr } => run_port(&addr, &cli.limits).await?,
            CliCommand::Exec { cmd } => run_exec(&cmd, &cli.limits).await?,
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
