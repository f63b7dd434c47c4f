//! `waitkit config` – show where the config lives and what it contains.

use anyhow::Result;
use waitkit_core::config::{self, WaitkitConfig};

pub fn run_config(cfg: &WaitkitConfig) -> Result<()> {
    println!("# {}", config::config_path()?.display());
    print!("{}", cfg.to_toml()?);
    Ok(())
}
