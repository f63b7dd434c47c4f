use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::wait::{self, Options};

/// One default-options profile as stored in config.toml.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Clock bound in milliseconds; omit for no timeout.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Pause between polls in milliseconds.
    pub time_gap_ms: u64,
    /// Highest retry counter that may still poll; omit for unlimited.
    #[serde(default)]
    pub max_retry_count: Option<u32>,
    /// Faults tolerated before giving up; omit for unlimited.
    #[serde(default)]
    pub max_accepted_exceptions: Option<u32>,
    #[serde(default = "default_trace_exceptions")]
    pub trace_exceptions: bool,
}

fn default_trace_exceptions() -> bool {
    true
}

impl ProfileConfig {
    pub fn to_options(&self) -> Options {
        let mut o = Options {
            trace_exceptions: self.trace_exceptions,
            max_accepted_exceptions: self.max_accepted_exceptions,
            max_retry_count: self.max_retry_count,
            timeout: None,
            time_gap: Default::default(),
        };
        o.set_timeout_ms(self.timeout_ms);
        o.set_time_gap_ms(self.time_gap_ms);
        o
    }
}

impl From<&Options> for ProfileConfig {
    fn from(o: &Options) -> Self {
        Self {
            timeout_ms: o.timeout_ms(),
            time_gap_ms: o.time_gap_ms(),
            max_retry_count: o.max_retry_count,
            max_accepted_exceptions: o.max_accepted_exceptions,
            trace_exceptions: o.trace_exceptions,
        }
    }
}

/// Global configuration loaded from `~/.config/waitkit/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitkitConfig {
    /// Defaults for the `wait` facade.
    pub wait: ProfileConfig,
    /// Defaults for the `retry` facade.
    pub retry: ProfileConfig,
}

impl Default for WaitkitConfig {
    fn default() -> Self {
        Self {
            wait: ProfileConfig::from(&Options::wait_profile()),
            retry: ProfileConfig::from(&Options::retry_profile()),
        }
    }
}

impl WaitkitConfig {
    /// Serialize as the on-disk TOML form.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Install both profiles as the defaults of the global facades.
    pub fn apply(&self) {
        wait::wait().set_defaults(self.wait.to_options());
        wait::retry().set_defaults(self.retry.to_options());
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("waitkit")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<WaitkitConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = WaitkitConfig::default();
        let toml = default_cfg.to_toml()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

pub fn load_from_path(path: &Path) -> Result<WaitkitConfig> {
    let data = fs::read_to_string(path)?;
    let cfg: WaitkitConfig = toml::from_str(&data)?;
    Ok(cfg)
}
