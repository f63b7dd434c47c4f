//! CLI command handlers, one file per command.

mod config;
mod exec;
mod file;
mod port;

pub use config::run_config;
pub use exec::run_exec;
pub use file::run_file;
pub use port::run_port;
