pub mod config;
pub mod control;
pub mod logging;
pub mod wait;
