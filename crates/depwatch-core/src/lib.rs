//! depwatch-core — configuration and shared limits for depwatch.
//!
//! Everything here is plain data: the `depwatch.toml` schema and the
//! length/range limits that both the state store and the check runner
//! enforce.

pub mod config;
pub mod limits;

pub use config::{ApiConfig, CheckConfig, ConfigError, DepwatchConfig, MonitorConfig};
