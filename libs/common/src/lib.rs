//! Shared building blocks for tracker bridge services
//!
//! - layered configuration loading (file + environment)
//! - logging bootstrap
//! - shutdown signal handling

pub mod config;
pub mod logging;
pub mod shutdown;

pub use config::{load_config, load_config_from_file};
pub use logging::{init_logging, LogConfig, LogFormat};
pub use shutdown::{wait_for_shutdown, ShutdownSignal};
