// Logging configuration
pub mod config;

// Structured logging
pub mod logging;

// Liveness reporting
pub mod health;

pub use config::{LogConfig, LogFormat};
pub use health::HealthReport;
pub use logging::init_logging;
