use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::core::error::GatewayError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive, used when `RUST_LOG` is not set
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Text,
}

impl FromStr for LogFormat {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" | "pretty" => Ok(LogFormat::Text),
            other => Err(GatewayError::config(format!("Unknown log format: {}", other))),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "bearer_gateway=info,tower_http=info".to_string(),
            format: LogFormat::Json,
        }
    }
}
