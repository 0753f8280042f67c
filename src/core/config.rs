//! # Configuration Module
//!
//! The gateway is configured once at startup and the resulting [`GatewayConfig`]
//! is never mutated afterwards; it is handed to the server state by value.
//!
//! ## Sources, lowest precedence first
//! - built-in defaults
//! - an optional YAML file (`GATEWAY_CONFIG_PATH`, default `config/gateway.yaml`)
//! - environment variables, among them `JAVA_API_URL`, `PORT` and `VERCEL`
//!
//! A `.env` file in the working directory is loaded by the binary before any of
//! this runs.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::core::error::{GatewayError, GatewayResult};
use crate::observability::config::LogConfig;

/// Default location of the optional configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/gateway.yaml";

/// Port used when neither the file nor `PORT` provides one
pub const DEFAULT_PORT: u16 = 4444;

/// Main gateway configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener and identity settings
    pub server: ServerConfig,

    /// The single upstream every route forwards to
    pub upstream: UpstreamConfig,

    /// Cross-origin policy applied to every route
    pub cors: CorsConfig,

    /// Log level and output format
    pub logging: LogConfig,
}

/// How the process is hosted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    /// The binary binds and serves its own listener
    #[default]
    Standalone,

    /// A hosting platform owns the listener and drives the application directly
    Managed,
}

impl DeploymentMode {
    /// Label reported by the health probe
    pub fn env_label(&self) -> &'static str {
        match self {
            DeploymentMode::Standalone => "local",
            DeploymentMode::Managed => "vercel",
        }
    }

    pub fn binds_listener(&self) -> bool {
        matches!(self, DeploymentMode::Standalone)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Name reported by the health probe
    pub service_name: String,
    pub bind_address: String,
    pub port: u16,
    pub mode: DeploymentMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            service_name: env!("CARGO_PKG_NAME").to_string(),
            bind_address: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            mode: DeploymentMode::Standalone,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> GatewayResult<SocketAddr> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| GatewayError::config(format!("Invalid bind address: {}", e)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the upstream API; `/api` and `/auth` are appended to it
    pub base_url: Option<Url>,

    /// Upper bound on a single upstream call. Unset means wait indefinitely.
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl UpstreamConfig {
    /// The validated base URL
    pub fn base_url(&self) -> GatewayResult<&Url> {
        let url = self
            .base_url
            .as_ref()
            .ok_or_else(|| GatewayError::config("Upstream base URL is not set (JAVA_API_URL)"))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(GatewayError::config(format!(
                "Upstream base URL must use http or https, got '{}'",
                url.scheme()
            )));
        }
        if url.cannot_be_a_base() {
            return Err(GatewayError::config(format!(
                "Upstream base URL cannot be used as a base: {}",
                url
            )));
        }
        Ok(url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,

    /// Allowed origins (use "*" for any origin)
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub allow_credentials: bool,

    /// Max age for preflight requests (seconds)
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: Vec::new(),
            allowed_methods: ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            allowed_headers: vec!["Content-Type".to_string(), "Authorization".to_string()],
            allow_credentials: true,
            max_age: 3600,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from the optional file, then the process environment.
    pub async fn load() -> GatewayResult<Self> {
        let path = std::env::var("GATEWAY_CONFIG_PATH")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let mut config = if Path::new(&path).exists() {
            Self::load_from_file(&path).await?
        } else {
            tracing::debug!(path = %path, "No configuration file, using defaults");
            Self::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file without applying the environment
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> GatewayResult<Self> {
        let content = tokio::fs::read_to_string(path.as_ref()).await.map_err(|e| {
            GatewayError::config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> GatewayResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> GatewayResult<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// `VERCEL` follows the hosting platform's convention: any non-empty value
    /// switches to managed mode.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> GatewayResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("JAVA_API_URL") {
            let parsed = Url::parse(url.trim())
                .map_err(|e| GatewayError::config(format!("Invalid JAVA_API_URL: {}", e)))?;
            self.upstream.base_url = Some(parsed);
        }

        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|e| GatewayError::config(format!("Invalid PORT: {}", e)))?;
        }

        if lookup("VERCEL").is_some_and(|v| !v.is_empty()) {
            self.server.mode = DeploymentMode::Managed;
        }

        if let Some(addr) = lookup("GATEWAY_BIND_ADDRESS") {
            self.server.bind_address = addr;
        }

        if let Some(name) = lookup("GATEWAY_SERVICE_NAME") {
            self.server.service_name = name;
        }

        if let Some(timeout) = lookup("GATEWAY_UPSTREAM_TIMEOUT") {
            let timeout = humantime::parse_duration(timeout.trim()).map_err(|e| {
                GatewayError::config(format!("Invalid GATEWAY_UPSTREAM_TIMEOUT: {}", e))
            })?;
            self.upstream.timeout = Some(timeout);
        }

        if let Some(origins) = lookup("GATEWAY_CORS_ORIGINS") {
            self.cors.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(level) = lookup("GATEWAY_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Some(format) = lookup("GATEWAY_LOG_FORMAT") {
            self.logging.format = format.parse()?;
        }

        Ok(())
    }

    /// Validate the assembled configuration
    pub fn validate(&self) -> GatewayResult<()> {
        self.upstream.base_url()?;

        if self.server.service_name.trim().is_empty() {
            return Err(GatewayError::config("Service name cannot be empty"));
        }

        if self.server.mode.binds_listener() {
            self.server.socket_addr()?;
        }

        if self.upstream.timeout.is_some_and(|t| t.is_zero()) {
            return Err(GatewayError::config("Upstream timeout must be greater than zero"));
        }

        Ok(())
    }
}
