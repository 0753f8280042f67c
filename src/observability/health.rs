//! # Health Reporting
//!
//! Liveness payload served at `/api/health`. It never touches the upstream and
//! never looks at the caller's credentials.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::core::config::DeploymentMode;

/// Body of the liveness probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub ok: bool,

    /// Configured service name
    pub name: String,

    /// `vercel` when a hosting platform owns the listener, `local` otherwise
    pub env: String,

    /// RFC 3339 UTC timestamp with millisecond precision
    pub time: String,
}

impl HealthReport {
    pub fn new(name: &str, mode: DeploymentMode) -> Self {
        Self {
            ok: true,
            name: name.to_string(),
            env: mode.env_label().to_string(),
            time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}
