//! # Error Handling Module
//!
//! This module defines every failure the gateway can produce using the `thiserror` crate,
//! together with the single place where those failures are mapped to HTTP responses.
//!
//! ## Failure Kinds
//!
//! The gateway only ever fails in a handful of ways:
//! - the caller sent something we reject locally (unknown model, invalid fields, bad JSON)
//! - the caller asked for a route we do not forward
//! - the upstream call failed (network error, non-2xx status, malformed body)
//! - the process could not start (configuration)
//!
//! Handlers never build error responses themselves. They return `GatewayResult<T>` and the
//! `IntoResponse` implementation at the bottom of this file picks the status code and body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Main result type used throughout the gateway
pub type GatewayResult<T> = Result<T, GatewayError>;

/// A single rejected field from the field validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Offending key, `key[index]` for array items, or `value` for the body itself
    pub field: String,

    /// Human readable message with quote characters stripped
    pub message: String,
}

impl FieldError {
    pub fn new<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self {
            field: field.into(),
            message: message.into().replace('"', ""),
        }
    }
}

/// Comprehensive error types for the gateway
///
/// Each variant represents a different category of error that can occur.
/// The `#[error("...")]` attribute from `thiserror` implements `Display`.
#[derive(Debug, Error, Clone)]
pub enum GatewayError {
    /// Configuration-related errors (missing upstream URL, invalid port, unreadable file)
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The model named in a create request has no schema
    #[error("Invalid model type: {model}")]
    UnknownModel { model: String },

    /// A create request body violated its model schema
    #[error("Validation failed with {} error(s)", errors.len())]
    ValidationFailed { errors: Vec<FieldError> },

    /// The inbound request body could not be parsed as JSON
    #[error("Malformed request body: {reason}")]
    MalformedBody { reason: String },

    /// No forwarding route matches the method and path
    #[error("Cannot {method} {path}")]
    RouteNotFound { method: String, path: String },

    /// The upstream call failed. `payload` holds the upstream's error body (JSON, or text as a string).
    #[error("Upstream request failed: {description}")]
    Upstream {
        description: String,
        payload: Option<Value>,
    },

    /// Internal server errors for unexpected failures
    #[error("Internal server error: {message}")]
    Internal { message: String },

    /// YAML parsing errors for configuration files
    #[error("YAML error: {message}")]
    Yaml { message: String },
}

impl GatewayError {
    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error with a custom message
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn unknown_model<S: Into<String>>(model: S) -> Self {
        Self::UnknownModel {
            model: model.into(),
        }
    }

    pub fn malformed_body<S: Into<String>>(reason: S) -> Self {
        Self::MalformedBody {
            reason: reason.into(),
        }
    }

    pub fn route_not_found<M: Into<String>, P: Into<String>>(method: M, path: P) -> Self {
        Self::RouteNotFound {
            method: method.into(),
            path: path.into(),
        }
    }

    /// Create an upstream failure without a payload (network error, unreadable body)
    pub fn upstream<S: Into<String>>(description: S) -> Self {
        Self::Upstream {
            description: description.into(),
            payload: None,
        }
    }

    /// Create an upstream failure carrying the upstream's error body
    pub fn upstream_with_payload<S: Into<String>>(description: S, payload: Value) -> Self {
        Self::Upstream {
            description: description.into(),
            payload: Some(payload),
        }
    }

    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UnknownModel { .. } => StatusCode::BAD_REQUEST,
            Self::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            Self::MalformedBody { .. } => StatusCode::BAD_REQUEST,
            Self::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Yaml { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a string representation of the error type for logs
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration_error",
            Self::UnknownModel { .. } => "unknown_model",
            Self::ValidationFailed { .. } => "validation_failed",
            Self::MalformedBody { .. } => "malformed_body",
            Self::RouteNotFound { .. } => "route_not_found",
            Self::Upstream { .. } => "upstream_error",
            Self::Internal { .. } => "internal_error",
            Self::Yaml { .. } => "yaml_error",
        }
    }

    /// Build the JSON body returned to the caller
    pub fn response_body(&self) -> Value {
        match self {
            Self::UnknownModel { .. } => json!({ "message": "Invalid model type" }),
            Self::ValidationFailed { errors } => json!({ "errors": errors }),
            Self::Upstream {
                description,
                payload: Some(payload),
            } => {
                let message = payload
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or(description.as_str());
                json!({ "message": message, "upstream": payload })
            }
            Self::Upstream {
                description,
                payload: None,
            } => json!({ "message": description }),
            Self::MalformedBody { reason } => json!({ "message": reason }),
            other => json!({ "message": other.to_string() }),
        }
    }
}

impl From<serde_yaml::Error> for GatewayError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml {
            message: err.to_string(),
        }
    }
}

/// Transport-level client failures. Status failures are built by the forwarder
/// because they need the upstream body.
impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        Self::upstream(err.to_string())
    }
}

/// Convert `GatewayError` into an HTTP response
///
/// This is the only place failure kinds are mapped to status codes, so route
/// handlers can stay as plain `?` chains.
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error_type = self.error_type(), error = %self, "Request failed");
        } else {
            tracing::debug!(error_type = self.error_type(), error = %self, "Request rejected");
        }

        (status, Json(self.response_body())).into_response()
    }
}
