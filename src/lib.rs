//! # Bearer Gateway - Core Library Crate
//!
//! A thin HTTP gateway in front of a single upstream REST API. Every inbound
//! call is mapped to exactly one upstream call; the caller's bearer token is
//! carried across unchanged and the upstream JSON is relayed back as-is.
//!
//! The gateway owns no data and performs no authentication of its own. The
//! only local decision it makes is rejecting malformed create requests before
//! they reach the upstream.
//!
//! ## Request flow
//!
//! 1. [`auth`] attaches the carried token (skipped under `/auth`)
//! 2. [`routing`] picks the first matching route from an ordered table
//! 3. [`validation`] checks create bodies against a static model schema
//! 4. [`upstream`] makes the single upstream call
//! 5. [`core::error`](crate::core::error) maps any failure to a status code and JSON body

/// Error types, configuration and per-request data
pub mod core;

/// Carried-token extraction middleware
pub mod auth;

/// Ordered route table and upstream action selection
pub mod routing;

/// Static model schemas and the field validator
pub mod validation;

/// HTTP client forwarding calls to the upstream API
pub mod upstream;

/// Application assembly and listener
pub mod gateway;

/// Logging setup and the health payload
pub mod observability;

/// Main error type used throughout the gateway
pub use crate::core::error::{FieldError, GatewayError, GatewayResult};

/// Immutable configuration built once at startup
pub use crate::core::config::{DeploymentMode, GatewayConfig};

pub use crate::core::types::CarriedToken;
pub use routing::router::{Router, RouterBuilder, UpstreamAction};
pub use gateway::server::{GatewayServer, ServerState};
