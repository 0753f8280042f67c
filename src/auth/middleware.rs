//! # Token Extraction Middleware
//!
//! Pulls the caller's bearer credential out of the `Authorization` header and
//! stores it in the request extensions as a [`CarriedToken`]. Nothing is
//! verified: a missing or malformed header degrades to the anonymous (empty)
//! token and the request carries on.
//!
//! Requests under the authentication prefix are left untouched because they
//! are the ones obtaining a token in the first place.

use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::core::types::CarriedToken;

/// Paths starting with this prefix never get a carried token
pub const AUTH_PATH_PREFIX: &str = "/auth";

/// Scheme prefix stripped from the header value (case-sensitive, one space)
pub const BEARER_PREFIX: &str = "Bearer ";

/// Extract the bearer token from request headers.
///
/// Returns the empty token when the header is absent, not valid UTF-8 or not
/// of the form `Bearer <value>`.
pub fn extract_token(headers: &HeaderMap) -> CarriedToken {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .map(CarriedToken::new)
        .unwrap_or_else(CarriedToken::anonymous)
}

/// Check if path is excluded from token extraction.
///
/// This is a plain string prefix test, so `/authors` is excluded as well.
pub fn is_auth_path(path: &str) -> bool {
    path.starts_with(AUTH_PATH_PREFIX)
}

/// Axum middleware function attaching the carried token
pub async fn token_middleware(mut request: Request, next: Next) -> Response {
    if !is_auth_path(request.uri().path()) {
        let token = extract_token(request.headers());
        tracing::trace!(token = %token, "Carried token attached");
        request.extensions_mut().insert(token);
    }

    next.run(request).await
}
