//! # Router Module
//!
//! Maps an inbound method and path to the single upstream action it forwards to.
//!
//! Routes are kept in registration order and the first one whose method and
//! pattern both match wins. Several patterns overlap (`/api/:fmodel/:smodel`
//! and `/api/:model/:id` accept exactly the same paths), so the order in
//! [`Router::gateway_routes`] is part of the gateway's behaviour.
//!
//! Each route owns a one-entry `matchit` radix tree that does the segment
//! matching and parameter capture for its pattern; one shared tree cannot be
//! used because `matchit` rejects overlapping patterns with different
//! parameter names.

use crate::core::error::{GatewayError, GatewayResult};
use crate::core::types::PathParams;
use axum::http::Method;
use matchit::Router as RadixRouter;
use std::fmt;

/// What the gateway does upstream for a matched route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpstreamAction {
    /// Exchange credentials for a token; sent without a bearer header
    Authenticate,
    ListAll,
    CurrentUser,
    GetById,
    GetMember,
    /// Validated against the model schema before forwarding
    Create,
    Update,
    UpdateAccount,
    Delete,
}

impl UpstreamAction {
    /// Whether the carried token is attached to the upstream call
    pub fn carries_token(&self) -> bool {
        !matches!(self, UpstreamAction::Authenticate)
    }

    /// Whether the inbound JSON body is forwarded
    pub fn forwards_body(&self) -> bool {
        matches!(
            self,
            UpstreamAction::Authenticate
                | UpstreamAction::Create
                | UpstreamAction::Update
                | UpstreamAction::UpdateAccount
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            UpstreamAction::Authenticate => "authenticate",
            UpstreamAction::ListAll => "list_all",
            UpstreamAction::CurrentUser => "current_user",
            UpstreamAction::GetById => "get_by_id",
            UpstreamAction::GetMember => "get_member",
            UpstreamAction::Create => "create",
            UpstreamAction::Update => "update",
            UpstreamAction::UpdateAccount => "update_account",
            UpstreamAction::Delete => "delete",
        }
    }
}

impl fmt::Display for UpstreamAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Route definition with pattern, method and action
pub struct Route {
    /// Path pattern (e.g., "/api/:model/:id")
    pub pattern: String,
    pub method: Method,
    pub action: UpstreamAction,
    matcher: RadixRouter<()>,
}

impl Route {
    pub fn new(method: Method, pattern: &str, action: UpstreamAction) -> GatewayResult<Self> {
        let mut matcher = RadixRouter::new();
        matcher
            .insert(pattern, ())
            .map_err(|e| GatewayError::config(format!("Failed to add route {}: {}", pattern, e)))?;

        Ok(Self {
            pattern: pattern.to_string(),
            method,
            action,
            matcher,
        })
    }

    /// Match a normalized path, returning the decoded parameters
    fn capture(&self, path: &str) -> Option<PathParams> {
        let matched = self.matcher.at(path).ok()?;
        Some(
            matched
                .params
                .iter()
                .map(|(key, value)| (key, decode_segment(value)))
                .collect(),
        )
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .field("action", &self.action)
            .finish()
    }
}

/// Result of a successful route lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub pattern: String,
    pub action: UpstreamAction,
    pub params: PathParams,
}

impl RouteMatch {
    /// A parameter the matched pattern declares
    pub fn required_param(&self, name: &str) -> GatewayResult<&str> {
        self.params.get(name).ok_or_else(|| {
            GatewayError::internal(format!(
                "Route {} did not capture parameter '{}'",
                self.pattern, name
            ))
        })
    }
}

/// Ordered route table
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// The gateway's forwarding table, in the order routes must be tried
    pub fn gateway_routes() -> GatewayResult<Self> {
        RouterBuilder::new()
            .post("/auth/:model", UpstreamAction::Authenticate)
            .get("/api/:model", UpstreamAction::ListAll)
            .get("/api/:fmodel/:smodel", UpstreamAction::CurrentUser)
            .get("/api/:model/:id", UpstreamAction::GetById)
            .get("/api/:fmodel/:smodel/:id", UpstreamAction::GetMember)
            .post("/api/:model", UpstreamAction::Create)
            .put("/api/:model/:id", UpstreamAction::Update)
            .put("/api/:fmodel", UpstreamAction::UpdateAccount)
            .delete("/api/:model/:id", UpstreamAction::Delete)
            .build()
    }

    /// Append a route; it is tried after every route already registered
    pub fn add_route(&mut self, route: Route) {
        self.routes.push(route);
    }

    /// Find the first route matching the method and path.
    ///
    /// `HEAD` is answered by the `GET` routes.
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let path = normalize_path(path);
        let method = if *method == Method::HEAD { &Method::GET } else { method };

        self.routes
            .iter()
            .filter(|route| route.method == *method)
            .find_map(|route| {
                route.capture(path).map(|params| RouteMatch {
                    pattern: route.pattern.clone(),
                    action: route.action,
                    params,
                })
            })
    }

    /// Registered routes in match order
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

/// A single trailing slash is ignored when matching
fn normalize_path(path: &str) -> &str {
    if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    }
}

/// Percent-decode a captured segment, keeping it raw if it is not valid UTF-8
fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

/// Builder for creating routers with fluent API
#[derive(Default)]
pub struct RouterBuilder {
    router: Router,
    error: Option<GatewayError>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, method: Method, pattern: &str, action: UpstreamAction) -> Self {
        if self.error.is_none() {
            match Route::new(method, pattern, action) {
                Ok(route) => self.router.add_route(route),
                Err(e) => self.error = Some(e),
            }
        }
        self
    }

    pub fn get(self, pattern: &str, action: UpstreamAction) -> Self {
        self.route(Method::GET, pattern, action)
    }

    pub fn post(self, pattern: &str, action: UpstreamAction) -> Self {
        self.route(Method::POST, pattern, action)
    }

    pub fn put(self, pattern: &str, action: UpstreamAction) -> Self {
        self.route(Method::PUT, pattern, action)
    }

    pub fn delete(self, pattern: &str, action: UpstreamAction) -> Self {
        self.route(Method::DELETE, pattern, action)
    }

    /// Build the router, failing on the first invalid pattern
    pub fn build(self) -> GatewayResult<Router> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.router),
        }
    }
}
