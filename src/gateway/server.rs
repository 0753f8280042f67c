//! # HTTP Server Module
//!
//! Assembles the axum application and runs it.
//!
//! The application has three kinds of routes:
//! - `GET /api/health` and `GET /`, answered locally
//! - everything else, handed to the forwarding handler which consults the
//!   ordered route table and makes one upstream call
//!
//! Every request passes through the token extraction middleware first (except
//! the authentication paths), then request-id, tracing and CORS layers.

use crate::auth::middleware::token_middleware;
use crate::core::config::{CorsConfig, GatewayConfig};
use crate::core::error::{GatewayError, GatewayResult};
use crate::core::types::CarriedToken;
use crate::observability::health::HealthReport;
use crate::routing::router::{Router, UpstreamAction};
use crate::upstream::client::{UpstreamClient, UpstreamRequest};
use crate::validation::validator::validate_record;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderName, HeaderValue, Method, Uri},
    middleware,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router as AxumRouter,
};
use serde_json::{Map, Value};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, instrument, warn};

/// Plain-text body served at `/`
pub const GREETING: &str = "Gateway deployed successfully";

/// Shared server state
#[derive(Clone)]
pub struct ServerState {
    /// Ordered forwarding table
    pub router: Arc<Router>,

    /// Client bound to the upstream base URL
    pub upstream: Arc<UpstreamClient>,

    /// Configuration fixed at startup
    pub config: Arc<GatewayConfig>,
}

impl ServerState {
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        let upstream = UpstreamClient::new(&config.upstream)?;
        let router = Router::gateway_routes()?;

        Ok(Self {
            router: Arc::new(router),
            upstream: Arc::new(upstream),
            config: Arc::new(config),
        })
    }
}

/// The assembled gateway application
pub struct GatewayServer {
    state: ServerState,
    app: AxumRouter,
}

impl GatewayServer {
    /// Create a server from validated configuration
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        config.validate()?;
        let state = ServerState::new(config)?;
        let app = Self::build_app(state.clone());
        Ok(Self { state, app })
    }

    fn build_app(state: ServerState) -> AxumRouter {
        let cors = state.config.cors.clone();

        let mut app = AxumRouter::new()
            .route("/api/health", get(health_check).fallback(forward_request))
            .route("/", get(root_greeting).fallback(forward_request))
            .fallback(forward_request)
            .with_state(state)
            .layer(middleware::from_fn(token_middleware));

        app = app.layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        );

        if let Some(cors_layer) = build_cors_layer(&cors) {
            app = app.layer(cors_layer);
            info!("CORS enabled with {} allowed origins", cors.allowed_origins.len());
        }

        app
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.state.config
    }

    /// Hand the application to a host that owns the listener
    pub fn into_router(self) -> AxumRouter {
        self.app
    }

    pub fn bind_addr(&self) -> GatewayResult<SocketAddr> {
        self.state.config.server.socket_addr()
    }

    /// Bind the configured address and serve until `shutdown` resolves
    #[instrument(skip(self, shutdown))]
    pub async fn start<F>(self, shutdown: F) -> GatewayResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.bind_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::internal(format!("Failed to bind gateway server to {}: {}", addr, e)))?;

        info!("Gateway HTTP server listening on {}", addr);
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> GatewayResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| GatewayError::internal(format!("Gateway server error: {}", e)))
    }
}

/// Build the CORS layer, or `None` when CORS is disabled
pub fn build_cors_layer(config: &CorsConfig) -> Option<CorsLayer> {
    if !config.enabled {
        return None;
    }

    let mut cors_layer = CorsLayer::new();

    // A wildcard cannot be combined with credentials, so mirror the caller's origin instead.
    if config.allowed_origins.iter().any(|o| o == "*") {
        cors_layer = if config.allow_credentials {
            cors_layer.allow_origin(AllowOrigin::mirror_request())
        } else {
            cors_layer.allow_origin(Any)
        };
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        cors_layer = cors_layer.allow_origin(origins);
    }

    let methods: Vec<Method> = config
        .allowed_methods
        .iter()
        .filter_map(|m| m.parse().ok())
        .collect();
    cors_layer = cors_layer.allow_methods(methods);

    let headers: Vec<HeaderName> = config
        .allowed_headers
        .iter()
        .filter_map(|h| h.parse().ok())
        .collect();
    cors_layer = cors_layer.allow_headers(headers);

    cors_layer = cors_layer.allow_credentials(config.allow_credentials);
    cors_layer = cors_layer.max_age(Duration::from_secs(config.max_age));

    Some(cors_layer)
}

/// Liveness probe; ignores credentials entirely
async fn health_check(State(state): State<ServerState>) -> Json<HealthReport> {
    Json(HealthReport::new(
        &state.config.server.service_name,
        state.config.server.mode,
    ))
}

async fn root_greeting() -> &'static str {
    GREETING
}

/// Forwarding handler behind every route other than the two local ones
#[instrument(skip_all, fields(method = %method, path = %uri.path()))]
async fn forward_request(
    State(state): State<ServerState>,
    token: Option<Extension<CarriedToken>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> GatewayResult<impl IntoResponse> {
    let route = state
        .router
        .match_route(&method, uri.path())
        .ok_or_else(|| GatewayError::route_not_found(method.as_str(), uri.path()))?;

    let body = if route.action.forwards_body() {
        Some(parse_json_body(&body)?)
    } else {
        None
    };

    if route.action == UpstreamAction::Create {
        let model = route.required_param("model")?;
        validate_record(model, body.as_ref().unwrap_or(&Value::Null))?;
    }

    let request = UpstreamRequest {
        route,
        token: token.map(|Extension(token)| token).unwrap_or_default(),
        body,
    };

    // The call runs on its own task so a client disconnect does not abort it.
    let upstream = state.upstream.clone();
    let data = tokio::spawn(async move { upstream.forward(request).await })
        .await
        .map_err(|e| GatewayError::internal(format!("Upstream task failed: {}", e)))??;

    Ok(Json(data))
}

/// An empty body is treated as an empty object
fn parse_json_body(bytes: &[u8]) -> GatewayResult<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(bytes).map_err(|e| GatewayError::malformed_body(e.to_string()))
}
