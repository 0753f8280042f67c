//! # Upstream Forwarder
//!
//! Issues exactly one HTTP call to the upstream API per inbound request and
//! turns the outcome into a `GatewayResult<Value>`. There are no retries and no
//! backoff; a failed call is reported once and the caller decides what to do.
//!
//! Upstream URLs are built by appending segments to the configured base URL:
//!
//! | action | upstream path |
//! |---|---|
//! | authenticate | `/auth/{model}` |
//! | list all | `/api/{model}/` |
//! | current user | `/api/{fmodel}/{smodel}` |
//! | get by id | `/api/{model}/{id}` |
//! | get member | `/api/{fmodel}/{smodel}/{id}` |
//! | create | `/api/{model}/` |
//! | update | `/api/{model}/{id}` |
//! | update account | `/api/{fmodel}/` |
//! | delete | `/api/{model}/{id}` |

use reqwest::{Client as HttpClient, Method, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::core::config::UpstreamConfig;
use crate::core::error::{GatewayError, GatewayResult};
use crate::core::types::CarriedToken;
use crate::routing::router::{RouteMatch, UpstreamAction};

/// Message wrapped around a successful delete
pub const DELETE_MESSAGE: &str = "Item deleted successfully";

/// Everything needed to make one upstream call
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub route: RouteMatch,

    /// Attached as a bearer credential when the action carries one
    pub token: CarriedToken,

    /// JSON body for actions that forward one
    pub body: Option<Value>,
}

/// HTTP client bound to the upstream base URL
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: HttpClient,
    base_url: Url,
}

impl UpstreamClient {
    /// Create a client from validated upstream configuration
    pub fn new(config: &UpstreamConfig) -> GatewayResult<Self> {
        let base_url = config.base_url()?.clone();

        let mut builder = HttpClient::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|e| GatewayError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the upstream URL for a matched route
    pub fn endpoint(&self, route: &RouteMatch) -> GatewayResult<Url> {
        let (prefix, segments, trailing_slash): (&str, Vec<&str>, bool) = match route.action {
            UpstreamAction::Authenticate => ("auth", vec![route.required_param("model")?], false),
            UpstreamAction::ListAll | UpstreamAction::Create => {
                ("api", vec![route.required_param("model")?], true)
            }
            UpstreamAction::CurrentUser => (
                "api",
                vec![route.required_param("fmodel")?, route.required_param("smodel")?],
                false,
            ),
            UpstreamAction::GetById | UpstreamAction::Update | UpstreamAction::Delete => (
                "api",
                vec![route.required_param("model")?, route.required_param("id")?],
                false,
            ),
            UpstreamAction::GetMember => (
                "api",
                vec![
                    route.required_param("fmodel")?,
                    route.required_param("smodel")?,
                    route.required_param("id")?,
                ],
                false,
            ),
            UpstreamAction::UpdateAccount => {
                // The account update also reads `smodel`, which its route never
                // captures, so it is always absent and plays no part in the URL.
                let smodel = route.params.get("smodel");
                debug!(smodel = ?smodel, "Account update second segment");
                ("api", vec![route.required_param("fmodel")?], true)
            }
        };

        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| GatewayError::config(format!("Upstream base URL cannot be a base: {}", self.base_url)))?;
            path.pop_if_empty().push(prefix).extend(segments);
            if trailing_slash {
                path.push("");
            }
        }
        Ok(url)
    }

    /// Forward a request upstream and return the body to relay
    #[instrument(
        skip(self, request),
        fields(action = %request.route.action, token = %request.token)
    )]
    pub async fn forward(&self, request: UpstreamRequest) -> GatewayResult<Value> {
        let action = request.route.action;
        let url = self.endpoint(&request.route)?;

        let mut builder = self.http.request(upstream_method(action), url.clone());
        if action.carries_token() {
            builder = builder.bearer_auth(request.token.as_str());
        }
        if let Some(body) = request.body.as_ref().filter(|_| action.forwards_body()) {
            builder = builder.json(body);
        }

        debug!(url = %url, "Forwarding request upstream");
        let response = builder.send().await.map_err(|e| {
            warn!(url = %url, error = %e, "Upstream request failed");
            GatewayError::from(e)
        })?;

        let status = response.status();
        let bytes = response.bytes().await?;
        debug!(status = status.as_u16(), bytes = bytes.len(), "Upstream responded");

        if !status.is_success() {
            return Err(status_failure(status, &bytes));
        }

        let data = parse_success_body(&bytes)?;
        Ok(match action {
            UpstreamAction::Delete => json!({ "message": DELETE_MESSAGE, "data": data }),
            _ => data,
        })
    }
}

fn upstream_method(action: UpstreamAction) -> Method {
    match action {
        UpstreamAction::Authenticate | UpstreamAction::Create => Method::POST,
        UpstreamAction::ListAll
        | UpstreamAction::CurrentUser
        | UpstreamAction::GetById
        | UpstreamAction::GetMember => Method::GET,
        UpstreamAction::Update | UpstreamAction::UpdateAccount => Method::PUT,
        UpstreamAction::Delete => Method::DELETE,
    }
}

/// An empty body relays as `null`; anything else must be JSON
fn parse_success_body(bytes: &[u8]) -> GatewayResult<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes)
        .map_err(|e| GatewayError::upstream(format!("Upstream returned malformed JSON: {}", e)))
}

/// Non-2xx: keep whatever error body the upstream sent, JSON or text
fn status_failure(status: StatusCode, bytes: &[u8]) -> GatewayError {
    let description = format!("Request failed with status code {}", status.as_u16());
    if let Ok(payload) = serde_json::from_slice::<Value>(bytes) {
        return GatewayError::upstream_with_payload(description, payload);
    }

    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    if text.is_empty() {
        GatewayError::upstream(description)
    } else {
        GatewayError::upstream_with_payload(description, Value::String(text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PathParams;

    fn client(base: &str) -> UpstreamClient {
        let config = UpstreamConfig {
            base_url: Some(Url::parse(base).unwrap()),
            timeout: None,
        };
        UpstreamClient::new(&config).unwrap()
    }

    fn route(action: UpstreamAction, params: &[(&str, &str)]) -> RouteMatch {
        RouteMatch {
            pattern: String::new(),
            action,
            params: params.iter().copied().collect::<PathParams>(),
        }
    }

    #[test]
    fn test_endpoint_templates() {
        let client = client("http://java-api:8080");
        let cases = [
            (route(UpstreamAction::Authenticate, &[("model", "login")]), "http://java-api:8080/auth/login"),
            (route(UpstreamAction::ListAll, &[("model", "group")]), "http://java-api:8080/api/group/"),
            (route(UpstreamAction::Create, &[("model", "group")]), "http://java-api:8080/api/group/"),
            (
                route(UpstreamAction::CurrentUser, &[("fmodel", "users"), ("smodel", "me")]),
                "http://java-api:8080/api/users/me",
            ),
            (
                route(UpstreamAction::GetById, &[("model", "widgets"), ("id", "42")]),
                "http://java-api:8080/api/widgets/42",
            ),
            (
                route(
                    UpstreamAction::GetMember,
                    &[("fmodel", "group"), ("smodel", "members"), ("id", "9")],
                ),
                "http://java-api:8080/api/group/members/9",
            ),
            (route(UpstreamAction::UpdateAccount, &[("fmodel", "account")]), "http://java-api:8080/api/account/"),
            (
                route(UpstreamAction::Delete, &[("model", "widgets"), ("id", "42")]),
                "http://java-api:8080/api/widgets/42",
            ),
        ];

        for (route, expected) in cases {
            assert_eq!(client.endpoint(&route).unwrap().as_str(), expected, "{:?}", route.action);
        }
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = client("http://gateway.internal/backend/");
        let url = client
            .endpoint(&route(UpstreamAction::GetById, &[("model", "group"), ("id", "1")]))
            .unwrap();
        assert_eq!(url.as_str(), "http://gateway.internal/backend/api/group/1");
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = client("http://java-api:8080");
        let url = client
            .endpoint(&route(UpstreamAction::Delete, &[("model", "group"), ("id", "a b/c")]))
            .unwrap();
        assert_eq!(url.as_str(), "http://java-api:8080/api/group/a%20b%2Fc");
    }

    #[test]
    fn test_missing_param_is_an_error() {
        let client = client("http://java-api:8080");
        assert!(client.endpoint(&route(UpstreamAction::GetById, &[("model", "group")])).is_err());
    }

    #[test]
    fn test_success_body_parsing() {
        assert_eq!(parse_success_body(b"").unwrap(), Value::Null);
        assert_eq!(parse_success_body(b"{\"id\":1}").unwrap(), json!({ "id": 1 }));
        assert!(parse_success_body(b"<html>").is_err());
    }

    #[test]
    fn test_status_failure_keeps_payload() {
        let err = status_failure(StatusCode::NOT_FOUND, b"{\"message\":\"missing\"}");
        match err {
            GatewayError::Upstream { description, payload } => {
                assert_eq!(description, "Request failed with status code 404");
                assert_eq!(payload, Some(json!({ "message": "missing" })));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let err = status_failure(StatusCode::BAD_GATEWAY, b"");
        assert!(matches!(err, GatewayError::Upstream { payload: None, .. }));
    }

    #[test]
    fn test_status_failure_keeps_text_body() {
        let err = status_failure(StatusCode::SERVICE_UNAVAILABLE, b"Service Unavailable\n");
        assert_eq!(
            err.response_body(),
            json!({
                "message": "Request failed with status code 503",
                "upstream": "Service Unavailable"
            })
        );
    }
}
