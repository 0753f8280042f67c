//! # Gateway Integration Tests
//!
//! Drives the assembled application in-process with axum-test while the
//! upstream API is played by wiremock, or by a small echo server when a test
//! needs to see exactly which headers arrived.

use axum::{
    body::Bytes,
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    Json, Router as AxumRouter,
};
use axum_test::TestServer;
use bearer_gateway::upstream::DELETE_MESSAGE;
use bearer_gateway::{DeploymentMode, GatewayConfig, GatewayServer};
use serde_json::{json, Value};
use std::io::Write;
use tempfile::NamedTempFile;
use tokio::net::TcpListener;
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(base: &str) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.upstream.base_url = Some(Url::parse(base).unwrap());
    config
}

fn gateway(base: &str) -> TestServer {
    let server = GatewayServer::new(config_for(base)).unwrap();
    TestServer::new(server.into_router()).unwrap()
}

/// Upstream that answers every call with what it received
async fn echo_upstream() -> String {
    async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Value> {
        let authorization = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        Json(json!({
            "method": method.as_str(),
            "path": uri.path(),
            "authorization": authorization,
            "body": body,
        }))
    }

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = AxumRouter::new().fallback(echo);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn valid_certification() -> Value {
    json!({
        "certificateName": "Rust Fundamentals",
        "design": "classic",
        "issuer": "Training Dept",
        "groups": ["g-1", "g-2"]
    })
}

#[tokio::test]
async fn test_bearer_token_forwarded_verbatim() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/widgets/"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 1 }])))
        .expect(1)
        .mount(&upstream)
        .await;

    let server = gateway(&upstream.uri());
    let response = server
        .get("/api/widgets")
        .add_header(AUTHORIZATION, HeaderValue::from_static("Bearer abc"))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>(), json!([{ "id": 1 }]));
}

#[tokio::test]
async fn test_missing_token_forwards_empty_bearer() {
    let server = gateway(&echo_upstream().await);

    let response = server.get("/api/widgets").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let echoed = response.json::<Value>();
    assert_eq!(echoed["path"], "/api/widgets/");
    let authorization = echoed["authorization"].as_str().unwrap();
    assert_eq!(authorization.trim_end(), "Bearer");
}

#[tokio::test]
async fn test_non_bearer_authorization_treated_as_absent() {
    let server = gateway(&echo_upstream().await);

    let response = server
        .get("/api/widgets/7")
        .add_header(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"))
        .await;

    let echoed = response.json::<Value>();
    assert_eq!(echoed["authorization"].as_str().unwrap().trim_end(), "Bearer");
}

#[tokio::test]
async fn test_auth_route_sends_no_authorization() {
    let server = gateway(&echo_upstream().await);

    let response = server
        .post("/auth/login")
        .add_header(AUTHORIZATION, HeaderValue::from_static("Bearer abc"))
        .json(&json!({ "username": "ada", "password": "secret" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let echoed = response.json::<Value>();
    assert_eq!(echoed["method"], "POST");
    assert_eq!(echoed["path"], "/auth/login");
    assert_eq!(echoed["authorization"], Value::Null);
    assert_eq!(echoed["body"], json!({ "username": "ada", "password": "secret" }));
}

#[tokio::test]
async fn test_get_relays_upstream_body_unchanged() {
    let upstream = MockServer::start().await;
    let record = json!({ "id": 42, "nested": { "tags": ["a", "b"] }, "note": null });
    Mock::given(method("GET"))
        .and(path("/api/widgets/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(record.clone()))
        .expect(1)
        .mount(&upstream)
        .await;

    let server = gateway(&upstream.uri());
    let response = server.get("/api/widgets/42").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>(), record);
}

#[tokio::test]
async fn test_head_is_answered_by_get_route() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/widgets/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 42 })))
        .expect(1)
        .mount(&upstream)
        .await;

    let server = gateway(&upstream.uri());
    let response = server.method(Method::HEAD, "/api/widgets/42").await;

    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_member_lookup_uses_three_segments() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/group/member/9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 9 })))
        .expect(1)
        .mount(&upstream)
        .await;

    let server = gateway(&upstream.uri());
    let response = server.get("/api/group/member/9").await;

    assert_eq!(response.json::<Value>(), json!({ "id": 9 }));
}

#[tokio::test]
async fn test_create_valid_record_forwards_body() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/certification/"))
        .and(header("authorization", "Bearer abc"))
        .and(body_json(valid_certification()))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 3 })))
        .expect(1)
        .mount(&upstream)
        .await;

    let server = gateway(&upstream.uri());
    let response = server
        .post("/api/certification")
        .add_header(AUTHORIZATION, HeaderValue::from_static("Bearer abc"))
        .json(&valid_certification())
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>(), json!({ "id": 3 }));
}

#[tokio::test]
async fn test_create_reports_single_missing_field() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    let mut body = valid_certification();
    body.as_object_mut().unwrap().remove("issuer");

    let server = gateway(&upstream.uri());
    let response = server.post("/api/certification").json(&body).await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>(),
        json!({ "errors": [{ "field": "issuer", "message": "Issuer is required" }] })
    );
}

#[tokio::test]
async fn test_create_reports_every_missing_field() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    let server = gateway(&upstream.uri());
    let response = server.post("/api/certification").json(&json!({})).await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let errors = response.json::<Value>()["errors"].as_array().unwrap().clone();
    let fields: Vec<&str> = errors.iter().map(|e| e["field"].as_str().unwrap()).collect();
    assert_eq!(fields, vec!["certificateName", "design", "issuer", "groups"]);
}

#[tokio::test]
async fn test_create_empty_body_reports_missing_fields() {
    let upstream = MockServer::start().await;
    let server = gateway(&upstream.uri());

    let response = server.post("/api/member").await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let errors = response.json::<Value>()["errors"].as_array().unwrap().len();
    assert_eq!(errors, 4);
}

#[tokio::test]
async fn test_create_invalid_email_rejected() {
    let upstream = MockServer::start().await;
    let server = gateway(&upstream.uri());

    let response = server
        .post("/api/approver")
        .json(&json!({ "email": "not-an-email" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>(),
        json!({ "errors": [{ "field": "email", "message": "Email must be a valid email address" }] })
    );
}

#[tokio::test]
async fn test_create_unknown_model_rejected_before_upstream() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    let server = gateway(&upstream.uri());
    let response = server.post("/api/widgets").json(&json!({ "name": "x" })).await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>(), json!({ "message": "Invalid model type" }));
}

#[tokio::test]
async fn test_create_malformed_json_rejected() {
    let upstream = MockServer::start().await;
    let server = gateway(&upstream.uri());

    let response = server
        .post("/api/group")
        .bytes(Bytes::from_static(b"{not json"))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(response.json::<Value>()["message"].is_string());
}

#[tokio::test]
async fn test_update_forwards_without_validation() {
    let upstream = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/certification/5"))
        .and(body_json(json!({ "name": 1 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "updated": true })))
        .expect(1)
        .mount(&upstream)
        .await;

    let server = gateway(&upstream.uri());
    let response = server.put("/api/certification/5").json(&json!({ "name": 1 })).await;

    assert_eq!(response.json::<Value>(), json!({ "updated": true }));
}

/// The account update has only one captured segment; the second segment it
/// asks for is never present, so the upstream sees `/api/{fmodel}/`.
#[tokio::test]
async fn test_update_account_uses_single_segment() {
    let server = gateway(&echo_upstream().await);

    let response = server
        .put("/api/account")
        .add_header(AUTHORIZATION, HeaderValue::from_static("Bearer abc"))
        .json(&json!({ "displayName": "Ada" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let echoed = response.json::<Value>();
    assert_eq!(echoed["method"], "PUT");
    assert_eq!(echoed["path"], "/api/account/");
    assert_eq!(echoed["authorization"], "Bearer abc");
}

#[tokio::test]
async fn test_delete_wraps_upstream_body() {
    let upstream = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/group/11"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 11 })))
        .expect(1)
        .mount(&upstream)
        .await;

    let server = gateway(&upstream.uri());
    let response = server.delete("/api/group/11").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.json::<Value>(),
        json!({ "message": DELETE_MESSAGE, "data": { "id": 11 } })
    );
}

#[tokio::test]
async fn test_delete_with_empty_upstream_body() {
    let upstream = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/group/12"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&upstream)
        .await;

    let server = gateway(&upstream.uri());
    let response = server.delete("/api/group/12").await;

    assert_eq!(
        response.json::<Value>(),
        json!({ "message": "Item deleted successfully", "data": null })
    );
}

#[tokio::test]
async fn test_upstream_failure_maps_to_500_with_payload() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/certification/99"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "Certification not found" })),
        )
        .mount(&upstream)
        .await;

    let server = gateway(&upstream.uri());
    let response = server.get("/api/certification/99").expect_failure().await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.json::<Value>(),
        json!({
            "message": "Certification not found",
            "upstream": { "message": "Certification not found" }
        })
    );
}

#[tokio::test]
async fn test_upstream_failure_with_text_body() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&upstream)
        .await;

    let server = gateway(&upstream.uri());
    let response = server.get("/api/widgets").expect_failure().await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.json::<Value>(),
        json!({
            "message": "Request failed with status code 503",
            "upstream": "Service Unavailable"
        })
    );
}

#[tokio::test]
async fn test_unreachable_upstream_maps_to_500() {
    // Bind and drop to get a port with nothing listening on it.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let server = gateway(&format!("http://{}", addr));
    let response = server.get("/api/widgets").expect_failure().await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.json::<Value>()["message"].is_string());
}

#[tokio::test]
async fn test_health_ignores_credentials() {
    let upstream = MockServer::start().await;
    let server = gateway(&upstream.uri());

    for request in [
        server.get("/api/health"),
        server
            .get("/api/health")
            .add_header(AUTHORIZATION, HeaderValue::from_static("Bearer garbage")),
    ] {
        let response = request.await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let report = response.json::<Value>();
        assert_eq!(report["ok"], true);
        assert_eq!(report["env"], "local");
        assert_eq!(report["name"], "bearer-gateway");
        assert!(report["time"].is_string());
    }

    assert!(upstream.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_health_reports_managed_env() {
    let upstream = MockServer::start().await;
    let mut config = config_for(&upstream.uri());
    config.server.mode = DeploymentMode::Managed;

    let server = TestServer::new(GatewayServer::new(config).unwrap().into_router()).unwrap();
    let report = server.get("/api/health").await.json::<Value>();

    assert_eq!(report["env"], "vercel");
}

#[tokio::test]
async fn test_post_to_health_falls_through_to_create() {
    let upstream = MockServer::start().await;
    let server = gateway(&upstream.uri());

    let response = server.post("/api/health").json(&json!({})).await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>(), json!({ "message": "Invalid model type" }));
}

#[tokio::test]
async fn test_root_greeting() {
    let upstream = MockServer::start().await;
    let server = gateway(&upstream.uri());

    let response = server.get("/").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), "Gateway deployed successfully");
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let upstream = MockServer::start().await;
    let server = gateway(&upstream.uri());

    let response = server.patch("/api/widgets/1").expect_failure().await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.json::<Value>(),
        json!({ "message": "Cannot PATCH /api/widgets/1" })
    );

    let response = server.get("/nowhere").expect_failure().await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_config_file_drives_gateway() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/base/api/approver/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&upstream)
        .await;

    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        "server:\n  service_name: people-gateway\nupstream:\n  base_url: \"{}/base\"\n  timeout: 5s\n",
        upstream.uri()
    )
    .unwrap();

    let config = GatewayConfig::load_from_file(file.path()).await.unwrap();
    assert_eq!(config.server.service_name, "people-gateway");

    let server = TestServer::new(GatewayServer::new(config).unwrap().into_router()).unwrap();
    let response = server.get("/api/approver").await;
    assert_eq!(response.json::<Value>(), json!([]));

    let report = server.get("/api/health").await.json::<Value>();
    assert_eq!(report["name"], "people-gateway");
}

#[tokio::test]
async fn test_missing_upstream_url_rejected() {
    let result = GatewayServer::new(GatewayConfig::default());
    assert!(result.is_err());
}
