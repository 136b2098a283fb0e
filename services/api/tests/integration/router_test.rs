use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_METHOD,
    CONTENT_TYPE, ORIGIN, VARY, WWW_AUTHENTICATE,
};
use serde_json::json;

use moviego_core::middleware::X_REQUEST_ID;
use moviego_core::rate_limit::RateLimitConfig;
use moviego_testing::{TestRequest, body_json};

use crate::helpers::{TRUSTED_ORIGIN, TestApp};

fn vary_values(resp: &axum::response::Response) -> Vec<String> {
    resp.headers()
        .get_all(VARY)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_owned)
        .collect()
}

// ── Health, fallbacks ─────────────────────────────────────────────────────────

#[tokio::test]
async fn should_report_healthcheck_with_request_id() {
    let app = TestApp::new();
    let resp = app.send(TestRequest::get("/v1/healthcheck").build()).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key(X_REQUEST_ID));
    assert_eq!(
        body_json(resp).await,
        json!({
            "status": "available",
            "system_info": { "environment": "testing", "version": "0.0.0" }
        })
    );
}

#[tokio::test]
async fn should_render_unknown_routes_and_methods_as_envelopes() {
    let app = TestApp::new();

    let resp = app.send(TestRequest::get("/v1/nothing-here").build()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(resp).await,
        json!({ "error": "the requested resource could not be found" })
    );

    let resp = app.send(TestRequest::delete("/v1/healthcheck").build()).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(
        body_json(resp).await,
        json!({ "error": "the DELETE method is not supported for this resource" })
    );
}

// ── Rate limiting ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_throttle_each_client_after_its_burst() {
    let app = TestApp::with_limiter(RateLimitConfig {
        rps: 2.0,
        burst: 2,
        enabled: true,
    });

    for _ in 0..2 {
        let resp = app.send(TestRequest::get("/v1/healthcheck").build()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
    let resp = app.send(TestRequest::get("/v1/healthcheck").build()).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_json(resp).await, json!({ "error": "rate limit exceeded" }));

    let other: SocketAddr = "10.0.0.9:5555".parse().unwrap();
    let resp = app
        .send(TestRequest::get("/v1/healthcheck").peer(other).build())
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn should_bypass_limiter_when_disabled() {
    let app = TestApp::new();
    for _ in 0..20 {
        let resp = app.send(TestRequest::get("/v1/healthcheck").build()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}

// ── CORS ──────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_echo_only_trusted_origins() {
    let app = TestApp::new();

    let resp = app
        .send(
            TestRequest::get("/v1/healthcheck")
                .header(ORIGIN, TRUSTED_ORIGIN)
                .build(),
        )
        .await;
    assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], TRUSTED_ORIGIN);
    assert!(vary_values(&resp).iter().any(|v| v == "Origin"));

    let resp = app
        .send(
            TestRequest::get("/v1/healthcheck")
                .header(ORIGIN, "https://evil.example")
                .build(),
        )
        .await;
    assert!(!resp.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));
}

#[tokio::test]
async fn should_answer_trusted_preflight_without_authentication() {
    let app = TestApp::new();
    let resp = app
        .send(
            TestRequest::new(axum::http::Method::OPTIONS, "/v1/movies/1")
                .header(ORIGIN, TRUSTED_ORIGIN)
                .header(ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
                .build(),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], TRUSTED_ORIGIN);
    let methods = resp.headers()[ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
    assert!(methods.contains("PATCH"));
}

// ── Authentication ────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_reject_malformed_or_unknown_bearer_tokens() {
    let app = TestApp::new();

    for auth in ["Basic dXNlcjpwYXNz", "Bearer short", "Bearer ABCDEFGHIJKLMNOPQRSTUV"] {
        let resp = app
            .send(
                TestRequest::get("/v1/healthcheck")
                    .header("authorization", auth)
                    .build(),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{auth}");
        assert_eq!(resp.headers()[WWW_AUTHENTICATE], "Bearer");
        assert!(vary_values(&resp).iter().any(|v| v == "Authorization"));
        assert_eq!(
            body_json(resp).await,
            json!({ "error": "invalid or missing authentication token" })
        );
    }
}

#[tokio::test]
async fn should_reject_anonymous_profile_request() {
    let app = TestApp::new();
    let resp = app.send(TestRequest::get("/v1/users/me").build()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(!resp.headers().contains_key(WWW_AUTHENTICATE));
    assert_eq!(
        body_json(resp).await,
        json!({ "error": "you must be authenticated to access this resource" })
    );
}

// ── Request bodies ────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_describe_bad_request_bodies() {
    let app = TestApp::new();
    let cases = [
        (r#"{"email": "#, "body contains badly-formed JSON"),
        (
            r#"{"email":"a@b.com","password":"pa55word","admin":true}"#,
            "body contains unknown key \"admin\"",
        ),
        ("", "body must not be empty"),
        (r#"{"email":"a@b.com"} {}"#, "body must only contain a single JSON value"),
    ];

    for (body, expected) in cases {
        let resp = app
            .send(
                TestRequest::post("/v1/tokens/authentication")
                    .header(CONTENT_TYPE, "application/json")
                    .raw_body(body)
                    .build(),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(body_json(resp).await, json!({ "error": expected }), "{body}");
    }
}

// ── Metrics ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_count_requests_and_responses_by_status() {
    let app = TestApp::new();
    app.send(TestRequest::get("/v1/healthcheck").build()).await;
    app.send(TestRequest::get("/v1/missing").build()).await;

    let resp = app.send(TestRequest::get("/debug/vars").build()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let metrics = &body["metrics"];
    assert_eq!(metrics["total_requests_received"], 3);
    assert_eq!(metrics["total_responses_sent"], 2);
    assert_eq!(
        metrics["total_responses_sent_by_status"],
        json!({ "200": 1, "404": 1 })
    );
}
