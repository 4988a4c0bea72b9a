use axum::http::StatusCode;
use depboard_core::config::Config;
use depboard_server::{build_router, AppState};
use http_body_util::BodyExt;
use mockito::{Matcher, ServerGuard};
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn config_for(server: &ServerGuard) -> Config {
    let mut config = Config::new("acme", 7, "acme", "widgets");
    config.tracker.graphql_url = format!("{}/graphql", server.url());
    config.tracker.rest_url = server.url();
    config.tracker.token_env = "DEPBOARD_TEST_TOKEN_UNSET".into();
    config.project.id = "PVT_7".into();
    config.fields.priority.id = "FLD_PRIO".into();
    for (name, id) in [("P0", "o0"), ("P1", "o1"), ("P2", "o2")] {
        config.fields.priority.options.insert(name.into(), id.into());
    }
    config
}

const TWO_ISSUES: &str = r#"{"data":{"owner":{"projectV2":{"items":{
    "pageInfo":{"hasNextPage":false,"endCursor":null},
    "nodes":[
      {"id":"PVTI_5","fieldValues":{"nodes":[]},
       "content":{"__typename":"Issue","number":5,"title":"Ship it","url":"https://example.test/5","state":"OPEN",
                  "blockedBy":{"nodes":[{"number":3,"state":"OPEN"}]}}},
      {"id":"PVTI_3","fieldValues":{"nodes":[]},
       "content":{"__typename":"Issue","number":3,"title":"Groundwork","url":"https://example.test/3","state":"OPEN",
                  "blocking":{"nodes":[{"number":5,"state":"OPEN"}]}}}
    ]
}}}}}"#;

async fn mock_issues(server: &mut ServerGuard) {
    server
        .mock("POST", "/graphql")
        .match_body(Matcher::Regex("ProjectItems".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(TWO_ISSUES)
        .create_async()
        .await;
}

async fn get_text(app: axum::Router, uri: &str) -> (StatusCode, String) {
    let req = axum::http::Request::builder()
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8_lossy(&body).into_owned())
}

async fn post_json(
    app: axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn index_renders_regions_after_a_sync_cycle() {
    let mut server = mockito::Server::new_async().await;
    mock_issues(&mut server).await;
    let state = AppState::new(config_for(&server)).unwrap();
    assert!(state.hub.refresh_now().await);

    let (status, html) = get_text(build_router(state), "/").await;
    assert_eq!(status, StatusCode::OK);
    for region in ["summary", "issues", "graph", "chains", "prs", "ci", "activity"] {
        assert!(html.contains(&format!("data-region=\"{region}\"")), "missing {region}");
    }
    assert!(html.contains("#3 → #5"));
    assert!(html.contains("⛔#3"));
    assert!(html.contains("Ship it"));
}

#[tokio::test]
async fn dashboard_json_reflects_current_snapshot() {
    let mut server = mockito::Server::new_async().await;
    mock_issues(&mut server).await;
    let state = AppState::new(config_for(&server)).unwrap();
    state.hub.refresh_now().await;

    let (status, body) = get_text(build_router(state), "/api/dashboard").await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["issues"]["roots"], serde_json::json!([3, 5]));
    assert_eq!(json["issues"]["chains"]["chains"], serde_json::json!([[3, 5]]));
    assert!(json["issue_error"].is_null());
}

#[tokio::test]
async fn unknown_value_is_rejected_without_a_write() {
    let mut server = mockito::Server::new_async().await;
    let writes = server
        .mock("POST", "/graphql")
        .expect(0)
        .create_async()
        .await;
    let state = AppState::new(config_for(&server)).unwrap();

    let (status, json) = post_json(
        build_router(state),
        "/api/update",
        serde_json::json!({ "issueNumber": 42, "field": "priority", "value": "P9" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json, serde_json::json!({ "ok": false, "error": "Unknown value: P9" }));
    writes.assert_async().await;
}

#[tokio::test]
async fn unknown_field_is_rejected() {
    let server = mockito::Server::new_async().await;
    let state = AppState::new(config_for(&server)).unwrap();

    let (status, json) = post_json(
        build_router(state),
        "/api/update",
        serde_json::json!({ "issueNumber": 42, "field": "assignee", "value": "octo" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Unknown field: assignee");
}

#[tokio::test]
async fn valid_update_writes_once_and_returns_ok() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/graphql")
        .match_body(Matcher::Regex("query ItemHandle".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"data":{"repository":{"issue":{"projectItems":{"nodes":[
                {"id":"PVTI_42","project":{"id":"PVT_7","number":7}}]}}}}}"#,
        )
        .create_async()
        .await;
    let write = server
        .mock("POST", "/graphql")
        .match_body(Matcher::Regex("mutation UpdateItemField".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data":{"updateProjectV2ItemFieldValue":{"projectV2Item":{"id":"PVTI_42"}}}}"#)
        .expect(1)
        .create_async()
        .await;
    let state = AppState::new(config_for(&server)).unwrap();

    let (status, json) = post_json(
        build_router(state),
        "/api/update",
        serde_json::json!({ "issueNumber": 42, "field": "priority", "value": "P0" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({ "ok": true }));
    write.assert_async().await;
}

#[tokio::test]
async fn malformed_update_body_keeps_the_error_shape() {
    let mut server = mockito::Server::new_async().await;
    let writes = server
        .mock("POST", "/graphql")
        .expect(0)
        .create_async()
        .await;
    let app = build_router(AppState::new(config_for(&server)).unwrap());

    let req = axum::http::Request::builder()
        .method("POST")
        .uri("/api/update")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(r#"{"issueNumber": "forty-two""#))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["ok"], false);
    assert!(json["error"].as_str().is_some_and(|e| !e.is_empty()));

    let (status, json) = post_json(
        app,
        "/api/update",
        serde_json::json!({ "issueNumber": 42, "field": "priority" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["ok"], false);
    writes.assert_async().await;
}

#[tokio::test]
async fn tracker_failure_during_update_is_502() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/graphql")
        .with_status(500)
        .with_body("upstream down")
        .create_async()
        .await;
    let state = AppState::new(config_for(&server)).unwrap();

    let (status, json) = post_json(
        build_router(state),
        "/api/update",
        serde_json::json!({ "issueNumber": 42, "field": "priority", "value": "P1" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["ok"], false);
}

#[tokio::test]
async fn events_stream_opens_with_connected() {
    let server = mockito::Server::new_async().await;
    let state = AppState::new(config_for(&server)).unwrap();
    let hub = state.hub.clone();

    let req = axum::http::Request::builder()
        .uri("/events")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = build_router(state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));
    assert_eq!(hub.registry().len(), 1);

    let mut body = response.into_body();
    let frame = body.frame().await.unwrap().unwrap();
    let text = String::from_utf8_lossy(frame.data_ref().unwrap()).into_owned();
    assert!(text.contains("event: connected"));

    assert_eq!(hub.registry().broadcast(depboard_server::sync::SyncSignal::Refresh), 1);
    let frame = body.frame().await.unwrap().unwrap();
    let text = String::from_utf8_lossy(frame.data_ref().unwrap()).into_owned();
    assert!(text.contains("event: refresh"));

    drop(body);
    assert!(hub.registry().is_empty());
}

#[tokio::test]
async fn embedded_assets_are_served() {
    let server = mockito::Server::new_async().await;
    let app = build_router(AppState::new(config_for(&server)).unwrap());

    let (status, js) = get_text(app.clone(), "/assets/live.js").await;
    assert_eq!(status, StatusCode::OK);
    assert!(js.contains("EventSource"));
    // Errors land beside the select that failed, not in a page banner.
    assert!(js.contains(".field-error"));
    assert!(!js.contains("flash"));
    // A reconnect re-fetches the regions it may have missed.
    assert!(js.contains("if (connections++ > 0) patch();"));

    let (status, _) = get_text(app, "/assets/missing.css").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
