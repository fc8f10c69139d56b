mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method};
use wiremock::{Mock, ResponseTemplate};

use chainport::domain::chain::{ChainExecutorConfig, EMPTY_COMPLETION_PLACEHOLDER};
use chainport::domain::EmptyCompletionPolicy;

use common::{completion, TestApp, UnavailableStore};

#[tokio::test]
async fn test_store_outage_keeps_chain_in_memory() {
    let app = TestApp::with_store(Arc::new(UnavailableStore)).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("done")))
        .mount(&app.server)
        .await;

    let created = app.create_arithmetic_chain().await;
    assert_eq!(created["success"], true);
    assert_eq!(created["storedDurably"], false);
    assert_eq!(
        created["warning"],
        "This chain is only stored in memory and will be lost when the server restarts"
    );

    let uri = format!("/api/process/{}", created["id"].as_str().unwrap());
    let (status, body) = app.post(&uri, json!({"input": "4"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["finalResult"], "done");
}

#[tokio::test]
async fn test_store_outage_uncached_chain_is_not_found() {
    let app = TestApp::with_store(Arc::new(UnavailableStore)).await;

    let (status, _) = app
        .post("/api/process/1700000000000-nothere1", json!({"input": "4"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_store_outage_fails_readiness() {
    let app = TestApp::with_store(Arc::new(UnavailableStore)).await;

    let (status, body) = app.get("/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");

    let (status, _) = app.get("/live").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_slow_step_times_out_with_partial_trail() {
    let config = ChainExecutorConfig {
        step_timeout: Some(Duration::from_millis(100)),
        ..ChainExecutorConfig::default()
    };
    let app = TestApp::with_config(config).await;
    Mock::given(method("POST"))
        .and(body_string_contains("double the number"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("8")))
        .mount(&app.server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("add one"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("9"))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&app.server)
        .await;

    let created = app.create_arithmetic_chain().await;
    let uri = format!("/api/process/{}", created["id"].as_str().unwrap());
    let (status, body) = app.post(&uri, json!({"input": "4"})).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["partialResults"].as_array().unwrap().len(), 1);
    assert_eq!(
        body["error"],
        "Error processing input: The completion service did not respond in time."
    );
}

#[tokio::test]
async fn test_empty_completion_forwards_placeholder() {
    let app = TestApp::new().await;
    Mock::given(method("POST"))
        .and(body_string_contains("double the number"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&app.server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("add one"))
        .and(body_string_contains(EMPTY_COMPLETION_PLACEHOLDER))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("recovered")))
        .expect(1)
        .mount(&app.server)
        .await;

    let created = app.create_arithmetic_chain().await;
    let uri = format!("/api/process/{}", created["id"].as_str().unwrap());
    let (status, body) = app.post(&uri, json!({"input": "4"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stepResults"], json!([EMPTY_COMPLETION_PLACEHOLDER, "recovered"]));
}

#[tokio::test]
async fn test_empty_completion_can_fail_the_step() {
    let config = ChainExecutorConfig {
        empty_completion: EmptyCompletionPolicy::Fail,
        ..ChainExecutorConfig::default()
    };
    let app = TestApp::with_config(config).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .expect(1)
        .mount(&app.server)
        .await;

    let created = app.create_arithmetic_chain().await;
    let uri = format!("/api/process/{}", created["id"].as_str().unwrap());
    let (status, body) = app.post(&uri, json!({"input": "4"})).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["partialResults"], json!([]));
}
