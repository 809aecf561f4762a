//! Integration tests for `POST /chat` and `GET /health` over real HTTP.

use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{json, Value};

use magic_bot::config::Chunking;
use magic_bot::generator::EchoGenerator;
use magic_bot::server::{
    GENERATION_FAILED_MESSAGE, INVALID_BODY_MESSAGE, NDJSON_CONTENT_TYPE,
    PROMPT_NOT_FOUND_MESSAGE, PROMPT_TOO_LONG_MESSAGE,
};

use super::test_helpers::{spawn_server, test_config, FailingGenerator, RefusingGenerator};

fn body_lines(body: &str) -> Vec<Value> {
    body.lines()
        .map(|line| serde_json::from_str(line).expect("each line is JSON"))
        .collect()
}

#[tokio::test]
async fn health_returns_ok() {
    let (base, ct) = spawn_server(test_config(), Arc::new(EchoGenerator::new())).await;

    let resp = reqwest::get(format!("{base}/health")).await.expect("request");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");

    ct.cancel();
}

#[tokio::test]
async fn answer_streams_one_token_frame_per_word() {
    let (base, ct) = spawn_server(test_config(), Arc::new(EchoGenerator::new())).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/chat"))
        .json(&json!({"prompt": "Hello brave world"}))
        .send()
        .await
        .expect("request");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[reqwest::header::CONTENT_TYPE],
        NDJSON_CONTENT_TYPE
    );
    let text = resp.text().await.unwrap();
    assert!(text.ends_with('\n'));
    assert_eq!(
        body_lines(&text),
        vec![
            json!({"type": "token", "value": "Hello "}),
            json!({"type": "token", "value": "brave "}),
            json!({"type": "token", "value": "world"}),
        ]
    );

    ct.cancel();
}

#[tokio::test]
async fn unchunked_answer_is_forwarded_as_generated() {
    let mut config = test_config();
    config.server.chunking = Chunking::None;
    let (base, ct) = spawn_server(config, Arc::new(EchoGenerator::new())).await;

    let text = reqwest::Client::new()
        .post(format!("{base}/chat"))
        .json(&json!({"prompt": "one two"}))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert_eq!(
        body_lines(&text),
        vec![json!({"type": "token", "value": "one two"})]
    );

    ct.cancel();
}

#[tokio::test]
async fn generation_failure_ends_stream_with_error_frame() {
    let generator = FailingGenerator {
        before_failure: vec!["Partial answer"],
    };
    let (base, ct) = spawn_server(test_config(), Arc::new(generator)).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/chat"))
        .json(&json!({"prompt": "Hi"}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        body_lines(&resp.text().await.unwrap()),
        vec![
            json!({"type": "token", "value": "Partial "}),
            json!({"type": "token", "value": "answer"}),
            json!({"type": "error", "message": "Streaming failed...."}),
        ]
    );

    ct.cancel();
}

#[tokio::test]
async fn blank_prompt_is_rejected_without_stream() {
    let (base, ct) = spawn_server(test_config(), Arc::new(EchoGenerator::new())).await;
    let client = reqwest::Client::new();

    for body in [json!({"prompt": ""}), json!({"prompt": "  "}), json!({})] {
        let resp = client
            .post(format!("{base}/chat"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            resp.json::<Value>().await.unwrap(),
            json!({"type": "error", "message": PROMPT_NOT_FOUND_MESSAGE})
        );
    }

    ct.cancel();
}

#[tokio::test]
async fn non_json_body_is_rejected() {
    let (base, ct) = spawn_server(test_config(), Arc::new(EchoGenerator::new())).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/chat"))
        .body("prompt=hello")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], INVALID_BODY_MESSAGE);

    ct.cancel();
}

#[tokio::test]
async fn oversized_prompt_is_rejected() {
    let mut config = test_config();
    config.server.max_prompt_bytes = 8;
    let (base, ct) = spawn_server(config, Arc::new(EchoGenerator::new())).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/chat"))
        .json(&json!({"prompt": "far more than eight bytes"}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], PROMPT_TOO_LONG_MESSAGE);

    ct.cancel();
}

#[tokio::test]
async fn backend_that_cannot_start_yields_500() {
    let (base, ct) = spawn_server(test_config(), Arc::new(RefusingGenerator)).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/chat"))
        .json(&json!({"prompt": "Hi"}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body,
        json!({"type": "error", "message": GENERATION_FAILED_MESSAGE})
    );

    ct.cancel();
}
