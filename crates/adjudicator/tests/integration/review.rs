use std::sync::{Arc, Mutex};

use adjudicator::review::{ChatReviewer, QualityReviewer, ReviewError};
use adjudicator::{JudgingConfiguration, ReviewerSettings, Stage};
use axum::Json;
use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use serde_json::{Value, json};

use super::{fixture_source, scratch_is_empty, sh_judge};

/// What the fake reviewer saw
#[derive(Default)]
struct Captured {
    authorization: Option<String>,
    body: Option<Value>,
}

/// Serve a fake chat completion endpoint answering with `status` and `content`
async fn spawn_reviewer(status: StatusCode, content: &str) -> (String, Arc<Mutex<Captured>>) {
    let captured = Arc::new(Mutex::new(Captured::default()));
    let content = content.to_owned();

    let seen = captured.clone();
    let app = Router::new().route(
        "/v1/chat/completions",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let seen = seen.clone();
            let content = content.clone();
            async move {
                {
                    let mut seen = seen.lock().unwrap();
                    seen.authorization = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_owned);
                    seen.body = Some(body);
                }

                if status.is_success() {
                    Json(json!({
                        "choices": [{
                            "index": 0,
                            "message": { "role": "assistant", "content": content },
                        }]
                    }))
                    .into_response()
                } else {
                    (status, content).into_response()
                }
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/v1"), captured)
}

fn config_for(endpoint: String) -> JudgingConfiguration {
    JudgingConfiguration::default().with_reviewer(ReviewerSettings {
        endpoint,
        api_key: Some("test-key".to_owned()),
        request_timeout: 5.0,
        ..Default::default()
    })
}

#[tokio::test]
async fn test_review_verdict_is_clamped() {
    let content = json!({
        "score": 45,
        "logicScore": 12,
        "redundancyScore": -2,
        "structureScore": 4,
        "efficiencyScore": 9,
        "issues": ["loop could be a formula"],
        "suggestions": ["use arithmetic expansion directly"],
        "detailedFeedback": "Works."
    })
    .to_string();
    let (endpoint, _) = spawn_reviewer(StatusCode::OK, &content).await;

    let verdict = ChatReviewer::new()
        .review("echo 6", "6", "6", &config_for(endpoint))
        .await
        .expect("review should succeed");

    assert_eq!(verdict.total_score, 30.0);
    assert_eq!(verdict.logic_score, 10.0);
    assert_eq!(verdict.redundancy_score, 0.0);
    assert_eq!(verdict.structure_score, 4.0);
    assert_eq!(verdict.efficiency_score, 5.0);
    assert_eq!(verdict.issues, vec!["loop could be a formula"]);
    assert_eq!(verdict.feedback, "Works.");
}

#[tokio::test]
async fn test_review_request_shape() {
    let (endpoint, captured) = spawn_reviewer(StatusCode::OK, r#"{"score": 20}"#).await;

    ChatReviewer::new()
        .review("echo 6", "6\n", "6", &config_for(endpoint))
        .await
        .unwrap();

    let captured = captured.lock().unwrap();
    assert_eq!(captured.authorization.as_deref(), Some("Bearer test-key"));

    let body = captured.body.as_ref().unwrap();
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["response_format"]["type"], "json_object");
    assert!((body["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    assert_eq!(body["messages"][0]["role"], "user");
    let prompt = body["messages"][0]["content"].as_str().unwrap();
    assert!(prompt.contains("echo 6"));
    assert!(prompt.contains("out of 30 points"));
}

#[tokio::test]
async fn test_review_code_fenced_json() {
    let (endpoint, _) =
        spawn_reviewer(StatusCode::OK, "```json\n{\"score\": 17.5}\n```").await;

    let verdict = ChatReviewer::new()
        .review("src", "6", "6", &config_for(endpoint))
        .await
        .unwrap();

    assert_eq!(verdict.total_score, 17.5);
}

#[tokio::test]
async fn test_review_unparsable_content() {
    let (endpoint, _) = spawn_reviewer(StatusCode::OK, "Great code, 10/10!").await;

    let result = ChatReviewer::new()
        .review("src", "6", "6", &config_for(endpoint))
        .await;

    assert!(matches!(result, Err(ReviewError::Parse(_))));
}

#[tokio::test]
async fn test_review_http_error_status() {
    let (endpoint, _) = spawn_reviewer(StatusCode::TOO_MANY_REQUESTS, "slow down").await;

    let result = ChatReviewer::new()
        .review("src", "6", "6", &config_for(endpoint))
        .await;

    match result {
        Err(ReviewError::Status { status, body }) => {
            assert_eq!(status, 429);
            assert_eq!(body, "slow down");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_judge_uses_review_score() {
    let root = tempfile::tempdir().unwrap();
    let (endpoint, _) = spawn_reviewer(
        StatusCode::OK,
        r#"{"score": 26, "logicScore": 9, "redundancyScore": 9, "structureScore": 4, "efficiencyScore": 4}"#,
    )
    .await;

    let result = sh_judge(root.path())
        .judge(
            &fixture_source("multiply.sh"),
            "2 3",
            "6",
            &config_for(endpoint),
        )
        .await;

    assert!(result.success);
    assert_eq!(result.stage, Stage::Scored);
    assert_eq!(result.final_score, 26.0);
    assert_eq!(result.quality.unwrap().logic_score, 9.0);
    assert!(result.error_message.is_none());
    assert!(scratch_is_empty(root.path()));
}

#[tokio::test]
async fn test_judge_falls_back_on_garbage_review() {
    let root = tempfile::tempdir().unwrap();
    let (endpoint, _) = spawn_reviewer(StatusCode::OK, "not json").await;

    let result = sh_judge(root.path())
        .judge(
            &fixture_source("multiply.sh"),
            "2 3",
            "6",
            &config_for(endpoint),
        )
        .await;

    assert!(result.success);
    assert!((result.final_score - 24.0).abs() < 1e-9);
    assert!(result.quality.is_none());
}
