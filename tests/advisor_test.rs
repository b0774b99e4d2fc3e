//! End-to-end tests for recommendations
//!
//! Runs the recommendation service against an in-memory mastery store and a
//! wiremock stand-in for the Langbase pipe.

use std::path::PathBuf;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, Request, ResponseTemplate,
};

use mastery_advisor::advisor::{RecommendationOutcome, RecommendationParams};
use mastery_advisor::config::{
    Config, DatabaseConfig, LangbaseConfig, LogFormat, LoggingConfig, PipeConfig, RequestConfig,
};
use mastery_advisor::langbase::LangbaseClient;
use mastery_advisor::server::{handle_tool_call, AppState, SharedState};
use mastery_advisor::storage::{MasteryFields, MasteryStore, SqliteStorage};

const THREE_ITEMS: &str = r#"{"recommendations": [
    {"topic": "Linear Algebra", "reason": "Builds on algebra", "connections": ["algebra"], "targetMastery": 60},
    {"topic": "Probability", "reason": "Fills a foundational gap", "connections": [], "targetMastery": 50},
    {"topic": "Real Analysis", "reason": "Deepens calculus", "connections": ["calculus"], "targetMastery": 70}
]}"#;

async fn create_state(base_url: &str, api_key: Option<&str>) -> SharedState {
    let config = Config {
        langbase: LangbaseConfig {
            api_key: api_key.map(str::to_string),
            base_url: base_url.to_string(),
        },
        database: DatabaseConfig {
            path: PathBuf::from(":memory:"),
            max_connections: 1,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
        },
        request: RequestConfig { timeout_ms: 5000 },
        pipes: PipeConfig::default(),
    };
    let storage = SqliteStorage::new_in_memory().await.unwrap();
    let langbase =
        LangbaseClient::new(&config.langbase, &config.pipes, config.request.clone()).unwrap();
    Arc::new(AppState::new(config, storage, langbase))
}

async fn seed(state: &SharedState) {
    state
        .storage
        .upsert("u1", "calculus", MasteryFields::new(65.0))
        .await
        .unwrap();
    state
        .storage
        .upsert("u1", "algebra", MasteryFields::new(20.0))
        .await
        .unwrap();
}

async fn mount_completion(server: &MockServer, completion: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/pipes/run"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "completion": completion
        })))
        .expect(1)
        .mount(server)
        .await;
}

fn prompt_of(request: &Request) -> String {
    let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
    body["messages"][0]["content"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_end_to_end_success_keeps_model_order() {
    let server = MockServer::start().await;
    mount_completion(&server, THREE_ITEMS).await;
    let state = create_state(&server.uri(), Some("test-key")).await;
    seed(&state).await;

    let run = state
        .advisor
        .recommend(RecommendationParams::new("u1"))
        .await
        .unwrap();

    assert_eq!(run.outcome, RecommendationOutcome::Success);
    let topics: Vec<&str> = run
        .result
        .recommendations
        .iter()
        .map(|r| r.topic.as_str())
        .collect();
    assert_eq!(topics, vec!["Linear Algebra", "Probability", "Real Analysis"]);
    assert_eq!(run.result.recommendations[2].connections, vec!["calculus".to_string()]);

    let requests = server.received_requests().await.unwrap();
    let prompt = prompt_of(&requests[0]);
    let algebra = prompt.find("- algebra: 20.0% mastery").unwrap();
    let calculus = prompt.find("- calculus: 65.0% mastery").unwrap();
    assert!(algebra < calculus, "weakest topic listed first");
}

#[tokio::test]
async fn test_fenced_answer_matches_plain_answer() {
    let plain_server = MockServer::start().await;
    mount_completion(&plain_server, THREE_ITEMS).await;
    let plain_state = create_state(&plain_server.uri(), Some("k")).await;

    let fenced_server = MockServer::start().await;
    let fenced = format!("Here are my picks:\n```json\n{}\n```\nEnjoy!", THREE_ITEMS);
    mount_completion(&fenced_server, &fenced).await;
    let fenced_state = create_state(&fenced_server.uri(), Some("k")).await;

    let plain = plain_state
        .advisor
        .recommend(RecommendationParams::new("u1"))
        .await
        .unwrap();
    let fenced = fenced_state
        .advisor
        .recommend(RecommendationParams::new("u1"))
        .await
        .unwrap();

    assert_eq!(plain, fenced);
}

#[tokio::test]
async fn test_prose_answer_uses_parse_failure_fallback() {
    let server = MockServer::start().await;
    mount_completion(&server, "I recommend studying topology next.").await;
    let state = create_state(&server.uri(), Some("k")).await;

    let run = state
        .advisor
        .recommend(RecommendationParams::new("u1"))
        .await
        .unwrap();

    assert_eq!(run.outcome, RecommendationOutcome::ParseFailureFallback);
    assert_eq!(
        run.result.recommendations,
        RecommendationOutcome::ParseFailureFallback
            .fallback_item()
            .into_iter()
            .collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_forbidden_pipe_uses_service_unavailable_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/pipes/run"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;
    let state = create_state(&server.uri(), Some("k")).await;

    let run = state
        .advisor
        .recommend(RecommendationParams::new("u1"))
        .await
        .unwrap();

    assert_eq!(run.outcome, RecommendationOutcome::ServiceUnavailableFallback);
    assert!(run.result.recommendations[0].reason.contains("AI advisor"));
}

#[tokio::test]
async fn test_missing_key_never_calls_the_pipe() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let state = create_state(&server.uri(), None).await;

    let run = state
        .advisor
        .recommend(RecommendationParams::new("u1"))
        .await
        .unwrap();
    assert_eq!(run.outcome, RecommendationOutcome::ServiceUnavailableFallback);
}

#[tokio::test]
async fn test_new_user_prompt_uses_sentinel_and_current_node() {
    let server = MockServer::start().await;
    mount_completion(&server, THREE_ITEMS).await;
    let state = create_state(&server.uri(), Some("k")).await;

    state
        .advisor
        .recommend(RecommendationParams::new("fresh").with_current_node("graph-theory"))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let prompt = prompt_of(&requests[0]);
    assert!(prompt.contains("Currently viewing: graph-theory"));
    assert!(prompt.contains("(no topics learned yet)"));
}

#[tokio::test]
async fn test_tool_call_returns_bare_recommendations() {
    let server = MockServer::start().await;
    mount_completion(&server, THREE_ITEMS).await;
    let state = create_state(&server.uri(), Some("k")).await;
    seed(&state).await;

    let value = handle_tool_call(
        &state,
        "recommendations_get",
        Some(json!({ "user_id": "u1", "current_node_id": "calculus" })),
    )
    .await
    .unwrap();

    assert_eq!(value.as_object().unwrap().len(), 1);
    assert_eq!(value["recommendations"][0]["targetMastery"], 60);
    assert_eq!(value["recommendations"][0]["connections"], json!(["algebra"]));
}
