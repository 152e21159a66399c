//! HTTP backends against mock provider endpoints

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use vd_engine::backends::{GeminiBackend, LocalBackend, OpenAiBackend, VisionBackend};
use vd_engine::config::ProviderSettings;
use vd_engine::{BackendError, Engine, ImageInput, ParseFailureReason, PassId, PromptSet};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(5);

fn image() -> ImageInput {
    ImageInput::new("look1", vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0])
}

fn settings(server: &MockServer, api_key: Option<&str>) -> ProviderSettings {
    ProviderSettings {
        api_key: api_key.map(str::to_string),
        model: Some("test-model".to_string()),
        base_url: Some(server.uri()),
    }
}

#[tokio::test]
async fn test_openai_returns_message_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "response_format": {"type": "json_object"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "{\"garment_type\": \"dress\"}"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = OpenAiBackend::new(&settings(&server, Some("sk-test")), TIMEOUT).unwrap();
    let raw = backend.analyze(&image(), PassId::A, "describe").await.unwrap();
    assert_eq!(raw.text, "{\"garment_type\": \"dress\"}");
}

#[tokio::test]
async fn test_openai_refusal_is_a_parse_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{"message": {"role": "assistant", "content": null, "refusal": "I can't help with that."}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = OpenAiBackend::new(&settings(&server, Some("sk-test")), TIMEOUT).unwrap();
    let engine = Engine::new(Arc::new(backend), PromptSet::default());
    let description = engine.describe_image(&image(), &[PassId::A]).await.unwrap();

    let failures = description.parse_failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].pass, PassId::A);
    assert_eq!(failures[0].reason, ParseFailureReason::NoJsonObject);
    assert_eq!(failures[0].excerpt, "I can't help with that.");
    assert_eq!(description.record.garment_type, None);
}

#[tokio::test]
async fn test_openai_empty_choices_yield_empty_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let backend = OpenAiBackend::new(&settings(&server, Some("sk-test")), TIMEOUT).unwrap();
    let raw = backend.analyze(&image(), PassId::A, "describe").await.unwrap();
    assert_eq!(raw.text, "");
}

#[tokio::test]
async fn test_openai_without_key_is_unavailable() {
    let server = MockServer::start().await;
    let backend = OpenAiBackend::new(&settings(&server, None), TIMEOUT).unwrap();
    assert!(!backend.is_configured());

    let err = backend.analyze(&image(), PassId::A, "describe").await.unwrap_err();
    assert!(matches!(err, BackendError::Unavailable(_)));
}

#[tokio::test]
async fn test_openai_status_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limit exceeded"))
        .mount(&server)
        .await;

    let backend = OpenAiBackend::new(&settings(&server, Some("sk-test")), TIMEOUT).unwrap();
    let err = backend.analyze(&image(), PassId::B, "construction").await.unwrap_err();
    assert!(matches!(err, BackendError::RateLimited(m) if m.contains("rate limit exceeded")));
}

#[tokio::test]
async fn test_openai_rejected_key_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let backend = OpenAiBackend::new(&settings(&server, Some("sk-bad")), TIMEOUT).unwrap();
    let err = backend.analyze(&image(), PassId::A, "describe").await.unwrap_err();
    assert!(matches!(err, BackendError::Unavailable(_)));
}

#[tokio::test]
async fn test_gemini_joins_candidate_parts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/test-model:generateContent"))
        .and(header("x-goog-api-key", "g-key"))
        .and(body_partial_json(json!({
            "generationConfig": {"responseMimeType": "application/json"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [
                {"text": "```json\n{\"pose\": "},
                {"text": "\"walking\"}\n```"}
            ]}}]
        })))
        .mount(&server)
        .await;

    let backend = GeminiBackend::new(&settings(&server, Some("g-key")), TIMEOUT).unwrap();
    let raw = backend.analyze(&image(), PassId::C, "presentation").await.unwrap();
    assert_eq!(raw.text, "```json\n{\"pose\": \"walking\"}\n```");

    let partial = vd_engine::parser::parse_pass(PassId::C, &raw).partial;
    assert_eq!(partial.pose.as_deref(), Some("walking"));
}

#[tokio::test]
async fn test_gemini_blocked_prompt_is_a_parse_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [],
            "promptFeedback": {"blockReason": "SAFETY"}
        })))
        .mount(&server)
        .await;

    let backend = GeminiBackend::new(&settings(&server, Some("g-key")), TIMEOUT).unwrap();
    let raw = backend.analyze(&image(), PassId::B, "construction").await.unwrap();
    assert_eq!(raw.text, "");

    let engine = Engine::new(Arc::new(backend), PromptSet::default());
    let description = engine.describe_image(&image(), &[PassId::B]).await.unwrap();
    let failures = description.parse_failures();
    assert_eq!(failures.len(), 2);
    assert!(failures
        .iter()
        .all(|f| f.reason == ParseFailureReason::EmptyResponse));
}

#[tokio::test]
async fn test_gemini_server_error_is_transport() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let backend = GeminiBackend::new(&settings(&server, Some("g-key")), TIMEOUT).unwrap();
    let err = backend.analyze(&image(), PassId::A, "describe").await.unwrap_err();
    assert!(matches!(err, BackendError::Transport(_)));
}

#[tokio::test]
async fn test_local_generate_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({"model": "test-model", "format": "json", "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "test-model",
            "response": "{\"construction\": {\"closure\": \"zipper\"}}",
            "done": true
        })))
        .mount(&server)
        .await;

    let backend = LocalBackend::new(&settings(&server, None), TIMEOUT).unwrap();
    let raw = backend.analyze(&image(), PassId::B, "construction").await.unwrap();
    assert_eq!(raw.text, "{\"construction\": {\"closure\": \"zipper\"}}");
}

#[tokio::test]
async fn test_local_null_response_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "test-model",
            "response": null,
            "done": true
        })))
        .mount(&server)
        .await;

    let backend = LocalBackend::new(&settings(&server, None), TIMEOUT).unwrap();
    let raw = backend.analyze(&image(), PassId::C, "presentation").await.unwrap();
    assert_eq!(raw.text, "");
}

#[tokio::test]
async fn test_unexpected_envelope_passed_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("model is warming up"))
        .mount(&server)
        .await;

    let backend = LocalBackend::new(&settings(&server, None), TIMEOUT).unwrap();
    let raw = backend.analyze(&image(), PassId::A, "describe").await.unwrap();
    assert_eq!(raw.text, "model is warming up");
}

#[tokio::test]
async fn test_local_unreachable_is_unavailable() {
    let unreachable = ProviderSettings {
        api_key: None,
        model: None,
        base_url: Some("http://127.0.0.1:1".to_string()),
    };
    let backend = LocalBackend::new(&unreachable, TIMEOUT).unwrap();
    let err = backend.analyze(&image(), PassId::A, "describe").await.unwrap_err();
    assert!(matches!(err, BackendError::Unavailable(_)));
}

#[tokio::test]
async fn test_bare_json_body_passed_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"pose": "walking"})))
        .mount(&server)
        .await;

    let backend = GeminiBackend::new(&settings(&server, Some("g-key")), TIMEOUT).unwrap();
    let raw = backend.analyze(&image(), PassId::C, "presentation").await.unwrap();
    let partial = vd_engine::parser::parse_pass(PassId::C, &raw).partial;
    assert_eq!(partial.pose.as_deref(), Some("walking"));
}
