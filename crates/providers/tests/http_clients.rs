use providers::{
    AnthropicClient, CompletionRequest, ErrorKind, GeminiClient, OpenAiClient, Provider,
    ProviderError, SendOptions,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(model: &str) -> CompletionRequest {
    CompletionRequest::new(
        "You are a strategist.",
        "Describe a coffee shop.",
        SendOptions::new(model).with_timeout(Duration::from_secs(5)),
    )
}

#[tokio::test]
async fn test_openai_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "gpt-4o"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "Cozy corner cafe"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 4}
        })))
        .mount(&server)
        .await;

    let client = OpenAiClient::with_base_url("sk-test", server.uri());
    let completion = client.send(&request("gpt-4o")).await.unwrap();

    assert_eq!(completion.text, "Cozy corner cafe");
    assert_eq!(completion.usage.input_tokens, 12);
    assert_eq!(completion.usage.output_tokens, 4);
    assert_eq!(completion.model, "gpt-4o");
}

#[tokio::test]
async fn test_openai_rate_limit_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .mount(&server)
        .await;

    let client = OpenAiClient::with_base_url("sk-test", server.uri());
    let err = client.send(&request("gpt-4o")).await.unwrap_err();

    assert_eq!(
        err,
        ProviderError::RateLimited {
            retry_after_secs: Some(7)
        }
    );
    assert_eq!(err.kind(), ErrorKind::Transient);
}

#[tokio::test]
async fn test_openai_auth_failure_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let client = OpenAiClient::with_base_url("sk-bad", server.uri());
    let err = client.send(&request("gpt-4o")).await.unwrap_err();

    assert!(matches!(err, ProviderError::Auth(ref msg) if msg.contains("invalid api key")));
    assert_eq!(err.kind(), ErrorKind::Fatal);
}

#[tokio::test]
async fn test_anthropic_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "ak-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({"system": "You are a strategist."})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": "Roastery "}, {"type": "text", "text": "story"}],
            "usage": {"input_tokens": 20, "output_tokens": 2}
        })))
        .mount(&server)
        .await;

    let client = AnthropicClient::with_base_url("ak-test", server.uri());
    let completion = client
        .send(&request("claude-3-5-sonnet-20240620"))
        .await
        .unwrap();

    assert_eq!(completion.text, "Roastery story");
    assert_eq!(completion.usage.total(), 22);
}

#[tokio::test]
async fn test_anthropic_server_error_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let client = AnthropicClient::with_base_url("ak-test", server.uri());
    let err = client
        .send(&request("claude-3-5-sonnet-20240620"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Server { status: 529, .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_gemini_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .and(header("x-goog-api-key", "g-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "Espresso bar"}]}}],
            "usageMetadata": {"promptTokenCount": 9, "candidatesTokenCount": 3}
        })))
        .mount(&server)
        .await;

    let client = GeminiClient::with_base_url("g-test", server.uri());
    let completion = client.send(&request("gemini-2.0-flash")).await.unwrap();

    assert_eq!(completion.text, "Espresso bar");
    assert_eq!(completion.usage.input_tokens, 9);
}

#[tokio::test]
async fn test_gemini_empty_candidates_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .mount(&server)
        .await;

    let client = GeminiClient::with_base_url("g-test", server.uri());
    let err = client.send(&request("gemini-2.0-flash")).await.unwrap_err();

    assert!(matches!(err, ProviderError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_bad_request_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad schema"))
        .mount(&server)
        .await;

    let client = GeminiClient::with_base_url("g-test", server.uri());
    let err = client.send(&request("gemini-2.0-flash")).await.unwrap_err();

    assert_eq!(
        err,
        ProviderError::InvalidRequest {
            status: 400,
            message: "bad schema".to_string()
        }
    );
    assert_eq!(err.kind(), ErrorKind::Fatal);
}
