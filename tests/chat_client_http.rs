use cfd_intent::llm::{ChatClient, ChatMessage, ChatRequest, EndpointConfig, HttpChatClient, Stage};
use cfd_intent::LlmError;
use mockito::Matcher;
use serde_json::json;
use std::time::Duration;

fn endpoint(base_url: String) -> EndpointConfig {
    EndpointConfig {
        alias: "deepseek-v1".into(),
        base_url,
        path: "/chat/completions".into(),
        model: "deepseek-chat".into(),
        api_key: "sk-test".into(),
        force_json: true,
        supports_response_format: true,
        timeout: Duration::from_secs(5),
    }
}

fn request(base_url: String) -> ChatRequest {
    ChatRequest::new(
        Stage::Collector,
        endpoint(base_url),
        vec![ChatMessage::system("collect"), ChatMessage::user("3 mm channels")],
    )
    .forcing_json()
}

fn completion(content: &str) -> String {
    json!({"choices": [{"message": {"role": "assistant", "content": content}}]}).to_string()
}

#[tokio::test]
async fn parses_json_content_and_sends_bearer_payload() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .match_body(Matcher::PartialJson(json!({
            "model": "deepseek-chat",
            "stream": false,
            "response_format": {"type": "json_object"}
        })))
        .with_status(200)
        .with_body(completion(r#"{"intent": {"a": 1}, "missing_parameters": []}"#))
        .create();

    let value = HttpChatClient::new()
        .complete_json(request(server.url()))
        .await
        .expect("request should succeed");

    assert_eq!(value, json!({"intent": {"a": 1}, "missing_parameters": []}));
}

#[tokio::test]
async fn trailing_slash_in_base_url_is_ignored() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(completion(r#"{"summary": "ok"}"#))
        .create();

    let value = HttpChatClient::new()
        .complete_json(request(format!("{}/", server.url())))
        .await
        .unwrap();

    assert_eq!(value["summary"], "ok");
}

#[tokio::test]
async fn json_wrapped_in_prose_is_recovered() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(completion(
            "Here is the result:\n```json\n{\"defaults_used\": [\"T_in 25 C\"]}\n```\nDone.",
        ))
        .create();

    let value = HttpChatClient::new()
        .complete_json(request(server.url()))
        .await
        .unwrap();

    assert_eq!(value, json!({"defaults_used": ["T_in 25 C"]}));
}

#[tokio::test]
async fn non_success_status_becomes_upstream_error() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("POST", "/chat/completions")
        .with_status(503)
        .with_body("x".repeat(2000))
        .create();

    let err = HttpChatClient::new()
        .complete_json(request(server.url()))
        .await
        .unwrap_err();

    match err {
        LlmError::Upstream {
            status,
            reason,
            url,
            body,
        } => {
            assert_eq!(status, 503);
            assert_eq!(reason, "Service Unavailable");
            assert_eq!(url, format!("{}/chat/completions", server.url()));
            assert_eq!(body.chars().count(), 600);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn non_json_content_is_malformed() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(completion("I cannot help with that."))
        .create();

    let err = HttpChatClient::new()
        .complete_json(request(server.url()))
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::MalformedResponse { .. }));
    assert!(!err.is_upstream());
}

#[tokio::test]
async fn missing_choices_is_malformed() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(r#"{"error": "quota"}"#)
        .create();

    let err = HttpChatClient::new()
        .complete_json(request(server.url()))
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::MalformedResponse { .. }));
}

#[tokio::test]
async fn incomplete_endpoint_fails_without_a_request() {
    let mut server = mockito::Server::new_async().await;
    let untouched = server.mock("POST", Matcher::Any).expect(0).create();

    let mut chat = request(server.url());
    chat.endpoint.model.clear();
    chat.endpoint.api_key.clear();

    let err = HttpChatClient::new().complete_json(chat).await.unwrap_err();

    match err {
        LlmError::Configuration { missing } => assert_eq!(missing, "model/api_key"),
        other => panic!("unexpected error: {other}"),
    }
    untouched.assert_async().await;
}
