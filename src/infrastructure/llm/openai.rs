use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http_client::HttpClientTrait;
use crate::domain::{
    DomainError, FinishReason, LlmProvider, LlmRequest, LlmResponse, Message, UpstreamErrorKind,
    Usage,
};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// OpenAI-compatible chat-completions provider
#[derive(Debug)]
pub struct OpenAiProvider<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    base_url: String,
}

impl<C: HttpClientTrait> OpenAiProvider<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_OPENAI_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let auth_header = format!("Bearer {}", api_key.into());
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client,
            auth_header,
            base_url,
        }
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn build_request(&self, model: &str, request: &LlmRequest) -> serde_json::Value {
        let messages: Vec<OpenAiMessage> =
            request.messages.iter().map(OpenAiMessage::from_domain).collect();

        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
        });

        if let Some(temp) = request.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        body
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<LlmResponse, DomainError> {
        let response: OpenAiResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::upstream(
                UpstreamErrorKind::MalformedResponse,
                format!("Failed to parse response: {}", e),
            )
        })?;

        // A success without choices is an empty completion, not a failure
        let choice = response.choices.into_iter().next();
        let content = choice.as_ref().and_then(|c| c.message.content.clone());

        let mut llm_response = LlmResponse::new(response.id, response.model, content);

        if let Some(reason) = choice.and_then(|c| c.finish_reason) {
            llm_response = llm_response.with_finish_reason(FinishReason::parse(&reason));
        }

        if let Some(usage) = response.usage {
            llm_response =
                llm_response.with_usage(Usage::new(usage.prompt_tokens, usage.completion_tokens));
        }

        Ok(llm_response)
    }
}

#[async_trait]
impl<C: HttpClientTrait> LlmProvider for OpenAiProvider<C> {
    async fn chat(&self, model: &str, request: LlmRequest) -> Result<LlmResponse, DomainError> {
        let url = self.chat_completions_url();
        let body = self.build_request(model, &request);
        let response = self.client.post_json(&url, self.headers(), &body).await?;

        self.parse_response(response)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: String,
}

impl OpenAiMessage {
    fn from_domain(message: &Message) -> Self {
        Self {
            role: message.role.as_str(),
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::llm::http_client::mock::MockHttpClient;

    const TEST_URL: &str = "https://api.openai.com/v1/chat/completions";

    fn step_request() -> LlmRequest {
        LlmRequest::builder()
            .system("Instructions: uppercase the input")
            .user("hello")
            .temperature(0.2)
            .max_tokens(1000)
            .build()
    }

    #[tokio::test]
    async fn test_openai_chat() {
        let mock_response = serde_json::json!({
            "id": "chatcmpl-123",
            "model": "gpt-3.5-turbo",
            "choices": [{
                "message": { "role": "assistant", "content": "HELLO" },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 1, "total_tokens": 11 }
        });

        let client = MockHttpClient::new().with_response(TEST_URL, mock_response);
        let provider = OpenAiProvider::new(client, "sk-test");

        let response = provider.chat("gpt-3.5-turbo", step_request()).await.unwrap();

        assert_eq!(response.id, "chatcmpl-123");
        assert_eq!(response.content(), Some("HELLO"));
        assert_eq!(response.finish_reason, Some(FinishReason::Stop));
        assert_eq!(response.usage.unwrap().total_tokens, 11);
    }

    #[tokio::test]
    async fn test_request_body_and_auth_header() {
        let client = MockHttpClient::new().with_response(
            TEST_URL,
            serde_json::json!({ "choices": [{ "message": { "content": "ok" } }] }),
        );
        let provider = OpenAiProvider::new(client, "sk-test");

        provider.chat("gpt-3.5-turbo", step_request()).await.unwrap();

        let body = provider.client.last_body().unwrap();
        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "hello");
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(
            provider.client.last_header("authorization").as_deref(),
            Some("Bearer sk-test")
        );
    }

    #[tokio::test]
    async fn test_no_choices_is_empty_completion() {
        let client = MockHttpClient::new()
            .with_response(TEST_URL, serde_json::json!({ "id": "x", "choices": [] }));
        let provider = OpenAiProvider::new(client, "sk-test");

        let response = provider.chat("gpt-3.5-turbo", step_request()).await.unwrap();
        assert!(response.content().is_none());
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let client = MockHttpClient::new()
            .with_response(TEST_URL, serde_json::json!({ "choices": "nope" }));
        let provider = OpenAiProvider::new(client, "sk-test");

        let error = provider.chat("gpt-3.5-turbo", step_request()).await.unwrap_err();
        assert_eq!(error.upstream_kind(), Some(UpstreamErrorKind::MalformedResponse));
    }

    #[tokio::test]
    async fn test_openai_error_handling() {
        let client = MockHttpClient::new().with_error(
            TEST_URL,
            UpstreamErrorKind::Unauthorized,
            "Incorrect API key provided",
        );
        let provider = OpenAiProvider::new(client, "invalid-key");

        let error = provider.chat("gpt-3.5-turbo", step_request()).await.unwrap_err();
        assert_eq!(error.upstream_kind(), Some(UpstreamErrorKind::Unauthorized));
    }

    #[tokio::test]
    async fn test_openai_custom_base_url() {
        let custom_url = "http://localhost:8080/v1/chat/completions";
        let client = MockHttpClient::new().with_response(
            custom_url,
            serde_json::json!({ "choices": [{ "message": { "content": "Custom" } }] }),
        );
        let provider = OpenAiProvider::with_base_url(client, "sk-test", "http://localhost:8080/");

        let response = provider.chat("gpt-4o", step_request()).await.unwrap();
        assert_eq!(response.content(), Some("Custom"));
    }
}
