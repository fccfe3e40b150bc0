//! Client for OpenAI-compatible chat completion endpoints.

use async_trait::async_trait;
use tracing::debug;

use crate::{
    error::{ClipsmithError, Result},
    provider::Provider,
};

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send a single prompt and return the model's raw text reply.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

pub struct ChatCompletionsClient {
    http: reqwest::Client,
    api_url: String,
    model: String,
    api_key: String,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

impl ChatCompletionsClient {
    pub fn new(api_url: impl Into<String>, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into(),
            model: model.into(),
            api_key: api_key.into(),
            temperature: 0.7,
            top_p: 0.8,
            max_tokens: 2048,
        }
    }

    /// Build a client for `provider`, reading its API key from the environment.
    /// `api_url` replaces the provider's default endpoint when given.
    pub fn for_provider(provider: Provider, api_url: Option<String>) -> Result<Self> {
        let config = provider.config();
        let api_key = provider.validate_api_key()?;
        Ok(Self::new(
            api_url.unwrap_or_else(|| config.api_url.to_string()),
            config.model,
            api_key,
        ))
    }
}

#[async_trait]
impl LanguageModel for ChatCompletionsClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!(url = %self.api_url, model = %self.model, prompt_len = prompt.len(), "sending completion request");
        let response = self
            .http
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({
                "model": self.model,
                "messages": [
                    {
                        "role": "user",
                        "content": prompt,
                    },
                ],
                "temperature": self.temperature,
                "top_p": self.top_p,
                "max_tokens": self.max_tokens,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClipsmithError::ModelRequestFailed {
                reason: format!("HTTP {}: {}", status, body),
            });
        }

        let response = response.json::<serde_json::Value>().await?;
        let content = response["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ClipsmithError::ModelRequestFailed {
                reason: format!("Invalid API response: {:?}", response),
            })?;

        Ok(content.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path},
    };

    #[tokio::test]
    async fn returns_first_choice_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "[]"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ChatCompletionsClient::new(
            format!("{}/v1/chat/completions", server.uri()),
            "test-model",
            "test-key",
        );
        assert_eq!(client.complete("hello").await.unwrap(), "[]");
    }

    #[tokio::test]
    async fn http_error_is_a_request_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let client = ChatCompletionsClient::new(server.uri(), "m", "k");
        let err = client.complete("hello").await.unwrap_err();
        assert!(matches!(err, ClipsmithError::ModelRequestFailed { .. }));
        assert!(!err.is_client_error());
    }

    #[tokio::test]
    async fn response_without_choices_is_a_request_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"error": "nope"})))
            .mount(&server)
            .await;

        let client = ChatCompletionsClient::new(server.uri(), "m", "k");
        let err = client.complete("hello").await.unwrap_err();
        assert!(matches!(err, ClipsmithError::ModelRequestFailed { .. }));
    }
}
