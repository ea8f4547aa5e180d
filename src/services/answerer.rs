//! Client for the hosted chat model that turns a prompt into an answer.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::GenerationError;
use crate::models::LlmConfig;

/// Produces a text completion for a fully composed prompt.
#[async_trait]
pub trait Answerer: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Model name, for status output.
    fn model(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<RequestMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// OpenAI-compatible `chat/completions` client (Groq by default).
#[derive(Debug, Clone)]
pub struct ChatCompletionClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl ChatCompletionClient {
    pub fn new(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self, GenerationError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(GenerationError::MissingApiKey(config.api_key_env.clone()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    /// Read the API key from the environment variable named in `config`.
    pub fn from_config(config: &LlmConfig) -> Result<Self, GenerationError> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| GenerationError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(config, api_key)
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl Answerer for ChatCompletionClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        debug!(model = %self.model, prompt_len = prompt.len(), "requesting completion");

        let request = ChatRequest {
            model: &self.model,
            messages: vec![RequestMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .inspect_err(|e| error!(error = %e, "completion request failed"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            error!(%status, "completion API error");
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        extract_completion(body)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn extract_completion(response: ChatResponse) -> Result<String, GenerationError> {
    let text = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| GenerationError::InvalidResponse("no choices in response".to_string()))?
        .message
        .content
        .unwrap_or_default();

    let text = text.trim();
    if text.is_empty() {
        return Err(GenerationError::EmptyCompletion);
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_key_is_missing() {
        let config = LlmConfig::default();
        assert!(matches!(
            ChatCompletionClient::new(&config, "  "),
            Err(GenerationError::MissingApiKey(name)) if name == "GROQ_API_KEY"
        ));
    }

    #[test]
    fn test_from_config_reads_named_variable() {
        let config = LlmConfig {
            api_key_env: "ARAL_TEST_UNSET_KEY_VARIABLE".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            ChatCompletionClient::from_config(&config),
            Err(GenerationError::MissingApiKey(_))
        ));
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let config = LlmConfig {
            base_url: "https://api.groq.com/openai/v1/".to_string(),
            ..Default::default()
        };
        let client = ChatCompletionClient::new(&config, "gsk_test").unwrap();
        assert_eq!(
            client.endpoint(),
            "https://api.groq.com/openai/v1/chat/completions"
        );
        assert_eq!(client.model(), "llama-3.1-8b-instant");
    }

    #[test]
    fn test_request_serialization() {
        let request = ChatRequest {
            model: "llama-3.1-8b-instant",
            messages: vec![RequestMessage {
                role: "user",
                content: "hello",
            }],
            temperature: 0.3,
            max_tokens: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_extract_completion() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"  Ang mitosis ay...  "}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_completion(body).unwrap(), "Ang mitosis ay...");

        let empty: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":""}}]}"#).unwrap();
        assert!(matches!(
            extract_completion(empty),
            Err(GenerationError::EmptyCompletion)
        ));

        let none: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            extract_completion(none),
            Err(GenerationError::InvalidResponse(_))
        ));
    }
}
