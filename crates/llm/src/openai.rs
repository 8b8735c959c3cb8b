use async_trait::async_trait;
use luxrig_common::LlmError;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::client::{LlmClient, LlmResult};

const DEFAULT_BASE_URL: &str = "http://localhost:11434/v1";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Client for any `/chat/completions` endpoint speaking the OpenAI format
/// (Ollama, LM Studio, Gemini's compatibility layer, ...).
pub struct OpenAiCompatClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    http_client: reqwest::Client,
}

impl OpenAiCompatClient {
    pub fn new(base_url: Option<String>, model: String, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model,
            api_key,
            temperature: None,
            max_tokens: None,
            http_client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> LlmResult<Self> {
        self.http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(self)
    }

    pub fn with_sampling(mut self, temperature: Option<f32>, max_tokens: Option<u32>) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    fn build_request_body<'a>(&'a self, prompt: &'a str, model: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Map a non-success HTTP status onto the collaborator error kinds.
    fn classify(status: StatusCode, model: &str, body: &str) -> LlmError {
        match status {
            StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited {
                model: model.to_string(),
            },
            StatusCode::NOT_FOUND => LlmError::ModelNotFound(model.to_string()),
            s if s.is_server_error() => LlmError::Unavailable(format!("{s}: {body}")),
            s => LlmError::Request(format!("{s}: {body}")),
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    async fn generate(&self, prompt: &str, model_hint: Option<&str>) -> LlmResult<String> {
        let model = model_hint.unwrap_or(&self.model);
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %model, url = %url, "Calling language model");

        let mut http_req = self
            .http_client
            .post(&url)
            .json(&self.build_request_body(prompt, model));
        if let Some(ref key) = self.api_key {
            http_req = http_req.bearer_auth(key);
        }

        let response = http_req.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                LlmError::Unavailable(format!("{model}: {e}"))
            } else {
                LlmError::Request(format!("{model}: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Self::classify(status, model, &body_text));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Request(format!("failed to parse response: {e}")))?;

        chat.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| LlmError::Request(format!("no choices returned by {model}")))
    }

    fn default_model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_matches_openai_format() {
        let client = OpenAiCompatClient::new(None, "gemini-2.5-pro".to_string(), None)
            .with_sampling(Some(0.7), Some(1000));

        let json = serde_json::to_value(client.build_request_body("Hello", "gemini-2.0-flash"))
            .unwrap();

        assert_eq!(json["model"], "gemini-2.0-flash");
        assert_eq!(json["max_tokens"], 1000);
        let messages = json["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[0]["content"], "Hello");
    }

    #[test]
    fn request_body_omits_unset_sampling() {
        let client = OpenAiCompatClient::new(None, "llama3.2".to_string(), None);
        let json = serde_json::to_value(client.build_request_body("Hi", "llama3.2")).unwrap();
        assert!(json.get("temperature").is_none());
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn status_codes_map_to_error_kinds() {
        assert_eq!(
            OpenAiCompatClient::classify(StatusCode::TOO_MANY_REQUESTS, "m", ""),
            LlmError::RateLimited { model: "m".into() }
        );
        assert_eq!(
            OpenAiCompatClient::classify(StatusCode::NOT_FOUND, "m", ""),
            LlmError::ModelNotFound("m".into())
        );
        assert!(matches!(
            OpenAiCompatClient::classify(StatusCode::SERVICE_UNAVAILABLE, "m", "down"),
            LlmError::Unavailable(_)
        ));
        assert!(matches!(
            OpenAiCompatClient::classify(StatusCode::UNAUTHORIZED, "m", "bad key"),
            LlmError::Request(_)
        ));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = OpenAiCompatClient::new(
            Some("http://localhost:1234/v1/".to_string()),
            "m".to_string(),
            None,
        );
        assert_eq!(client.base_url, "http://localhost:1234/v1");
        assert_eq!(client.default_model(), "m");
    }
}
