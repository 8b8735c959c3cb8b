use std::sync::Arc;
use std::time::Duration;

use luxrig_common::{LuxError, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::LlmClient;
use crate::fallback::ModelFallback;
use crate::openai::OpenAiCompatClient;

const GEMINI_OPENAI_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Falls back to the `LUXRIG_LLM_API_KEY` environment variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Tried in order; the first entry is the primary model.
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    #[serde(default = "default_fallback_delay")]
    pub fallback_delay_ms: u64,
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

fn default_api_url() -> String {
    GEMINI_OPENAI_URL.to_string()
}

fn default_models() -> Vec<String> {
    vec![
        "gemini-2.5-pro".into(),
        "gemini-2.0-flash".into(),
        "gemini-2.0-flash-lite".into(),
    ]
}

fn default_fallback_delay() -> u64 {
    2000
}

fn default_timeout() -> u64 {
    30_000
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            models: default_models(),
            fallback_delay_ms: default_fallback_delay(),
            timeout_ms: default_timeout(),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Build the HTTP client and wrap it in a model fallback chain.
pub fn build_fallback(config: &LlmConfig) -> Result<ModelFallback> {
    let primary = config
        .models
        .first()
        .cloned()
        .ok_or_else(|| LuxError::Config("llm.models must list at least one model".to_string()))?;

    let api_key = config
        .api_key
        .clone()
        .or_else(|| std::env::var("LUXRIG_LLM_API_KEY").ok());

    let client = OpenAiCompatClient::new(Some(config.api_url.clone()), primary, api_key)
        .with_sampling(config.temperature, config.max_tokens)
        .with_timeout(Duration::from_millis(config.timeout_ms))?;

    info!(
        api_url = %config.api_url,
        models = ?config.models,
        "Configured language model fallback chain"
    );

    let client: Arc<dyn LlmClient> = Arc::new(client);
    Ok(ModelFallback::new(client, config.models.clone())
        .with_delay(Duration::from_millis(config.fallback_delay_ms)))
}
