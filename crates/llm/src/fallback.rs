use luxrig_common::LlmError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::client::{LlmClient, LlmResult};

/// Text returned to end users when every model in the chain has failed.
pub const DEGRADED_RESPONSE: &str = "AI Service Unavailable. Please check API Key or Quota.";

/// Tries an ordered list of models, most capable first.
///
/// After a rate-limit or availability failure the chain waits
/// `base_delay * attempt` before trying the next model. Other failures move
/// on immediately.
pub struct ModelFallback {
    client: Arc<dyn LlmClient>,
    models: Vec<String>,
    base_delay: Duration,
}

impl ModelFallback {
    pub fn new(client: Arc<dyn LlmClient>, models: Vec<String>) -> Self {
        Self {
            client,
            models,
            base_delay: Duration::from_millis(2000),
        }
    }

    pub fn with_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Models in the order they will be tried.
    pub fn models(&self) -> Vec<&str> {
        if self.models.is_empty() {
            vec![self.client.default_model()]
        } else {
            self.models.iter().map(String::as_str).collect()
        }
    }

    /// Generate with fallback, failing with [`LlmError::Exhausted`] once every
    /// model has been tried.
    pub async fn generate(&self, prompt: &str) -> LlmResult<String> {
        let models = self.models();
        let mut last_error: Option<LlmError> = None;

        for (attempt, model) in models.iter().enumerate() {
            if let Some(ref prev) = last_error {
                if prev.is_recoverable() && !self.base_delay.is_zero() {
                    let delay = self.base_delay * attempt as u32;
                    info!(model = %model, delay_ms = delay.as_millis() as u64, "Waiting before next model");
                    tokio::time::sleep(delay).await;
                }
            }

            match self.client.generate(prompt, Some(model)).await {
                Ok(text) => {
                    if attempt > 0 {
                        info!(model = %model, attempt = attempt + 1, "Fallback model succeeded");
                    }
                    return Ok(text);
                }
                Err(e) => {
                    warn!(model = %model, attempt = attempt + 1, error = %e, "Model attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(LlmError::Exhausted {
            attempts: models.len(),
            last: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no models configured".to_string()),
        })
    }

    /// Generate for end-user facing content: exhaustion yields
    /// [`DEGRADED_RESPONSE`] instead of an error.
    pub async fn generate_or_degraded(&self, prompt: &str) -> String {
        match self.generate(prompt).await {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "All models failed, returning degraded response");
                DEGRADED_RESPONSE.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Fails for every model listed in `failing`, echoes the model otherwise.
    struct ScriptedClient {
        failing: Vec<(&'static str, LlmError)>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(failing: Vec<(&'static str, LlmError)>) -> Self {
            Self {
                failing,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn generate(&self, _prompt: &str, model_hint: Option<&str>) -> LlmResult<String> {
            let model = model_hint.unwrap_or("default");
            self.calls.lock().unwrap().push(model.to_string());
            match self.failing.iter().find(|(m, _)| *m == model) {
                Some((_, err)) => Err(err.clone()),
                None => Ok(format!("answer from {model}")),
            }
        }

        fn default_model(&self) -> &str {
            "default"
        }
    }

    fn chain(failing: Vec<(&'static str, LlmError)>) -> (Arc<ScriptedClient>, ModelFallback) {
        let client = Arc::new(ScriptedClient::new(failing));
        let fallback = ModelFallback::new(
            client.clone(),
            vec!["pro".into(), "flash".into(), "lite".into()],
        )
        .with_delay(Duration::ZERO);
        (client, fallback)
    }

    #[tokio::test]
    async fn primary_model_answers_first() {
        let (client, fallback) = chain(vec![]);
        assert_eq!(fallback.generate("hi").await.unwrap(), "answer from pro");
        assert_eq!(client.calls(), vec!["pro"]);
    }

    #[tokio::test]
    async fn falls_back_in_order() {
        let (client, fallback) = chain(vec![
            ("pro", LlmError::RateLimited { model: "pro".into() }),
            ("flash", LlmError::ModelNotFound("flash".into())),
        ]);
        assert_eq!(fallback.generate("hi").await.unwrap(), "answer from lite");
        assert_eq!(client.calls(), vec!["pro", "flash", "lite"]);
    }

    #[tokio::test]
    async fn exhaustion_reports_last_error() {
        let (_, fallback) = chain(vec![
            ("pro", LlmError::RateLimited { model: "pro".into() }),
            ("flash", LlmError::RateLimited { model: "flash".into() }),
            ("lite", LlmError::Unavailable("503".into())),
        ]);
        match fallback.generate("hi").await {
            Err(LlmError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert!(last.contains("503"));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn degraded_response_when_exhausted() {
        let (_, fallback) = chain(vec![
            ("pro", LlmError::Request("401".into())),
            ("flash", LlmError::Request("401".into())),
            ("lite", LlmError::Request("401".into())),
        ]);
        assert_eq!(fallback.generate_or_degraded("hi").await, DEGRADED_RESPONSE);
    }

    #[tokio::test]
    async fn empty_model_list_uses_client_default() {
        let client = Arc::new(ScriptedClient::new(vec![]));
        let fallback = ModelFallback::new(client.clone(), vec![]);
        assert_eq!(fallback.models(), vec!["default"]);
        assert_eq!(fallback.generate("hi").await.unwrap(), "answer from default");
    }
}
