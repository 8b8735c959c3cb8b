use async_trait::async_trait;
use luxrig_common::LlmError;
use std::sync::Arc;

pub type LlmResult<T> = std::result::Result<T, LlmError>;

/// A hosted language model, seen as `generate(prompt) -> text`.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a completion. `model_hint` overrides the default model.
    async fn generate(&self, prompt: &str, model_hint: Option<&str>) -> LlmResult<String>;

    fn default_model(&self) -> &str;
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for Arc<T> {
    async fn generate(&self, prompt: &str, model_hint: Option<&str>) -> LlmResult<String> {
        (**self).generate(prompt, model_hint).await
    }

    fn default_model(&self) -> &str {
        (**self).default_model()
    }
}
