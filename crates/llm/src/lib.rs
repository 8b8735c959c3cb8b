pub mod client;
pub mod config;
pub mod fallback;
pub mod openai;

pub use client::{LlmClient, LlmResult};
pub use config::{build_fallback, LlmConfig};
pub use fallback::{ModelFallback, DEGRADED_RESPONSE};
pub use openai::OpenAiCompatClient;
