//! Error types for LuxRig.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LuxError {
    #[error("Unknown agent type: {requested}. Available: {available}")]
    UnknownAgentType { requested: String, available: String },

    #[error("process_task must be implemented by the {0} agent")]
    NotImplemented(String),

    /// Domain failure raised inside `process_task`. Displayed verbatim.
    #[error("{0}")]
    TaskFailed(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Task for {task_kind} agent cannot run on {agent_kind} agent")]
    TaskMismatch {
        agent_kind: String,
        task_kind: String,
    },

    #[error("Language model error: {0}")]
    Llm(#[from] LlmError),

    #[error("Price feed error: {0}")]
    Price(String),

    #[error("Memory error: {0}")]
    Memory(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures reported by a language-model collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("rate limited by {model}")]
    RateLimited { model: String },

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("model service unavailable: {0}")]
    Unavailable(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("all {attempts} model attempts failed, last error: {last}")]
    Exhausted { attempts: usize, last: String },
}

impl LlmError {
    /// Whether moving on to the next model in a fallback chain can help.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimited { .. } | LlmError::ModelNotFound(_) | LlmError::Unavailable(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LuxError>;
