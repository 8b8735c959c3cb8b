//! Common types shared across the LuxRig agent crates.
//!
//! Everything an agent, a collaborator adapter or the registry needs to agree
//! on lives here so the leaf crates never depend on each other sideways.

pub mod capability;
pub mod error;
pub mod status;

pub use capability::AgentCapability;
pub use error::{LlmError, LuxError, Result};
pub use status::AgentStatus;

/// Current wall-clock time as Unix milliseconds.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
