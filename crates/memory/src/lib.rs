//! Agent memory for LuxRig.
//!
//! Two layers:
//!
//! - **Working memory**: a bounded, FIFO-evicting [`MemoryLog`] owned by each
//!   agent. Holds at most [`MEMORY_CAPACITY`] task/result records.
//! - **Durable bridge**: an optional [`MemoryBridge`] that mirrors the log to
//!   external storage so history survives a restart.
//!
//! ```text
//!   Agent::execute ──► MemoryLog (hot, capped at 100)
//!                          │ write-through (best effort)
//!                          ▼
//!                    MemoryBridge ──► InMemoryBridge | JsonFileBridge
//!                          │
//!                          └──► get_all on hydrate, clear on reset
//! ```

pub mod bridge;
pub mod file;
pub mod store;
pub mod types;

pub use bridge::{InMemoryBridge, MemoryBridge};
pub use file::JsonFileBridge;
pub use store::MemoryLog;
pub use types::{BridgeBackend, MemoryConfig, MemoryEntry, MEMORY_CAPACITY};
