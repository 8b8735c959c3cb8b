//! Agent execution core for LuxRig.
//!
//! This crate provides the agent base and the specialists built on it:
//!
//! - **Research Agent**: fans a query out to web, drive and calendar sources
//! - **Code Agent**: heuristic review, security scan, test plans, generation
//! - **Revenue Agent**: mining profitability from live coin prices
//! - **Task Agent**: meetings, project workflows and free-form prompts
//! - **Housekeeper Agent**: folder sync, git backups, disk usage and cleanup estimates
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      AgentRegistry                          │
//! │        create_agent("code") ──► AnyAgent::Code(..)          │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────┐  ┌─────────┐  ┌─────────┐  ┌─────────┐  ┌────┐ │
//! │  │Research │  │  Code   │  │ Revenue │  │  Task   │  │ HK │ │
//! │  └────┬────┘  └────┬────┘  └────┬────┘  └────┬────┘  └─┬──┘ │
//! │       └────────────┴─────┬──────┴────────────┴─────────┘    │
//! │                          ▼                                  │
//! │        Agent<P>: status, bounded memory, bridge             │
//! │                          │                                  │
//! │            ┌─────────────┼──────────────┐                   │
//! │            ▼             ▼              ▼                   │
//! │      MemoryBridge   ModelFallback    PriceFeed              │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod agent;
pub mod backup;
pub mod code;
pub mod housekeeper;
pub mod prices;
pub mod registry;
pub mod research;
pub mod revenue;
pub mod scheduler;
pub mod serialized;

pub use agent::{Agent, AgentProfile, BaseProcessor, TaskProcessor};
pub use code::CodeAgent;
pub use backup::BackupStatus;
pub use housekeeper::{format_bytes, DiskStatus, HousekeeperAgent, SyncConfig};
pub use prices::{
    build_price_feed, CoinGeckoFeed, FallbackPriceFeed, PriceConfig, PriceFeed, StaticPriceFeed,
};
pub use registry::{available_types, AgentKind, AgentRegistry, AnyAgent, AnyOutput, AnyTask};
pub use research::ResearchAgent;
pub use revenue::RevenueAgent;
pub use scheduler::{submit, TaskAgent, TaskRequest};
pub use serialized::SerializedAgent;
