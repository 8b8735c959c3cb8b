//! Capability tags advertised by specialist agents.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What an agent claims to be able to do.
///
/// Advisory only: callers use these for discovery and filtering, the agents
/// themselves never check them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentCapability {
    WebSearch,
    DocumentAnalysis,
    DataExtraction,
    CodeGeneration,
    CodeReview,
    SecurityScan,
    Testing,
    PriceMonitoring,
    MiningControl,
    YieldOptimization,
    TaskScheduling,
    WorkflowAutomation,
    FileSync,
    Cleanup,
    Backup,
}

impl AgentCapability {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentCapability::WebSearch => "web-search",
            AgentCapability::DocumentAnalysis => "document-analysis",
            AgentCapability::DataExtraction => "data-extraction",
            AgentCapability::CodeGeneration => "code-generation",
            AgentCapability::CodeReview => "code-review",
            AgentCapability::SecurityScan => "security-scan",
            AgentCapability::Testing => "testing",
            AgentCapability::PriceMonitoring => "price-monitoring",
            AgentCapability::MiningControl => "mining-control",
            AgentCapability::YieldOptimization => "yield-optimization",
            AgentCapability::TaskScheduling => "task-scheduling",
            AgentCapability::WorkflowAutomation => "workflow-automation",
            AgentCapability::FileSync => "file-sync",
            AgentCapability::Cleanup => "cleanup",
            AgentCapability::Backup => "backup",
        }
    }
}

impl fmt::Display for AgentCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
