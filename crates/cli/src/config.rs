//! Runner configuration, loaded from TOML.
//!
//! Every section is optional. A missing `[llm]` section means no language
//! model: research stays offline, code generation fails and task prompts
//! get the degraded reply.

use anyhow::Context;
use luxrig_agents::{build_price_feed, AgentRegistry, PriceConfig, SyncConfig};
use luxrig_llm::{build_fallback, LlmConfig};
use luxrig_memory::{BridgeBackend, InMemoryBridge, JsonFileBridge, MemoryBridge, MemoryConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmConfig>,

    #[serde(default)]
    pub prices: PriceConfig,

    #[serde(default)]
    pub memory: MemoryConfig,

    /// Where the task agent creates project directories
    #[serde(default = "default_projects_root")]
    pub projects_root: PathBuf,

    /// Initial housekeeper sync settings
    #[serde(default)]
    pub sync: SyncConfig,
}

fn default_projects_root() -> PathBuf {
    PathBuf::from("projects")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: None,
            prices: PriceConfig::default(),
            memory: MemoryConfig::default(),
            projects_root: default_projects_root(),
            sync: SyncConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid config file '{}'", path.display()))?;

        if config.llm.as_ref().is_some_and(|llm| llm.api_key.is_some()) {
            warn!(
                "API key found in config file '{}'. Prefer the LUXRIG_LLM_API_KEY environment variable.",
                path.display()
            );
        }
        Ok(config)
    }

    /// Build the durable bridge named by `[memory]`, if any.
    pub async fn build_bridge(&self) -> anyhow::Result<Option<Arc<dyn MemoryBridge>>> {
        let bridge: Arc<dyn MemoryBridge> = match self.memory.backend {
            BridgeBackend::None => return Ok(None),
            BridgeBackend::Memory => Arc::new(InMemoryBridge::new()),
            BridgeBackend::File => Arc::new(
                JsonFileBridge::open(self.memory.path.clone())
                    .await
                    .with_context(|| {
                        format!("Failed to open memory dir '{}'", self.memory.path.display())
                    })?,
            ),
        };
        info!(backend = ?self.memory.backend, "Memory bridge ready");
        Ok(Some(bridge))
    }

    /// Wire a registry from this configuration.
    pub async fn build_registry(&self) -> anyhow::Result<AgentRegistry> {
        let prices = build_price_feed(&self.prices)?;
        let mut registry = AgentRegistry::new(prices)
            .with_projects_root(self.projects_root.clone())
            .with_sync_defaults(self.sync.clone());

        if let Some(llm) = &self.llm {
            registry = registry.with_llm(Arc::new(build_fallback(llm)?));
        }
        if let Some(bridge) = self.build_bridge().await? {
            registry = registry.with_bridge(bridge);
        }
        Ok(registry)
    }
}
