//! Agent registry: builds specialists by type name and dispatches JSON tasks.
//!
//! The registry is a plain value holding the collaborators every agent is
//! wired with. Build one at startup and pass it where agents are needed.

use crate::agent::{Agent, TaskProcessor};
use crate::code::{CodeAgent, CodeOutput, CodeTask};
use crate::housekeeper::{HousekeeperAgent, HousekeeperOutput, HousekeeperTask, SyncConfig};
use crate::prices::{PriceFeed, StaticPriceFeed};
use crate::research::{ResearchAgent, ResearchReport, ResearchTask};
use crate::revenue::{RevenueAgent, RevenueOutput, RevenueTask};
use crate::scheduler::{TaskAgent, TaskOutcome, TaskRequest};
use futures::future::{self, BoxFuture};
use luxrig_common::{AgentCapability, AgentStatus, LuxError, Result};
use luxrig_llm::ModelFallback;
use luxrig_memory::{MemoryBridge, MemoryEntry};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// The fixed vocabulary of agent types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentKind {
    Research,
    Code,
    Revenue,
    Task,
    Housekeeper,
}

impl AgentKind {
    pub const ALL: [AgentKind; 5] = [
        AgentKind::Research,
        AgentKind::Code,
        AgentKind::Revenue,
        AgentKind::Task,
        AgentKind::Housekeeper,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Research => "research",
            AgentKind::Code => "code",
            AgentKind::Revenue => "revenue",
            AgentKind::Task => "task",
            AgentKind::Housekeeper => "housekeeper",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = LuxError;

    fn from_str(s: &str) -> Result<Self> {
        AgentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| LuxError::UnknownAgentType {
                requested: s.to_string(),
                available: available_types().join(", "),
            })
    }
}

/// Type names accepted by [`AgentRegistry::create_agent`].
pub fn available_types() -> Vec<&'static str> {
    AgentKind::ALL.iter().map(AgentKind::as_str).collect()
}

/// A task for any agent type.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AnyTask {
    Research(ResearchTask),
    Code(CodeTask),
    Revenue(RevenueTask),
    Task(TaskRequest),
    Housekeeper(HousekeeperTask),
}

impl AnyTask {
    pub fn kind(&self) -> AgentKind {
        match self {
            AnyTask::Research(_) => AgentKind::Research,
            AnyTask::Code(_) => AgentKind::Code,
            AnyTask::Revenue(_) => AgentKind::Revenue,
            AnyTask::Task(_) => AgentKind::Task,
            AnyTask::Housekeeper(_) => AgentKind::Housekeeper,
        }
    }

    /// Parse `value` as the task type of `kind`.
    ///
    /// An `action` the agent does not know yields [`LuxError::UnknownAction`];
    /// any other shape problem is a serialization error.
    pub fn from_json(kind: AgentKind, value: Value) -> Result<Self> {
        Ok(match kind {
            AgentKind::Research => AnyTask::Research(parse_task(value)?),
            AgentKind::Code => AnyTask::Code(parse_task(value)?),
            AgentKind::Revenue => AnyTask::Revenue(parse_task(value)?),
            AgentKind::Task => AnyTask::Task(parse_task(value)?),
            AgentKind::Housekeeper => AnyTask::Housekeeper(parse_task(value)?),
        })
    }
}

fn parse_task<T: DeserializeOwned>(value: Value) -> Result<T> {
    let action = value
        .get("action")
        .and_then(Value::as_str)
        .map(str::to_owned);

    serde_json::from_value(value).map_err(|e| match action {
        Some(action) if e.to_string().contains("unknown variant") => {
            LuxError::UnknownAction(action)
        }
        _ => LuxError::Serialization(e),
    })
}

/// The result of any agent type.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AnyOutput {
    Research(ResearchReport),
    Code(CodeOutput),
    Revenue(RevenueOutput),
    Task(TaskOutcome),
    Housekeeper(HousekeeperOutput),
}

/// One agent of any type.
pub enum AnyAgent {
    Research(Agent<ResearchAgent>),
    Code(Agent<CodeAgent>),
    Revenue(Agent<RevenueAgent>),
    Task(Agent<TaskAgent>),
    Housekeeper(Agent<HousekeeperAgent>),
}

macro_rules! each_agent {
    ($self:expr, $agent:ident => $body:expr) => {
        match $self {
            AnyAgent::Research($agent) => $body,
            AnyAgent::Code($agent) => $body,
            AnyAgent::Revenue($agent) => $body,
            AnyAgent::Task($agent) => $body,
            AnyAgent::Housekeeper($agent) => $body,
        }
    };
}

fn settle<'a, P, F>(agent: &'a Agent<P>, task: P::Task, wrap: F) -> BoxFuture<'a, Result<AnyOutput>>
where
    P: TaskProcessor,
    F: FnOnce(P::Output) -> AnyOutput + Send + 'a,
{
    let running = agent.execute(task);
    Box::pin(async move { running.await.map(wrap) })
}

impl AnyAgent {
    pub fn kind(&self) -> AgentKind {
        match self {
            AnyAgent::Research(_) => AgentKind::Research,
            AnyAgent::Code(_) => AgentKind::Code,
            AnyAgent::Revenue(_) => AgentKind::Revenue,
            AnyAgent::Task(_) => AgentKind::Task,
            AnyAgent::Housekeeper(_) => AgentKind::Housekeeper,
        }
    }

    pub fn id(&self) -> &str {
        each_agent!(self, a => a.id())
    }

    pub fn name(&self) -> &str {
        each_agent!(self, a => a.name())
    }

    pub fn description(&self) -> &str {
        each_agent!(self, a => a.description())
    }

    pub fn capabilities(&self) -> &[AgentCapability] {
        each_agent!(self, a => a.capabilities())
    }

    pub fn has_capability(&self, cap: AgentCapability) -> bool {
        each_agent!(self, a => a.has_capability(cap))
    }

    pub fn status(&self) -> AgentStatus {
        each_agent!(self, a => a.status())
    }

    pub fn memory(&self) -> Vec<MemoryEntry> {
        each_agent!(self, a => a.memory())
    }

    pub fn current_task(&self) -> Option<Value> {
        each_agent!(self, a => a.current_task())
    }

    pub async fn recent_memory(&self, limit: usize) -> Vec<MemoryEntry> {
        each_agent!(self, a => a.recent_memory(limit).await)
    }

    pub async fn hydrate(&self) -> usize {
        each_agent!(self, a => a.hydrate().await)
    }

    pub async fn reset(&self) {
        each_agent!(self, a => a.reset().await)
    }

    /// Run a typed task. The status is `running` once this returns.
    ///
    /// A task for a different agent type fails with
    /// [`LuxError::TaskMismatch`] without touching the agent.
    pub fn execute(&self, task: AnyTask) -> BoxFuture<'_, Result<AnyOutput>> {
        match (self, task) {
            (AnyAgent::Research(a), AnyTask::Research(t)) => settle(a, t, AnyOutput::Research),
            (AnyAgent::Code(a), AnyTask::Code(t)) => settle(a, t, AnyOutput::Code),
            (AnyAgent::Revenue(a), AnyTask::Revenue(t)) => settle(a, t, AnyOutput::Revenue),
            (AnyAgent::Task(a), AnyTask::Task(t)) => settle(a, t, AnyOutput::Task),
            (AnyAgent::Housekeeper(a), AnyTask::Housekeeper(t)) => {
                settle(a, t, AnyOutput::Housekeeper)
            }
            (agent, task) => Box::pin(future::ready(Err(LuxError::TaskMismatch {
                agent_kind: agent.kind().to_string(),
                task_kind: task.kind().to_string(),
            }))),
        }
    }

    /// Parse `task` as this agent's task type, run it and return the result
    /// as JSON. Tasks that fail to parse never reach the agent.
    pub fn execute_json(&self, task: Value) -> BoxFuture<'_, Result<Value>> {
        match AnyTask::from_json(self.kind(), task) {
            Ok(task) => {
                let running = self.execute(task);
                Box::pin(async move { Ok(serde_json::to_value(running.await?)?) })
            }
            Err(e) => Box::pin(future::ready(Err(e))),
        }
    }
}

/// Builds agents wired to shared collaborators.
pub struct AgentRegistry {
    llm: Option<Arc<ModelFallback>>,
    prices: Arc<dyn PriceFeed>,
    bridge: Option<Arc<dyn MemoryBridge>>,
    projects_root: PathBuf,
    sync_defaults: SyncConfig,
}

impl Default for AgentRegistry {
    /// No model, no bridge and the built-in reference quotes.
    fn default() -> Self {
        Self::new(Arc::new(StaticPriceFeed::reference()))
    }
}

impl AgentRegistry {
    pub fn new(prices: Arc<dyn PriceFeed>) -> Self {
        Self {
            llm: None,
            prices,
            bridge: None,
            projects_root: PathBuf::from("projects"),
            sync_defaults: SyncConfig::default(),
        }
    }

    pub fn with_llm(mut self, llm: Arc<ModelFallback>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_bridge(mut self, bridge: Arc<dyn MemoryBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn with_projects_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.projects_root = root.into();
        self
    }

    pub fn with_sync_defaults(mut self, config: SyncConfig) -> Self {
        self.sync_defaults = config;
        self
    }

    pub fn available_types(&self) -> Vec<&'static str> {
        available_types()
    }

    /// Build a fresh agent of `agent_type`.
    ///
    /// Agents of the same type share an id, so with a bridge attached they
    /// also share durable history.
    pub fn create_agent(&self, agent_type: &str) -> Result<AnyAgent> {
        let kind: AgentKind = agent_type.parse()?;
        info!(kind = %kind, "Creating agent");

        Ok(match kind {
            AgentKind::Research => {
                let mut processor = ResearchAgent::new();
                if let Some(llm) = &self.llm {
                    processor = processor.with_llm(Arc::clone(llm));
                }
                AnyAgent::Research(self.wrap(processor))
            }
            AgentKind::Code => {
                let mut processor = CodeAgent::new();
                if let Some(llm) = &self.llm {
                    processor = processor.with_llm(Arc::clone(llm));
                }
                AnyAgent::Code(self.wrap(processor))
            }
            AgentKind::Revenue => {
                AnyAgent::Revenue(self.wrap(RevenueAgent::new(Arc::clone(&self.prices))))
            }
            AgentKind::Task => {
                let mut processor = TaskAgent::new(self.projects_root.clone());
                if let Some(llm) = &self.llm {
                    processor = processor.with_llm(Arc::clone(llm));
                }
                AnyAgent::Task(self.wrap(processor))
            }
            AgentKind::Housekeeper => AnyAgent::Housekeeper(
                self.wrap(HousekeeperAgent::new(self.sync_defaults.clone())),
            ),
        })
    }

    /// [`create_agent`](Self::create_agent), then load its history from the bridge.
    pub async fn spawn_agent(&self, agent_type: &str) -> Result<AnyAgent> {
        let agent = self.create_agent(agent_type)?;
        let loaded = agent.hydrate().await;
        if loaded > 0 {
            info!(agent = %agent.id(), loaded, "Restored agent memory");
        }
        Ok(agent)
    }

    fn wrap<P: TaskProcessor>(&self, processor: P) -> Agent<P> {
        let agent = Agent::new(processor);
        match &self.bridge {
            Some(bridge) => agent.with_bridge(Arc::clone(bridge)),
            None => agent,
        }
    }
}
