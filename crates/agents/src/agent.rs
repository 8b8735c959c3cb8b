//! Agent base: identity, lifecycle status and bounded memory.
//!
//! Every specialist is an [`Agent`] wrapped around a [`TaskProcessor`]. The
//! wrapper owns the state machine:
//!
//! ```text
//!            execute()             Ok(result)
//!   idle ───────────────► running ───────────► completed
//!                            │   ▲                 │
//!                  Err(e)    │   └── execute() ────┤
//!                            ▼                     │
//!                          failed ◄────────────────┘
//! ```
//!
//! Concurrent `execute` calls on one agent are allowed and race on the
//! status field; wrap the agent in a [`SerializedAgent`](crate::SerializedAgent)
//! when calls must not overlap.

use async_trait::async_trait;
use luxrig_common::{AgentCapability, AgentStatus, LuxError, Result};
use luxrig_memory::{MemoryBridge, MemoryEntry, MemoryLog};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Identity and display metadata of an agent. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentProfile {
    pub id: String,
    pub name: String,
    pub description: String,
    pub capabilities: Vec<AgentCapability>,
}

impl AgentProfile {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            capabilities: Vec::new(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: &[AgentCapability]) -> Self {
        for cap in capabilities {
            if !self.capabilities.contains(cap) {
                self.capabilities.push(*cap);
            }
        }
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// Domain behaviour of an agent.
#[async_trait]
pub trait TaskProcessor: Send + Sync {
    type Task: Serialize + Send + Sync + 'static;
    type Output: Serialize + Send + 'static;

    /// Default identity for agents built around this processor.
    fn profile(&self) -> AgentProfile;

    /// Run one task. Processors that do not override this fail with
    /// [`LuxError::NotImplemented`].
    async fn process_task(&self, _task: &Self::Task) -> Result<Self::Output> {
        Err(LuxError::NotImplemented(self.profile().name))
    }
}

/// A processor with no domain behaviour of its own.
#[derive(Debug, Clone)]
pub struct BaseProcessor {
    profile: AgentProfile,
}

impl BaseProcessor {
    pub fn new(profile: AgentProfile) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl TaskProcessor for BaseProcessor {
    type Task = serde_json::Value;
    type Output = serde_json::Value;

    fn profile(&self) -> AgentProfile {
        self.profile.clone()
    }
}

/// Stateful wrapper that runs tasks through a processor.
pub struct Agent<P: TaskProcessor> {
    profile: AgentProfile,
    processor: P,
    status: RwLock<AgentStatus>,
    memory: Mutex<MemoryLog>,
    current_task: Mutex<Option<serde_json::Value>>,
    bridge: Option<Arc<dyn MemoryBridge>>,
}

impl<P: TaskProcessor> Agent<P> {
    pub fn new(processor: P) -> Self {
        let profile = processor.profile();
        Self::with_profile(profile, processor)
    }

    pub fn with_profile(profile: AgentProfile, processor: P) -> Self {
        debug!(agent = %profile.id, "Creating agent");
        Self {
            profile,
            processor,
            status: RwLock::new(AgentStatus::Idle),
            memory: Mutex::new(MemoryLog::new()),
            current_task: Mutex::new(None),
            bridge: None,
        }
    }

    /// Mirror memory to `bridge`. Call [`Agent::hydrate`] to load history.
    pub fn with_bridge(mut self, bridge: Arc<dyn MemoryBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn id(&self) -> &str {
        &self.profile.id
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }

    pub fn description(&self) -> &str {
        &self.profile.description
    }

    pub fn capabilities(&self) -> &[AgentCapability] {
        &self.profile.capabilities
    }

    pub fn has_capability(&self, cap: AgentCapability) -> bool {
        self.profile.capabilities.contains(&cap)
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    pub fn status(&self) -> AgentStatus {
        *self.status.read()
    }

    pub fn has_bridge(&self) -> bool {
        self.bridge.is_some()
    }

    /// The task most recently passed to [`Agent::execute`].
    pub fn current_task(&self) -> Option<serde_json::Value> {
        self.current_task.lock().clone()
    }

    /// Snapshot of working memory, oldest first.
    pub fn memory(&self) -> Vec<MemoryEntry> {
        self.memory.lock().snapshot()
    }

    pub fn memory_len(&self) -> usize {
        self.memory.lock().len()
    }

    /// Run `task` through the processor.
    ///
    /// The status flips to `running` as soon as this is called, before the
    /// returned future is polled. On success the task and result are
    /// recorded in memory and the status becomes `completed`; on failure the
    /// status becomes `failed`, nothing is recorded and the error is returned
    /// unchanged.
    pub fn execute(&self, task: P::Task) -> impl Future<Output = Result<P::Output>> + Send + '_ {
        self.set_status(AgentStatus::Running);
        let task_value = snapshot(&task);
        *self.current_task.lock() = Some(task_value.clone());
        info!(agent = %self.profile.id, "Executing task");

        async move {
            match self.processor.process_task(&task).await {
                Ok(output) => {
                    self.add_to_memory(MemoryEntry::new(task_value, snapshot(&output)))
                        .await;
                    self.set_status(AgentStatus::Completed);
                    info!(agent = %self.profile.id, "Task completed");
                    Ok(output)
                }
                Err(e) => {
                    self.set_status(AgentStatus::Failed);
                    warn!(agent = %self.profile.id, error = %e, "Task failed");
                    Err(e)
                }
            }
        }
    }

    /// Append to working memory, evicting the oldest entries past capacity,
    /// then write through to the bridge if one is attached.
    pub async fn add_to_memory(&self, entry: MemoryEntry) {
        self.memory.lock().push(entry.clone());

        if let Some(bridge) = &self.bridge {
            if let Err(e) = bridge.set(&self.profile.id, &entry).await {
                warn!(agent = %self.profile.id, error = %e, "Failed to persist memory entry");
            }
        }
    }

    /// The newest `limit` entries, preferring the bridge's view of history.
    pub async fn recent_memory(&self, limit: usize) -> Vec<MemoryEntry> {
        if let Some(bridge) = &self.bridge {
            match bridge.get_all(&self.profile.id).await {
                Ok(entries) => {
                    let skip = entries.len().saturating_sub(limit);
                    return entries.into_iter().skip(skip).collect();
                }
                Err(e) => {
                    warn!(agent = %self.profile.id, error = %e, "Failed to read memory from bridge");
                }
            }
        }
        self.memory.lock().recent(limit)
    }

    /// Replace working memory with the history stored in the bridge.
    ///
    /// Returns the number of entries loaded. Bridge failures leave memory
    /// untouched and load nothing.
    pub async fn hydrate(&self) -> usize {
        let Some(bridge) = &self.bridge else {
            return 0;
        };

        match bridge.get_all(&self.profile.id).await {
            Ok(entries) => {
                let log = MemoryLog::from_entries(entries);
                let loaded = log.len();
                *self.memory.lock() = log;
                debug!(agent = %self.profile.id, loaded, "Hydrated memory from bridge");
                loaded
            }
            Err(e) => {
                warn!(agent = %self.profile.id, error = %e, "Failed to load memory from bridge");
                0
            }
        }
    }

    /// Back to `idle` with empty memory, here and in the bridge.
    pub async fn reset(&self) {
        self.set_status(AgentStatus::Idle);
        *self.current_task.lock() = None;
        self.memory.lock().clear();

        if let Some(bridge) = &self.bridge {
            if let Err(e) = bridge.clear(&self.profile.id).await {
                warn!(agent = %self.profile.id, error = %e, "Failed to clear bridged memory");
            }
        }
        info!(agent = %self.profile.id, "Agent reset");
    }

    fn set_status(&self, status: AgentStatus) {
        *self.status.write() = status;
    }
}

fn snapshot<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        warn!(error = %e, "Value could not be recorded in memory");
        serde_json::Value::Null
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use luxrig_memory::InMemoryBridge;
    use serde_json::json;

    /// Resolves with a fixed string or fails with a fixed message.
    struct Stub {
        outcome: std::result::Result<&'static str, &'static str>,
    }

    #[async_trait]
    impl TaskProcessor for Stub {
        type Task = String;
        type Output = String;

        fn profile(&self) -> AgentProfile {
            AgentProfile::new("test-agent", "Test Agent", "A test agent")
        }

        async fn process_task(&self, _task: &String) -> Result<String> {
            tokio::task::yield_now().await;
            match self.outcome {
                Ok(result) => Ok(result.to_string()),
                Err(msg) => Err(LuxError::TaskFailed(msg.to_string())),
            }
        }
    }

    fn resolving() -> Agent<Stub> {
        Agent::new(Stub {
            outcome: Ok("result"),
        })
    }

    fn rejecting() -> Agent<Stub> {
        Agent::new(Stub {
            outcome: Err("Task failed"),
        })
    }

    #[test]
    fn initializes_idle_with_empty_memory() {
        let agent = resolving();
        assert_eq!(agent.id(), "test-agent");
        assert_eq!(agent.name(), "Test Agent");
        assert_eq!(agent.description(), "A test agent");
        assert_eq!(agent.status(), AgentStatus::Idle);
        assert!(agent.memory().is_empty());
        assert!(agent.current_task().is_none());
    }

    #[tokio::test]
    async fn add_to_memory_appends() {
        let agent = resolving();
        let entry = MemoryEntry::new(json!("test"), json!("success"));
        agent.add_to_memory(entry.clone()).await;
        assert_eq!(agent.memory().len(), 1);
        assert_eq!(agent.memory()[0], entry);
    }

    #[tokio::test]
    async fn memory_is_limited_to_one_hundred() {
        let agent = resolving();
        for i in 0..105 {
            agent
                .add_to_memory(MemoryEntry::new(json!({ "id": i }), json!(null)))
                .await;
        }
        let memory = agent.memory();
        assert_eq!(memory.len(), 100);
        assert_eq!(memory[99].task, json!({ "id": 104 }));
        assert_eq!(memory[0].task, json!({ "id": 5 }));
    }

    #[tokio::test]
    async fn status_is_running_before_the_future_settles() {
        let agent = resolving();

        let pending = agent.execute("task".to_string());
        assert_eq!(agent.status(), AgentStatus::Running);

        let result = pending.await.unwrap();
        assert_eq!(result, "result");
        assert_eq!(agent.status(), AgentStatus::Completed);
        assert_eq!(agent.current_task(), Some(json!("task")));
    }

    #[tokio::test]
    async fn success_records_task_and_result() {
        let agent = resolving();
        agent.execute("task".to_string()).await.unwrap();

        let memory = agent.memory();
        assert_eq!(memory.len(), 1);
        assert_eq!(memory[0].task, json!("task"));
        assert_eq!(memory[0].result, json!("result"));
    }

    #[tokio::test]
    async fn failure_propagates_message_and_records_nothing() {
        let agent = rejecting();

        let err = agent.execute("task".to_string()).await.unwrap_err();
        assert_eq!(err.to_string(), "Task failed");
        assert_eq!(agent.status(), AgentStatus::Failed);
        assert!(agent.memory().is_empty());
    }

    /// Sleeps for `task` milliseconds, then echoes it.
    struct Sleeper;

    #[async_trait]
    impl TaskProcessor for Sleeper {
        type Task = u64;
        type Output = u64;

        fn profile(&self) -> AgentProfile {
            AgentProfile::new("sleeper-agent", "Sleeper Agent", "Finishes after a delay")
        }

        async fn process_task(&self, task: &u64) -> Result<u64> {
            tokio::time::sleep(std::time::Duration::from_millis(*task)).await;
            Ok(*task)
        }
    }

    #[tokio::test]
    async fn memory_follows_completion_order() {
        let agent = Agent::new(Sleeper);

        let (slow, fast) = tokio::join!(agent.execute(40), agent.execute(5));
        assert_eq!(slow.unwrap(), 40);
        assert_eq!(fast.unwrap(), 5);

        let memory = agent.memory();
        assert_eq!(memory.len(), 2);
        assert_eq!(memory[0].task, json!(5));
        assert_eq!(memory[1].task, json!(40));
        assert_eq!(agent.status(), AgentStatus::Completed);
    }

    #[tokio::test]
    async fn each_execute_reenters_running() {
        let agent = rejecting();
        let _ = agent.execute("a".to_string()).await;
        assert_eq!(agent.status(), AgentStatus::Failed);

        let pending = agent.execute("b".to_string());
        assert_eq!(agent.status(), AgentStatus::Running);
        let _ = pending.await;
        assert_eq!(agent.status(), AgentStatus::Failed);
    }

    #[tokio::test]
    async fn unspecialized_processor_is_not_implemented() {
        let agent = Agent::new(BaseProcessor::new(AgentProfile::new(
            "base",
            "Base Agent",
            "No behaviour",
        )));

        let err = agent.execute(json!({})).await.unwrap_err();
        assert!(matches!(err, LuxError::NotImplemented(_)));
        assert_eq!(agent.status(), AgentStatus::Failed);
    }

    #[tokio::test]
    async fn bridge_receives_writes_and_hydrates_new_agents() {
        let bridge = Arc::new(InMemoryBridge::new());

        let first = resolving().with_bridge(bridge.clone());
        first.execute("one".to_string()).await.unwrap();
        first.execute("two".to_string()).await.unwrap();
        assert_eq!(bridge.len("test-agent").await, 2);

        let second = resolving().with_bridge(bridge.clone());
        assert!(second.memory().is_empty());
        assert_eq!(second.hydrate().await, 2);
        assert_eq!(second.memory()[1].task, json!("two"));

        let recent = second.recent_memory(1).await;
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].task, json!("two"));
    }

    #[tokio::test]
    async fn reset_clears_memory_and_bridge() {
        let bridge = Arc::new(InMemoryBridge::new());
        let agent = resolving().with_bridge(bridge.clone());
        agent.execute("task".to_string()).await.unwrap();

        agent.reset().await;

        assert_eq!(agent.status(), AgentStatus::Idle);
        assert!(agent.memory().is_empty());
        assert!(agent.current_task().is_none());
        assert_eq!(bridge.len("test-agent").await, 0);
    }

    #[tokio::test]
    async fn hydrate_without_bridge_loads_nothing() {
        let agent = resolving();
        assert_eq!(agent.hydrate().await, 0);
        assert!(!agent.has_bridge());
    }

    #[test]
    fn profile_capabilities_are_deduplicated() {
        let profile = AgentProfile::new("a", "A", "").with_capabilities(&[
            AgentCapability::WebSearch,
            AgentCapability::WebSearch,
            AgentCapability::DocumentAnalysis,
        ]);
        assert_eq!(profile.capabilities.len(), 2);
    }
}
