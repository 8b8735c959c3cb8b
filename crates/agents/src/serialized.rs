//! Opt-in single-flight execution for an agent.

use crate::agent::{Agent, TaskProcessor};
use luxrig_common::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Runs tasks on a shared [`Agent`] one at a time.
///
/// Calls queue on an async mutex in arrival order, so the status a caller
/// observes after its call returns belongs to its own task. Calls made on the
/// inner agent directly bypass the gate.
pub struct SerializedAgent<P: TaskProcessor> {
    agent: Arc<Agent<P>>,
    gate: Mutex<()>,
}

impl<P: TaskProcessor> SerializedAgent<P> {
    pub fn new(agent: Agent<P>) -> Self {
        Self::from_shared(Arc::new(agent))
    }

    pub fn from_shared(agent: Arc<Agent<P>>) -> Self {
        Self {
            agent,
            gate: Mutex::new(()),
        }
    }

    pub fn agent(&self) -> &Arc<Agent<P>> {
        &self.agent
    }

    pub async fn execute(&self, task: P::Task) -> Result<P::Output> {
        let _turn = self.gate.lock().await;
        debug!(agent = %self.agent.id(), "Acquired execution slot");
        self.agent.execute(task).await
    }
}
