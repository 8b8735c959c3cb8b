//! Task agent - turns `{type, prompt}` requests into units of work.
//!
//! Requests can run inline through [`Agent::execute`] or in the background
//! through [`submit`], which records a job the caller can poll.

use crate::agent::{Agent, AgentProfile, TaskProcessor};
use async_trait::async_trait;
use luxrig_common::{now_millis, AgentCapability, LuxError, Result};
use luxrig_llm::{ModelFallback, DEGRADED_RESPONSE};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info};

const CREATE_PROJECT: &str = "create project";

/// Finished jobs kept in the ledger before the oldest are dropped.
pub const DEFAULT_FINISHED_JOBS: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    /// `meeting`, `workflow`, or anything else for a free-form prompt
    #[serde(rename = "type")]
    pub kind: String,
    pub prompt: String,
}

impl TaskRequest {
    pub fn new(kind: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            prompt: prompt.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingDetails {
    pub topic: String,
    pub participants: Vec<String>,
    pub time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TaskOutcome {
    Scheduled { details: MeetingDetails },
    ProjectCreated { path: PathBuf },
    Chat { reply: String, degraded: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// A background request and where it got to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub request: TaskRequest,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: u64,
    pub updated_at: u64,
}

/// Scheduling agent for meetings, project workflows and free-form prompts.
pub struct TaskAgent {
    llm: Option<Arc<ModelFallback>>,
    projects_root: PathBuf,
    jobs: RwLock<HashMap<String, JobRecord>>,
    max_finished_jobs: usize,
}

impl TaskAgent {
    pub fn new(projects_root: impl Into<PathBuf>) -> Self {
        Self {
            llm: None,
            projects_root: projects_root.into(),
            jobs: RwLock::new(HashMap::new()),
            max_finished_jobs: DEFAULT_FINISHED_JOBS,
        }
    }

    /// Keep at most `max` finished jobs. Pending and running jobs are never
    /// dropped.
    pub fn with_max_finished_jobs(mut self, max: usize) -> Self {
        self.max_finished_jobs = max;
        self
    }

    pub fn with_llm(mut self, llm: Arc<ModelFallback>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn job(&self, id: &str) -> Option<JobRecord> {
        self.jobs.read().get(id).cloned()
    }

    pub fn jobs(&self) -> Vec<JobRecord> {
        let mut jobs: Vec<JobRecord> = self.jobs.read().values().cloned().collect();
        jobs.sort_by_key(|j| j.created_at);
        jobs
    }

    /// Drop every finished job. Returns how many were removed.
    pub fn prune_finished(&self) -> usize {
        let mut jobs = self.jobs.write();
        let before = jobs.len();
        jobs.retain(|_, job| !job.status.is_finished());
        before - jobs.len()
    }

    fn update_job(&self, id: &str, update: impl FnOnce(&mut JobRecord)) {
        let mut jobs = self.jobs.write();
        if let Some(job) = jobs.get_mut(id) {
            update(job);
            job.updated_at = now_millis();
        }
        Self::evict_finished(&mut jobs, self.max_finished_jobs);
    }

    fn evict_finished(jobs: &mut HashMap<String, JobRecord>, max: usize) {
        let mut finished: Vec<(u64, u64, String)> = jobs
            .values()
            .filter(|job| job.status.is_finished())
            .map(|job| (job.updated_at, job.created_at, job.id.clone()))
            .collect();
        if finished.len() <= max {
            return;
        }
        finished.sort();
        let excess = finished.len() - max;
        for (_, _, id) in finished.into_iter().take(excess) {
            jobs.remove(&id);
        }
        debug!(evicted = excess, "Evicted finished jobs");
    }

    fn schedule_meeting(&self, prompt: &str) -> TaskOutcome {
        TaskOutcome::Scheduled {
            details: MeetingDetails {
                topic: prompt.to_string(),
                participants: vec!["Architect".into(), "Lux".into(), "Guardian".into()],
                time: "Immediate".to_string(),
            },
        }
    }

    async fn create_project(&self, name: &str) -> Result<TaskOutcome> {
        let name = if name.is_empty() {
            format!("New_Project_{}", now_millis())
        } else {
            name.to_string()
        };
        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(LuxError::TaskFailed(format!("Invalid project name: {name}")));
        }

        let path = self.projects_root.join(&name);
        tokio::fs::create_dir_all(&path).await?;
        info!(path = %path.display(), "Created project");
        Ok(TaskOutcome::ProjectCreated { path })
    }

    async fn chat(&self, prompt: &str) -> TaskOutcome {
        let reply = match &self.llm {
            Some(llm) => llm.generate_or_degraded(prompt).await,
            None => DEGRADED_RESPONSE.to_string(),
        };
        let degraded = reply == DEGRADED_RESPONSE;
        TaskOutcome::Chat { reply, degraded }
    }
}

/// The project name in a `create project <name>` prompt.
fn project_name(prompt: &str) -> Option<&str> {
    let head = prompt.get(..CREATE_PROJECT.len())?;
    head.eq_ignore_ascii_case(CREATE_PROJECT)
        .then(|| prompt[CREATE_PROJECT.len()..].trim())
}

#[async_trait]
impl TaskProcessor for TaskAgent {
    type Task = TaskRequest;
    type Output = TaskOutcome;

    fn profile(&self) -> AgentProfile {
        AgentProfile::new(
            "task-agent",
            "Task Agent",
            "Schedules meetings, runs project workflows and answers prompts",
        )
        .with_capabilities(&[
            AgentCapability::TaskScheduling,
            AgentCapability::WorkflowAutomation,
        ])
    }

    async fn process_task(&self, task: &TaskRequest) -> Result<TaskOutcome> {
        info!(kind = %task.kind, prompt = %task.prompt, "Processing task request");

        match (task.kind.as_str(), project_name(&task.prompt)) {
            ("meeting", _) => Ok(self.schedule_meeting(&task.prompt)),
            ("workflow", Some(name)) => self.create_project(name).await,
            _ => Ok(self.chat(&task.prompt).await),
        }
    }
}

/// Queue `request` on `agent` and return the job id immediately.
///
/// The job starts `pending`, moves to `running` when the background task
/// picks it up and ends `completed` or `failed`.
pub fn submit(agent: &Arc<Agent<TaskAgent>>, request: TaskRequest) -> String {
    let id = format!("job_{}", uuid::Uuid::new_v4());
    let now = now_millis();
    agent.processor().jobs.write().insert(
        id.clone(),
        JobRecord {
            id: id.clone(),
            request: request.clone(),
            status: JobStatus::Pending,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        },
    );

    let agent = Arc::clone(agent);
    let job_id = id.clone();
    tokio::spawn(async move {
        let processor = agent.processor();
        processor.update_job(&job_id, |job| job.status = JobStatus::Running);

        match agent.execute(request).await {
            Ok(outcome) => match serde_json::to_value(&outcome) {
                Ok(value) => processor.update_job(&job_id, |job| {
                    job.status = JobStatus::Completed;
                    job.result = Some(value);
                }),
                Err(e) => {
                    error!(job = %job_id, error = %e, "Job result could not be recorded");
                    processor.update_job(&job_id, |job| {
                        job.status = JobStatus::Completed;
                        job.error = Some(format!("result not recorded: {e}"));
                    });
                }
            },
            Err(e) => {
                error!(job = %job_id, error = %e, "Background task failed");
                processor.update_job(&job_id, |job| {
                    job.status = JobStatus::Failed;
                    job.error = Some(e.to_string());
                });
            }
        }
    });

    id
}
