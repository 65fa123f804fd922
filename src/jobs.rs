//! 作业注册表
//!
//! 所有 [`JobRecord`] 由单个任务持有。写入方（保存路径与外部求解监控）和
//! 读取方都通过同一个 mpsc 通道与其通信，每条命令携带一个 oneshot 应答端。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::error::JobError;

const COMMAND_BUFFER: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Finished,
    Failed,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Finished => "finished",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Finished | JobState::Failed)
    }

    /// queued -> running -> finished | failed；queued 也可直接转为 failed
    pub fn can_transition_to(self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Queued, JobState::Running)
                | (JobState::Queued, JobState::Failed)
                | (JobState::Running, JobState::Finished)
                | (JobState::Running, JobState::Failed)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_slug: Option<String>,
    pub state: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

enum RegistryCommand {
    Register {
        job_id: String,
        profile_slug: Option<String>,
        responder: oneshot::Sender<JobRecord>,
    },
    Transition {
        job_id: String,
        state: JobState,
        detail: Option<String>,
        responder: oneshot::Sender<Result<JobRecord, JobError>>,
    },
    Get {
        job_id: String,
        responder: oneshot::Sender<Option<JobRecord>>,
    },
    List {
        responder: oneshot::Sender<Vec<JobRecord>>,
    },
}

/// 注册表任务的可克隆句柄
#[derive(Debug, Clone)]
pub struct JobRegistry {
    sender: mpsc::Sender<RegistryCommand>,
}

impl JobRegistry {
    /// 在当前 tokio 运行时上启动注册表任务
    pub fn spawn() -> Self {
        let (sender, receiver) = mpsc::channel(COMMAND_BUFFER);
        tokio::spawn(run_registry(receiver));
        Self { sender }
    }

    /// 登记作业；重复登记会重新排队，运行中的作业除外
    pub async fn register(
        &self,
        job_id: impl Into<String>,
        profile_slug: Option<String>,
    ) -> Result<JobRecord, JobError> {
        let job_id = job_id.into();
        self.request(|responder| RegistryCommand::Register {
            job_id,
            profile_slug,
            responder,
        })
        .await
    }

    pub async fn transition(
        &self,
        job_id: impl Into<String>,
        state: JobState,
        detail: Option<String>,
    ) -> Result<JobRecord, JobError> {
        let job_id = job_id.into();
        self.request(|responder| RegistryCommand::Transition {
            job_id,
            state,
            detail,
            responder,
        })
        .await?
    }

    pub async fn get(&self, job_id: impl Into<String>) -> Result<Option<JobRecord>, JobError> {
        let job_id = job_id.into();
        self.request(|responder| RegistryCommand::Get { job_id, responder })
            .await
    }

    /// 全部作业，按 id 排序
    pub async fn list(&self) -> Result<Vec<JobRecord>, JobError> {
        self.request(|responder| RegistryCommand::List { responder })
            .await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> RegistryCommand,
    ) -> Result<T, JobError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(command(tx))
            .await
            .map_err(|_| JobError::Unavailable)?;
        rx.await.map_err(|_| JobError::Unavailable)
    }
}

async fn run_registry(mut receiver: mpsc::Receiver<RegistryCommand>) {
    let mut jobs: BTreeMap<String, JobRecord> = BTreeMap::new();

    while let Some(command) = receiver.recv().await {
        match command {
            RegistryCommand::Register {
                job_id,
                profile_slug,
                responder,
            } => {
                let now = Utc::now();
                let record = jobs
                    .entry(job_id.clone())
                    .and_modify(|record| {
                        if record.state != JobState::Running {
                            record.state = JobState::Queued;
                            record.detail = None;
                            record.updated_at = now;
                        }
                        if profile_slug.is_some() {
                            record.profile_slug = profile_slug.clone();
                        }
                    })
                    .or_insert_with(|| JobRecord {
                        job_id: job_id.clone(),
                        profile_slug: profile_slug.clone(),
                        state: JobState::Queued,
                        detail: None,
                        created_at: now,
                        updated_at: now,
                    })
                    .clone();
                info!(job_id = %job_id, state = %record.state, "job registered");
                let _ = responder.send(record);
            }
            RegistryCommand::Transition {
                job_id,
                state,
                detail,
                responder,
            } => {
                let result = match jobs.get_mut(&job_id) {
                    None => Err(JobError::NotFound(job_id.clone())),
                    Some(record) if !record.state.can_transition_to(state) => {
                        Err(JobError::InvalidTransition {
                            job_id: job_id.clone(),
                            from: record.state.to_string(),
                            to: state.to_string(),
                        })
                    }
                    Some(record) => {
                        record.state = state;
                        record.detail = detail;
                        record.updated_at = Utc::now();
                        info!(job_id = %job_id, state = %state, "job state changed");
                        Ok(record.clone())
                    }
                };
                let _ = responder.send(result);
            }
            RegistryCommand::Get { job_id, responder } => {
                let _ = responder.send(jobs.get(&job_id).cloned());
            }
            RegistryCommand::List { responder } => {
                let _ = responder.send(jobs.values().cloned().collect());
            }
        }
    }

    debug!("job registry channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lifecycle_follows_allowed_transitions() {
        let registry = JobRegistry::spawn();
        let queued = registry
            .register("plate-1", Some("coolingplate-mesh-v1".into()))
            .await
            .unwrap();
        assert_eq!(queued.state, JobState::Queued);

        let running = registry
            .transition("plate-1", JobState::Running, None)
            .await
            .unwrap();
        assert_eq!(running.state, JobState::Running);

        let done = registry
            .transition("plate-1", JobState::Finished, Some("converged".into()))
            .await
            .unwrap();
        assert_eq!(done.detail.as_deref(), Some("converged"));
        assert!(done.state.is_terminal());

        let err = registry
            .transition("plate-1", JobState::Running, None)
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn unknown_job_is_reported() {
        let registry = JobRegistry::spawn();
        assert_eq!(registry.get("ghost").await.unwrap(), None);
        assert_eq!(
            registry
                .transition("ghost", JobState::Running, None)
                .await
                .unwrap_err(),
            JobError::NotFound("ghost".into())
        );
    }

    #[tokio::test]
    async fn reregistering_requeues_unless_running() {
        let registry = JobRegistry::spawn();
        registry.register("a", None).await.unwrap();
        registry.register("b", None).await.unwrap();
        registry.transition("a", JobState::Failed, None).await.unwrap();
        registry.transition("b", JobState::Running, None).await.unwrap();

        assert_eq!(registry.register("a", None).await.unwrap().state, JobState::Queued);
        assert_eq!(registry.register("b", None).await.unwrap().state, JobState::Running);

        let ids: Vec<String> = registry
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|record| record.job_id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn state_serializes_snake_case() {
        assert_eq!(serde_json::to_value(JobState::Finished).unwrap(), "finished");
    }
}
