use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Lifecycle status shared by workflows and their tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Not run yet.
    #[default]
    NotStarted,
    /// Currently executing.
    Running,
    /// Finished successfully.
    Success,
    /// Stopped by a pause request; can be resumed.
    Paused,
    /// Stopped by a failure.
    Error,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::NotStarted => write!(f, "NOT_STARTED"),
            RunStatus::Running => write!(f, "RUNNING"),
            RunStatus::Success => write!(f, "SUCCESS"),
            RunStatus::Paused => write!(f, "PAUSED"),
            RunStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Execution record of one task within one workflow instance.
///
/// Created the first time the task is about to run and kept across resumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRunStat {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: RunStatus,
    /// Pause reason or error message of the last attempt.
    pub status_text: Option<String>,
    /// Output captured from the last successful run.
    pub output: Option<Value>,
}

impl Default for TaskRunStat {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRunStat {
    pub fn new() -> Self {
        Self {
            start_time: Utc::now(),
            end_time: None,
            status: RunStatus::NotStarted,
            status_text: None,
            output: None,
        }
    }

    pub(crate) fn mark_running(&mut self) {
        self.status = RunStatus::Running;
        self.status_text = None;
        self.end_time = None;
    }

    pub(crate) fn mark_success(&mut self, output: Option<Value>) {
        self.status = RunStatus::Success;
        self.end_time = Some(Utc::now());
        self.output = output;
    }

    pub(crate) fn mark_paused(&mut self, reason: String) {
        self.status = RunStatus::Paused;
        self.end_time = Some(Utc::now());
        self.status_text = Some(reason);
    }

    pub(crate) fn mark_error(&mut self, details: String) {
        self.status = RunStatus::Error;
        self.end_time = Some(Utc::now());
        self.status_text = Some(details);
    }

    /// Time between start and end, if the task has ended.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.end_time.map(|end| end - self.start_time)
    }
}
