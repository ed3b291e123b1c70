use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while building or running a workflow.
///
/// Every variant carries owned text only, so an error can be recorded on the
/// workflow, cloned back to the caller and persisted with the rest of the
/// [`WorkflowState`](crate::WorkflowState).
///
/// # Non-Exhaustive
///
/// Always include a wildcard arm when matching:
///
/// ```
/// use hataori::WorkflowError;
///
/// fn describe(error: &WorkflowError) -> String {
///     match error {
///         WorkflowError::Validation { field, details } => {
///             format!("field {} rejected: {}", field, details)
///         }
///         WorkflowError::KeyNotFound { path, .. } => format!("no context value at {}", path),
///         WorkflowError::ClassNotFound { class, searched } => {
///             format!("{} not found in {:?}", class, searched)
///         }
///         WorkflowError::TaskFailed { task, details } => format!("{} failed: {}", task, details),
///         _ => error.to_string(),
///     }
/// }
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
#[non_exhaustive]
pub enum WorkflowError {
    /// A field value failed its validator, or a required field resolved empty.
    #[error("Invalid value for field '{field}': {details}")]
    Validation {
        /// The name of the offending field.
        field: String,
        /// Why the value was rejected.
        details: String,
    },

    /// A dotted-path context read hit a missing or non-traversable segment.
    #[error("Key not found in context: '{path}' (missing segment '{segment}')")]
    KeyNotFound {
        /// The full path that was requested.
        path: String,
        /// The first segment that could not be resolved.
        segment: String,
    },

    /// No configured namespace provides the requested task class.
    #[error("Cannot resolve task class '{class}', looked up in {searched:?}")]
    ClassNotFound {
        /// The class reference as written in the definition.
        class: String,
        /// The namespaces that were probed, in order.
        searched: Vec<String>,
    },

    /// A definition supplied a parameter the task type does not declare.
    #[error("Task '{task}' has no field named '{parameter}'")]
    UnknownParameter {
        /// The task being constructed.
        task: String,
        /// The undeclared parameter.
        parameter: String,
    },

    /// A task's own work failed.
    #[error("Task failed: {task}, details: {details}")]
    TaskFailed {
        /// The task that failed.
        task: String,
        /// Details about the failure.
        details: String,
    },

    /// A task was asked to run while its last recorded status is still running.
    #[error("Task is already running: {0}")]
    TaskRunning(String),

    /// The definition document could not be read or parsed.
    #[error("Invalid workflow definition: {0}")]
    Definition(String),

    /// The workflow or a task is misconfigured.
    #[error("Invalid workflow configuration: {0}")]
    Configuration(String),
}

impl WorkflowError {
    /// Shorthand for [`WorkflowError::TaskFailed`].
    pub fn task_failed(task: impl Into<String>, details: impl Into<String>) -> Self {
        WorkflowError::TaskFailed {
            task: task.into(),
            details: details.into(),
        }
    }

    /// Shorthand for [`WorkflowError::Validation`].
    pub fn validation(field: impl Into<String>, details: impl Into<String>) -> Self {
        WorkflowError::Validation {
            field: field.into(),
            details: details.into(),
        }
    }

    /// A short, stable label for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowError::Validation { .. } => "validation",
            WorkflowError::KeyNotFound { .. } => "key_not_found",
            WorkflowError::ClassNotFound { .. } => "class_not_found",
            WorkflowError::UnknownParameter { .. } => "unknown_parameter",
            WorkflowError::TaskFailed { .. } => "task_failed",
            WorkflowError::TaskRunning(_) => "task_running",
            WorkflowError::Definition(_) => "definition",
            WorkflowError::Configuration(_) => "configuration",
        }
    }
}
