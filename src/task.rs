use crate::context::Context;
use crate::error::WorkflowError;
use crate::field::Fields;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::{self, Debug};

/// Outcome of a single task run.
///
/// Returned from [`Task::run`]; errors travel separately as
/// `Err(WorkflowError)`.
///
/// # Examples
///
/// ```
/// use hataori::TaskOutcome;
///
/// assert_eq!(TaskOutcome::done(), TaskOutcome::Complete);
/// assert_eq!(
///     TaskOutcome::pause("waiting for upload"),
///     TaskOutcome::Pause("waiting for upload".to_string())
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The task finished its work; its output will be collected.
    Complete,
    /// Stop the workflow here. The task keeps its internal state and is run
    /// again on resume.
    Pause(String),
}

impl TaskOutcome {
    /// Creates a Complete outcome.
    pub fn done() -> Self {
        Self::Complete
    }

    /// Creates a Pause outcome with the given reason.
    pub fn pause(reason: impl Into<String>) -> Self {
        Self::Pause(reason.into())
    }
}

/// A unit of work inside a workflow.
///
/// Tasks hold their parameters in a [`Fields`] set and receive the shared
/// workflow [`Context`] read-only while they run. Anything a task wants to
/// publish goes through [`Task::output`].
///
/// # Examples
///
/// ```
/// use hataori::prelude::*;
/// use async_trait::async_trait;
/// use serde_json::{json, Value};
///
/// #[derive(Debug)]
/// struct Greet {
///     name: String,
///     fields: Fields,
/// }
///
/// impl TaskType for Greet {
///     fn declare(name: &str) -> Result<Self, WorkflowError> {
///         Ok(Self {
///             name: name.to_string(),
///             fields: Fields::new().with(Field::string("who").with_default("world")?),
///         })
///     }
/// }
///
/// #[async_trait]
/// impl Task for Greet {
///     fn name(&self) -> &str {
///         &self.name
///     }
///
///     fn fields(&self) -> &Fields {
///         &self.fields
///     }
///
///     fn fields_mut(&mut self) -> &mut Fields {
///         &mut self.fields
///     }
///
///     async fn run(&mut self, _ctx: &Context) -> Result<TaskOutcome, WorkflowError> {
///         Ok(TaskOutcome::done())
///     }
///
///     fn output(&self, ctx: &Context) -> Result<Option<Value>, WorkflowError> {
///         let who = self.fields.get_str("who", ctx)?.unwrap_or_default();
///         Ok(Some(json!({ "greeting": format!("hello {}", who) })))
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync + Debug {
    /// Returns the display name of this instance.
    fn name(&self) -> &str;

    /// Returns the declared fields with their assigned values.
    fn fields(&self) -> &Fields;

    /// Returns the declared fields for assignment.
    fn fields_mut(&mut self) -> &mut Fields;

    /// Sets up working state that field defaults cannot express.
    ///
    /// Called once, right after the definition's parameters are assigned.
    fn init(&mut self) -> Result<(), WorkflowError> {
        Ok(())
    }

    /// Performs the work.
    ///
    /// # Returns
    ///
    /// - `Ok(TaskOutcome::Complete)` - Done, collect the output
    /// - `Ok(TaskOutcome::Pause(reason))` - Stop the workflow for a later resume
    /// - `Err(error)` - The task failed
    async fn run(&mut self, ctx: &Context) -> Result<TaskOutcome, WorkflowError>;

    /// Produces the value to publish after a successful run.
    ///
    /// A JSON object is merged into the context; any other value is stored
    /// under the task's key.
    fn output(&self, _ctx: &Context) -> Result<Option<Value>, WorkflowError> {
        Ok(None)
    }

    /// Shorthand for a [`WorkflowError::TaskFailed`] attributed to this task.
    fn fail(&self, details: impl Into<String>) -> WorkflowError
    where
        Self: Sized,
    {
        WorkflowError::task_failed(self.name(), details)
    }
}

/// A task type that can be constructed by name from a definition.
///
/// `declare` builds an instance with its fields declared and nothing
/// assigned yet; defaults are validated here.
pub trait TaskType: Task + Sized + 'static {
    /// Creates an unconfigured instance with the given display name.
    fn declare(name: &str) -> Result<Self, WorkflowError>;
}

/// Display helper used in logs.
pub(crate) struct TaskLabel<'a> {
    pub(crate) key: &'a str,
    pub(crate) name: &'a str,
}

impl fmt::Display for TaskLabel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.key == self.name {
            write!(f, "{}", self.key)
        } else {
            write!(f, "{} ({})", self.key, self.name)
        }
    }
}
