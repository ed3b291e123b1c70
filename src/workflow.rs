//! Workflow engine: builds tasks from a definition and drives them in order.

use crate::context::Context;
use crate::definition::WorkflowDefinition;
use crate::error::WorkflowError;
use crate::registry::TaskRegistry;
use crate::stats::{RunStatus, TaskRunStat};
use crate::task::{Task, TaskLabel, TaskOutcome};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::backtrace::Backtrace;
use std::fmt;
use tracing::{debug, info, warn};

/// Everything observable about a workflow run, detached from the task
/// instances so it can be persisted and handed back to a builder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub status: RunStatus,
    /// Formatted failure report of the last error.
    pub trace: Option<String>,
    pub error: Option<WorkflowError>,
    pub context: Context,
    /// Run records keyed by task key, in first-run order.
    pub task_run_stats: IndexMap<String, TaskRunStat>,
}

/// An ordered set of tasks sharing one context.
///
/// # Examples
///
/// ```
/// use hataori::prelude::*;
/// use async_trait::async_trait;
/// use serde_json::json;
///
/// #[derive(Debug)]
/// struct Noop {
///     name: String,
///     fields: Fields,
/// }
///
/// impl TaskType for Noop {
///     fn declare(name: &str) -> Result<Self, WorkflowError> {
///         Ok(Self { name: name.to_string(), fields: Fields::new() })
///     }
/// }
///
/// #[async_trait]
/// impl Task for Noop {
///     fn name(&self) -> &str { &self.name }
///     fn fields(&self) -> &Fields { &self.fields }
///     fn fields_mut(&mut self) -> &mut Fields { &mut self.fields }
///     async fn run(&mut self, _ctx: &Context) -> Result<TaskOutcome, WorkflowError> {
///         Ok(TaskOutcome::done())
///     }
/// }
///
/// # #[tokio::main]
/// # async fn main() {
/// let registry = TaskRegistry::new()
///     .with_namespace(Namespace::new("app.tasks").register::<Noop>("Noop"));
///
/// let definition = WorkflowDefinition::from_value(json!({
///     "modules": ["app.tasks"],
///     "tasks": { "Noop": { "parameters": {} } }
/// }))
/// .expect("valid definition");
///
/// let mut workflow = Workflow::new(false, definition, &registry).expect("valid workflow");
/// assert_eq!(workflow.status(), RunStatus::NotStarted);
///
/// workflow.run().await.expect("not raised");
/// assert_eq!(workflow.status(), RunStatus::Success);
/// # }
/// ```
pub struct Workflow {
    raise_on_error: bool,
    tasks: IndexMap<String, Box<dyn Task>>,
    state: WorkflowState,
}

impl fmt::Debug for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("tasks", &self.tasks.keys().collect::<Vec<_>>())
            .field("status", &self.state.status)
            .field("raise_on_error", &self.raise_on_error)
            .finish()
    }
}

impl Workflow {
    /// Creates a new workflow builder.
    pub fn builder<'r>() -> WorkflowBuilder<'r> {
        WorkflowBuilder::new()
    }

    /// Builds every task of `definition` and seeds a fresh context from it.
    pub fn new(
        raise_on_error: bool,
        definition: WorkflowDefinition,
        registry: &TaskRegistry,
    ) -> Result<Self, WorkflowError> {
        Self::builder()
            .raise_on_error(raise_on_error)
            .definition(definition)
            .registry(registry)
            .build()
    }

    /// Returns the task with the given key.
    pub fn get_task(&self, key: &str) -> Option<&dyn Task> {
        self.tasks.get(key).map(|task| task.as_ref())
    }

    /// Returns the task with the given key for inspection or adjustment.
    pub fn get_task_mut(&mut self, key: &str) -> Option<&mut (dyn Task + 'static)> {
        self.tasks.get_mut(key).map(|task| task.as_mut())
    }

    /// Returns the task keys in execution order.
    pub fn task_keys(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(|k| k.as_str())
    }

    /// Returns `true` if failures are returned from `run` as well as recorded.
    pub fn raise_on_error(&self) -> bool {
        self.raise_on_error
    }

    pub fn status(&self) -> RunStatus {
        self.state.status
    }

    pub fn trace(&self) -> Option<&str> {
        self.state.trace.as_deref()
    }

    pub fn error(&self) -> Option<&WorkflowError> {
        self.state.error.as_ref()
    }

    pub fn context(&self) -> &Context {
        &self.state.context
    }

    /// Mutable access for hosts that feed external results in before a resume.
    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.state.context
    }

    pub fn task_run_stats(&self) -> &IndexMap<String, TaskRunStat> {
        &self.state.task_run_stats
    }

    pub fn task_run_stat(&self, key: &str) -> Option<&TaskRunStat> {
        self.state.task_run_stats.get(key)
    }

    /// Returns the current state snapshot.
    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Consumes the workflow, keeping only its state.
    pub fn into_state(self) -> WorkflowState {
        self.state
    }

    /// Runs every task that has not succeeded yet, in declaration order.
    ///
    /// A pause or a failure stops the iteration. Failures are recorded on the
    /// workflow (`status`, `trace`, `error`) and only returned as `Err` when
    /// `raise_on_error` is set.
    pub async fn run(&mut self) -> Result<RunStatus, WorkflowError> {
        info!("Workflow started with {} tasks", self.tasks.len());
        self.state.status = RunStatus::Running;

        for (key, task) in self.tasks.iter_mut() {
            match run_task(key, task.as_mut(), &mut self.state).await {
                Ok(TaskProgress::Completed) | Ok(TaskProgress::Skipped) => {}
                Ok(TaskProgress::Paused) => {
                    self.state.status = RunStatus::Paused;
                    info!("Workflow paused at task '{}'", key);
                    return Ok(RunStatus::Paused);
                }
                Err(error) => {
                    record_failure(&mut self.state, key, &error);
                    if self.raise_on_error {
                        return Err(error);
                    }
                    return Ok(RunStatus::Error);
                }
            }
        }

        self.state.status = RunStatus::Success;
        info!("Workflow completed successfully");
        Ok(RunStatus::Success)
    }

    /// Continues a paused workflow.
    ///
    /// Identical to [`Workflow::run`]: succeeded tasks are skipped, and the
    /// task that paused or failed last is run again with its current state.
    pub async fn resume(&mut self) -> Result<RunStatus, WorkflowError> {
        info!("Resuming workflow from status {}", self.state.status);
        self.run().await
    }
}

enum TaskProgress {
    Completed,
    Skipped,
    Paused,
}

async fn run_task(
    key: &str,
    task: &mut dyn Task,
    state: &mut WorkflowState,
) -> Result<TaskProgress, WorkflowError> {
    let label = TaskLabel {
        key,
        name: task.name(),
    }
    .to_string();

    match state.task_run_stats.get(key).map(|stat| stat.status) {
        Some(RunStatus::Success) => {
            debug!("Skipping task '{}', already succeeded", label);
            return Ok(TaskProgress::Skipped);
        }
        Some(RunStatus::Running) => {
            return Err(WorkflowError::TaskRunning(key.to_string()));
        }
        _ => {}
    }

    stat_mut(state, key).mark_running();
    debug!("Running task '{}'", label);

    let outcome = task.run(&state.context).await;
    let collected = match outcome {
        Ok(TaskOutcome::Complete) => task.output(&state.context),
        Ok(TaskOutcome::Pause(reason)) => {
            info!("Task '{}' paused: {}", label, reason);
            stat_mut(state, key).mark_paused(reason);
            return Ok(TaskProgress::Paused);
        }
        Err(error) => Err(error),
    };

    match collected {
        Ok(output) => {
            let output = output.filter(|value| !value.is_null());
            if let Some(value) = &output {
                publish(&mut state.context, key, value);
            }
            stat_mut(state, key).mark_success(output);
            info!("Task '{}' completed successfully", label);
            Ok(TaskProgress::Completed)
        }
        Err(error) => {
            warn!("Task '{}' failed: {}", label, error);
            stat_mut(state, key).mark_error(error.to_string());
            Err(error)
        }
    }
}

fn stat_mut<'s>(state: &'s mut WorkflowState, key: &str) -> &'s mut TaskRunStat {
    state.task_run_stats.entry(key.to_string()).or_default()
}

/// Objects merge into the context; any other value lands under the task key.
fn publish(context: &mut Context, key: &str, output: &Value) {
    match output {
        Value::Object(map) => context.update(map.clone()),
        other => context.insert(key, other.clone()),
    }
}

fn record_failure(state: &mut WorkflowState, key: &str, error: &WorkflowError) {
    state.trace = Some(format!(
        "task '{}' failed with {} error\n  {}\nstack backtrace:\n{}",
        key,
        error.kind(),
        error,
        Backtrace::capture()
    ));
    state.error = Some(error.clone());
    state.status = RunStatus::Error;
}

/// Builder for constructing [`Workflow`] instances.
#[derive(Default)]
pub struct WorkflowBuilder<'r> {
    raise_on_error: bool,
    definition: Option<WorkflowDefinition>,
    registry: Option<&'r TaskRegistry>,
    state: Option<WorkflowState>,
}

impl<'r> WorkflowBuilder<'r> {
    /// Creates a new empty workflow builder.
    pub fn new() -> Self {
        Self {
            raise_on_error: false,
            definition: None,
            registry: None,
            state: None,
        }
    }

    /// Returns failures from `run` in addition to recording them.
    pub fn raise_on_error(mut self, raise: bool) -> Self {
        self.raise_on_error = raise;
        self
    }

    /// Sets the definition to build tasks from.
    pub fn definition(mut self, definition: WorkflowDefinition) -> Self {
        self.definition = Some(definition);
        self
    }

    /// Sets the registry task classes are resolved from.
    pub fn registry(mut self, registry: &'r TaskRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Restores a previously captured state instead of starting fresh.
    ///
    /// The definition's initial context is ignored; the stored context and
    /// run records are used as they are. Tasks are rebuilt from the
    /// definition, so in-memory progress of a paused task starts over from
    /// `init`.
    pub fn state(mut self, state: WorkflowState) -> Self {
        self.state = Some(state);
        self
    }

    /// Builds the workflow.
    pub fn build(self) -> Result<Workflow, WorkflowError> {
        let definition = self.definition.ok_or_else(|| {
            WorkflowError::Configuration("Workflow definition must be specified".to_string())
        })?;

        let empty = TaskRegistry::new();
        let registry = match self.registry {
            Some(registry) => registry,
            None if definition.tasks.is_empty() => &empty,
            None => {
                return Err(WorkflowError::Configuration(
                    "Task registry must be specified".to_string(),
                ))
            }
        };

        let mut tasks = IndexMap::with_capacity(definition.tasks.len());
        for (key, task_definition) in &definition.tasks {
            let task = registry.build(key, task_definition, &definition.modules)?;
            tasks.insert(key.clone(), task);
        }

        let state = match self.state {
            Some(state) => state,
            None => WorkflowState {
                context: Context::from(definition.context),
                ..WorkflowState::default()
            },
        };

        debug!("Built workflow with tasks {:?}", tasks.keys().collect::<Vec<_>>());
        Ok(Workflow {
            raise_on_error: self.raise_on_error,
            tasks,
            state,
        })
    }
}
