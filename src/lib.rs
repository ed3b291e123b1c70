//! # Hataori (機織り)
//!
//! A minimal in-process workflow engine for Rust.
//!
//! "Hataori" means weaving at the loom: tasks are the threads, passed one
//! after another through a shared context.
//!
//! ## Features
//!
//! - **Declarative parameters**: tasks declare [`Field`]s with defaults,
//!   validators and required-ness
//! - **Context references**: a parameter written as `$context.a.b` is read
//!   from the shared [`Context`] every time the task reads it
//! - **Definition documents**: workflows are described in JSON or YAML and
//!   task classes are resolved through a [`TaskRegistry`]
//! - **Pause and resume**: a task can return [`TaskOutcome::Pause`]; resuming
//!   skips everything that already succeeded
//! - **Inspectable failures**: errors are recorded on the workflow with a
//!   trace, and optionally returned to the caller
//!
//! ## Quick Start
//!
//! ```rust
//! use hataori::prelude::*;
//! use async_trait::async_trait;
//! use serde_json::{json, Value};
//!
//! #[derive(Debug)]
//! struct PrintTextTask {
//!     name: String,
//!     fields: Fields,
//! }
//!
//! impl TaskType for PrintTextTask {
//!     fn declare(name: &str) -> Result<Self, WorkflowError> {
//!         Ok(Self {
//!             name: name.to_string(),
//!             fields: Fields::new().with(Field::string("text")),
//!         })
//!     }
//! }
//!
//! #[async_trait]
//! impl Task for PrintTextTask {
//!     impl_task_accessors!();
//!
//!     async fn run(&mut self, ctx: &Context) -> Result<TaskOutcome, WorkflowError> {
//!         println!("{}", self.fields.get_str("text", ctx)?.unwrap_or_default());
//!         Ok(TaskOutcome::done())
//!     }
//!
//!     fn output(&self, ctx: &Context) -> Result<Option<Value>, WorkflowError> {
//!         Ok(Some(json!({ "text": self.fields.get("text", ctx)? })))
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let registry = TaskRegistry::new()
//!     .with_namespace(Namespace::new("app.tasks").register::<PrintTextTask>("PrintTextTask"));
//!
//! let definition = WorkflowDefinition::from_json_str(r#"{
//!     "modules": ["app.tasks"],
//!     "context": {"greeting": {"en": "Hello, Hataori!"}},
//!     "tasks": {
//!         "PrintTextTask": {"parameters": {"text": "$context.greeting.en"}}
//!     }
//! }"#)
//! .expect("valid definition");
//!
//! let mut workflow = Workflow::new(false, definition, &registry).expect("valid workflow");
//! workflow.run().await.expect("not raised");
//!
//! assert_eq!(workflow.status(), RunStatus::Success);
//! assert_eq!(workflow.context().get("text").unwrap(), &json!("Hello, Hataori!"));
//! # }
//! ```
//!
//! ## Pause and Resume
//!
//! ```rust
//! use hataori::prelude::*;
//! use async_trait::async_trait;
//!
//! #[derive(Debug)]
//! struct WaitForApproval {
//!     name: String,
//!     fields: Fields,
//!     asked: bool,
//! }
//!
//! impl TaskType for WaitForApproval {
//!     fn declare(name: &str) -> Result<Self, WorkflowError> {
//!         Ok(Self { name: name.to_string(), fields: Fields::new(), asked: false })
//!     }
//! }
//!
//! #[async_trait]
//! impl Task for WaitForApproval {
//!     impl_task_accessors!();
//!
//!     async fn run(&mut self, _ctx: &Context) -> Result<TaskOutcome, WorkflowError> {
//!         if !self.asked {
//!             self.asked = true;
//!             return Ok(TaskOutcome::pause("waiting for approval"));
//!         }
//!         Ok(TaskOutcome::done())
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! # let registry = TaskRegistry::new()
//! #     .with_namespace(Namespace::new("app").register::<WaitForApproval>("WaitForApproval"));
//! # let definition = WorkflowDefinition::new()
//! #     .module("app")
//! #     .task("WaitForApproval", TaskDefinition::new());
//! # let mut workflow = Workflow::new(false, definition, &registry).unwrap();
//! assert_eq!(workflow.run().await, Ok(RunStatus::Paused));
//! assert_eq!(workflow.resume().await, Ok(RunStatus::Success));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use hataori::prelude::*;
//!
//! # async fn example(workflow: &mut Workflow) {
//! match workflow.run().await {
//!     Ok(RunStatus::Error) => {
//!         eprintln!("failed: {:?}", workflow.error());
//!         eprintln!("{}", workflow.trace().unwrap_or_default());
//!     }
//!     Ok(status) => println!("finished with {}", status),
//!     // only with raise_on_error
//!     Err(error) => eprintln!("raised: {}", error),
//! }
//! # }
//! ```

mod context;
mod definition;
mod error;
mod field;
mod registry;
mod stats;
mod task;
mod workflow;

pub mod prelude;

pub use context::{Context, PATH_SEPARATOR};
pub use definition::{TaskDefinition, WorkflowDefinition};
pub use error::WorkflowError;
pub use field::{
    any_value, context_reference, integer_value, is_empty_value, to_integer, Field, Fields,
    Validator, CONTEXT_REFERENCE_PREFIX,
};
pub use registry::{Namespace, TaskConstructor, TaskRegistry, NAMESPACE_SEPARATOR};
pub use stats::{RunStatus, TaskRunStat};
pub use task::{Task, TaskOutcome, TaskType};
pub use workflow::{Workflow, WorkflowBuilder, WorkflowState};

/// Expands to the `name`, `fields` and `fields_mut` methods of [`Task`]
/// for a struct with `name: String` and `fields: Fields` members.
///
/// # Example
///
/// ```rust
/// use hataori::prelude::*;
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct MyTask {
///     name: String,
///     fields: Fields,
/// }
///
/// #[async_trait]
/// impl Task for MyTask {
///     impl_task_accessors!();
///
///     async fn run(&mut self, _ctx: &Context) -> Result<TaskOutcome, WorkflowError> {
///         Ok(TaskOutcome::done())
///     }
/// }
/// ```
#[macro_export]
macro_rules! impl_task_accessors {
    () => {
        fn name(&self) -> &str {
            &self.name
        }

        fn fields(&self) -> &$crate::Fields {
            &self.fields
        }

        fn fields_mut(&mut self) -> &mut $crate::Fields {
            &mut self.fields
        }
    };
}
