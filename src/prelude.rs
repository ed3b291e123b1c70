//! Commonly used types and traits

pub use crate::context::Context;
pub use crate::definition::{TaskDefinition, WorkflowDefinition};
pub use crate::error::WorkflowError;
pub use crate::field::{Field, Fields};
pub use crate::impl_task_accessors;
pub use crate::registry::{Namespace, TaskRegistry};
pub use crate::stats::{RunStatus, TaskRunStat};
pub use crate::task::{Task, TaskOutcome, TaskType};
pub use crate::workflow::{Workflow, WorkflowBuilder, WorkflowState};
