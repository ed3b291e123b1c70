//! Workflow definition documents.
//!
//! A definition lists the namespaces to resolve task classes from, an
//! optional initial context, and the tasks in execution order:
//!
//! ```yaml
//! modules: [app.tasks]
//! context:
//!   greeting: hello
//! tasks:
//!   ReadFileTask:
//!     parameters:
//!       path: /tmp/input.txt
//!   verify:
//!     cls: VerifyContentTask
//!     name: verify_content
//!     parameters:
//!       content: $context.content
//! ```

use crate::error::WorkflowError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// A whole workflow definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Namespaces probed, in order, for bare class names.
    #[serde(default)]
    pub modules: Vec<String>,
    /// Initial context contents.
    #[serde(default)]
    pub context: IndexMap<String, Value>,
    /// Tasks keyed by task key; declaration order is execution order.
    pub tasks: IndexMap<String, TaskDefinition>,
}

/// One task entry of a definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    /// Class to instantiate; defaults to the task key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cls: Option<String>,
    /// Display name of the instance; defaults to the task key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Field values to assign.
    #[serde(default)]
    pub parameters: IndexMap<String, Value>,
}

impl TaskDefinition {
    /// Creates an entry with no overrides and no parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the class name.
    pub fn cls(mut self, cls: impl Into<String>) -> Self {
        self.cls = Some(cls.into());
        self
    }

    /// Overrides the display name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds a parameter value.
    pub fn param(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(field.into(), value.into());
        self
    }

    /// The class reference to resolve for the given task key.
    pub fn class_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.cls.as_deref().unwrap_or(key)
    }

    /// The display name for the given task key.
    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(key)
    }
}

impl WorkflowDefinition {
    /// Creates an empty definition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a namespace to the search list.
    pub fn module(mut self, namespace: impl Into<String>) -> Self {
        self.modules.push(namespace.into());
        self
    }

    /// Seeds an initial context value.
    pub fn context_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Appends a task entry.
    pub fn task(mut self, key: impl Into<String>, task: TaskDefinition) -> Self {
        self.tasks.insert(key.into(), task);
        self
    }

    /// Parses a JSON document.
    pub fn from_json_str(source: &str) -> Result<Self, WorkflowError> {
        serde_json::from_str(source).map_err(|e| WorkflowError::Definition(e.to_string()))
    }

    /// Parses a YAML document.
    pub fn from_yaml_str(source: &str) -> Result<Self, WorkflowError> {
        serde_yaml::from_str(source).map_err(|e| WorkflowError::Definition(e.to_string()))
    }

    /// Converts an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, WorkflowError> {
        serde_json::from_value(value).map_err(|e| WorkflowError::Definition(e.to_string()))
    }

    /// Reads a definition file; `.yaml`/`.yml` are parsed as YAML, anything
    /// else as JSON.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, WorkflowError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            WorkflowError::Definition(format!("cannot read {}: {}", path.display(), e))
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&source),
            _ => Self::from_json_str(&source),
        }
    }
}
