//! Task class resolution.
//!
//! Task types are registered up front under a namespace, e.g. `app.tasks`.
//! A definition names classes either bare (`ReadFileTask`, searched through
//! the definition's namespace list in order) or fully qualified
//! (`app.tasks.ReadFileTask`, resolved directly).

use crate::definition::TaskDefinition;
use crate::error::WorkflowError;
use crate::task::{Task, TaskType};
use indexmap::IndexMap;
use std::fmt;
use tracing::debug;

/// Separator between a namespace and a class name.
pub const NAMESPACE_SEPARATOR: char = '.';

/// Builds an unconfigured task instance with the given display name.
pub type TaskConstructor = fn(&str) -> Result<Box<dyn Task>, WorkflowError>;

fn construct<T: TaskType>(name: &str) -> Result<Box<dyn Task>, WorkflowError> {
    Ok(Box::new(T::declare(name)?))
}

/// A named group of task classes.
#[derive(Clone, Default)]
pub struct Namespace {
    name: String,
    classes: IndexMap<String, TaskConstructor>,
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("name", &self.name)
            .field("classes", &self.classes.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Namespace {
    /// Creates an empty namespace.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            classes: IndexMap::new(),
        }
    }

    /// Registers a task type under a class name.
    pub fn register<T: TaskType>(mut self, class: impl Into<String>) -> Self {
        self.classes.insert(class.into(), construct::<T>);
        self
    }

    /// Registers a constructor function under a class name.
    pub fn register_fn(mut self, class: impl Into<String>, constructor: TaskConstructor) -> Self {
        self.classes.insert(class.into(), constructor);
        self
    }

    /// Returns the namespace name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up a class in this namespace.
    pub fn get(&self, class: &str) -> Option<TaskConstructor> {
        self.classes.get(class).copied()
    }

    /// Returns an iterator over registered class names.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(|k| k.as_str())
    }
}

/// All namespaces known to the process.
///
/// # Examples
///
/// ```
/// use hataori::{Namespace, TaskRegistry, WorkflowError};
///
/// let registry = TaskRegistry::new()
///     .with_namespace(Namespace::new("app.tasks"))
///     .with_namespace(Namespace::new("app.more"));
///
/// let err = registry
///     .resolve(&["app.tasks".to_string(), "app.more".to_string()], "Missing")
///     .unwrap_err();
/// assert!(matches!(err, WorkflowError::ClassNotFound { .. }));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    namespaces: IndexMap<String, Namespace>,
}

impl TaskRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a namespace. Classes of an existing namespace with the same name
    /// are extended.
    pub fn with_namespace(mut self, namespace: Namespace) -> Self {
        self.add_namespace(namespace);
        self
    }

    /// Adds a namespace in place.
    pub fn add_namespace(&mut self, namespace: Namespace) {
        match self.namespaces.get_mut(&namespace.name) {
            Some(existing) => existing.classes.extend(namespace.classes),
            None => {
                self.namespaces.insert(namespace.name.clone(), namespace);
            }
        }
    }

    /// Returns a namespace by name.
    pub fn namespace(&self, name: &str) -> Option<&Namespace> {
        self.namespaces.get(name)
    }

    /// Returns an iterator over the registered namespace names.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.namespaces.keys().map(|k| k.as_str())
    }

    /// Resolves a class reference.
    ///
    /// A qualified reference (`ns.Class`) is looked up directly and ignores
    /// `search`. A bare name is looked up in each namespace of `search` in
    /// order; the first match wins. Unknown namespaces are skipped.
    pub fn resolve(&self, search: &[String], class: &str) -> Result<TaskConstructor, WorkflowError> {
        if let Some((namespace, class_name)) = class.rsplit_once(NAMESPACE_SEPARATOR) {
            return self
                .namespaces
                .get(namespace)
                .and_then(|ns| ns.get(class_name))
                .ok_or_else(|| WorkflowError::ClassNotFound {
                    class: class.to_string(),
                    searched: vec![namespace.to_string()],
                });
        }

        for namespace in search {
            match self.namespaces.get(namespace) {
                Some(ns) => {
                    if let Some(constructor) = ns.get(class) {
                        debug!("Resolved task class '{}' in '{}'", class, namespace);
                        return Ok(constructor);
                    }
                }
                None => debug!("Namespace '{}' is not registered", namespace),
            }
        }

        Err(WorkflowError::ClassNotFound {
            class: class.to_string(),
            searched: search.to_vec(),
        })
    }

    /// Resolves and constructs the task for one definition entry.
    ///
    /// The instance is named after `definition.name` (or the key), its
    /// parameters are assigned, and `init` runs last.
    pub fn build(
        &self,
        key: &str,
        definition: &TaskDefinition,
        search: &[String],
    ) -> Result<Box<dyn Task>, WorkflowError> {
        let constructor = self.resolve(search, definition.class_name(key))?;
        let name = definition.display_name(key);

        let mut task = constructor(name)?;
        task.fields_mut().assign(name, &definition.parameters)?;
        task.init()?;
        Ok(task)
    }
}
