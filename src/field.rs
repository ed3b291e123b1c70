//! Declared, validated task parameters.
//!
//! A task type declares its parameters as [`Field`]s collected in a
//! [`Fields`] set. Each task instance owns its own `Fields`, so assigned
//! values never leak between instances of the same type.
//!
//! A stored string of the form `$context.<path>` is a context reference: it
//! is kept as written and resolved against the workflow context on every
//! read.

use crate::context::Context;
use crate::error::WorkflowError;
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use tracing::debug;

/// Prefix marking a parameter value as a reference into the context.
pub const CONTEXT_REFERENCE_PREFIX: &str = "$context.";

/// Checks a candidate value, returning the reason it was rejected.
pub type Validator = fn(&Value) -> Result<(), String>;

/// Returns the context path of a reference value, if it is one.
pub fn context_reference(value: &Value) -> Option<&str> {
    value
        .as_str()
        .and_then(|s| s.strip_prefix(CONTEXT_REFERENCE_PREFIX))
}

/// Returns `true` for `null`, `false`, zero, and empty strings, arrays or objects.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Converts a value to an integer the way a lenient numeric parser would.
///
/// Floats are truncated, booleans map to 0/1 and strings must hold an
/// integer literal.
pub fn to_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Accepts any value.
pub fn any_value(_value: &Value) -> Result<(), String> {
    Ok(())
}

/// Accepts integer-convertible values; `null` and `""` are let through so
/// optional numeric fields can stay unset. Context references pass here and
/// are checked once resolved.
pub fn integer_value(value: &Value) -> Result<(), String> {
    if value.is_null() || value.as_str() == Some("") {
        return Ok(());
    }
    if context_reference(value).is_some() {
        return Ok(());
    }
    to_integer(value)
        .map(|_| ())
        .ok_or_else(|| format!("{} is not convertible to an integer", value))
}

/// A single declared parameter: default, required-ness, validator and the
/// per-instance value slot.
#[derive(Clone)]
pub struct Field {
    name: String,
    default: Value,
    required: bool,
    validator: Validator,
    value: Option<Value>,
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("default", &self.default)
            .field("required", &self.required)
            .field("value", &self.value)
            .finish()
    }
}

impl Field {
    /// Declares a field with a custom validator and a `null` default.
    pub fn new(name: impl Into<String>, validator: Validator) -> Self {
        Self {
            name: name.into(),
            default: Value::Null,
            required: false,
            validator,
            value: None,
        }
    }

    /// Declares a string field. Any value is accepted.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, any_value)
    }

    /// Declares a numeric field. Values must be integer-convertible.
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, integer_value)
    }

    /// Sets the default value, which must itself pass validation.
    ///
    /// # Examples
    ///
    /// ```
    /// use hataori::Field;
    ///
    /// let limit = Field::number("limit").with_default(1).unwrap();
    /// assert_eq!(limit.get(None).unwrap(), 1);
    ///
    /// assert!(Field::number("limit").with_default("one").is_err());
    /// ```
    pub fn with_default(mut self, default: impl Into<Value>) -> Result<Self, WorkflowError> {
        let default = default.into();
        self.validate(&default)?;
        self.default = default;
        Ok(self)
    }

    /// Marks the field as required: reads fail when the resolved value is empty.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Returns the field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared default.
    pub fn default_value(&self) -> &Value {
        &self.default
    }

    /// Returns `true` if the field is required.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Returns the stored value as written, without resolving references.
    pub fn raw(&self) -> &Value {
        self.value.as_ref().unwrap_or(&self.default)
    }

    /// Returns `true` if a value has been assigned.
    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    /// Reads the field.
    ///
    /// Context references are resolved against `ctx` on every call; the
    /// validator and the required check apply to the resolved value.
    pub fn get<'c>(&self, ctx: impl Into<Option<&'c Context>>) -> Result<Value, WorkflowError> {
        let raw = self.raw();
        let resolved = match context_reference(raw) {
            Some(path) => {
                let ctx = ctx.into().ok_or_else(|| {
                    WorkflowError::Configuration(format!(
                        "field '{}' references the context ({}) but no context is bound",
                        self.name, raw
                    ))
                })?;
                let resolved = ctx.get(path)?.clone();
                self.validate(&resolved)?;
                resolved
            }
            None => raw.clone(),
        };

        if self.required && is_empty_value(&resolved) {
            return Err(WorkflowError::validation(&self.name, "required field is empty"));
        }
        Ok(resolved)
    }

    /// Validates and stores a value.
    pub fn set(&mut self, value: impl Into<Value>) -> Result<(), WorkflowError> {
        let value = value.into();
        self.validate(&value)?;
        debug!("Set field '{}' to {}", self.name, value);
        self.value = Some(value);
        Ok(())
    }

    fn validate(&self, value: &Value) -> Result<(), WorkflowError> {
        (self.validator)(value).map_err(|details| WorkflowError::validation(&self.name, details))
    }
}

/// The declared fields of one task instance, in declaration order.
///
/// # Examples
///
/// ```
/// use hataori::{Context, Field, Fields};
/// use serde_json::json;
///
/// let mut fields = Fields::new()
///     .with(Field::string("content"))
///     .with(Field::number("limit").with_default(3).unwrap());
///
/// fields.set("content", "$context.content").unwrap();
///
/// let mut ctx = Context::new();
/// ctx.insert("content", "hello");
/// assert_eq!(fields.get("content", &ctx).unwrap(), json!("hello"));
/// assert_eq!(fields.get_i64("limit", None).unwrap(), Some(3));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Fields {
    fields: IndexMap<String, Field>,
}

impl Fields {
    /// Creates an empty field set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a declared field.
    pub fn with(mut self, field: Field) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    /// Returns `true` if a field with the given name is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Returns the declared field, if any.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Returns an iterator over the declared field names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    /// Returns the number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if no fields are declared.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Reads and resolves a field by name.
    pub fn get<'c>(
        &self,
        name: &str,
        ctx: impl Into<Option<&'c Context>>,
    ) -> Result<Value, WorkflowError> {
        self.lookup(name)?.get(ctx)
    }

    /// Reads a field as a string; `null` reads as `None`.
    pub fn get_str<'c>(
        &self,
        name: &str,
        ctx: impl Into<Option<&'c Context>>,
    ) -> Result<Option<String>, WorkflowError> {
        Ok(match self.get(name, ctx)? {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
    }

    /// Reads a field as an integer; `null` and `""` read as `None`.
    pub fn get_i64<'c>(
        &self,
        name: &str,
        ctx: impl Into<Option<&'c Context>>,
    ) -> Result<Option<i64>, WorkflowError> {
        let value = self.get(name, ctx)?;
        if value.is_null() || value.as_str() == Some("") {
            return Ok(None);
        }
        to_integer(&value)
            .map(Some)
            .ok_or_else(|| WorkflowError::validation(name, format!("{} is not an integer", value)))
    }

    /// Reads a field as a boolean using emptiness rules; `null` reads as `None`.
    pub fn get_bool<'c>(
        &self,
        name: &str,
        ctx: impl Into<Option<&'c Context>>,
    ) -> Result<Option<bool>, WorkflowError> {
        let value = self.get(name, ctx)?;
        Ok((!value.is_null()).then(|| !is_empty_value(&value)))
    }

    /// Validates and stores a value on a declared field.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), WorkflowError> {
        self.fields
            .get_mut(name)
            .ok_or_else(|| WorkflowError::validation(name, "no such field"))?
            .set(value)
    }

    /// Assigns definition parameters, rejecting any that have no declared field.
    pub fn assign<'a, I>(&mut self, task: &str, parameters: I) -> Result<(), WorkflowError>
    where
        I: IntoIterator<Item = (&'a String, &'a Value)>,
    {
        for (name, value) in parameters {
            let field = self
                .fields
                .get_mut(name.as_str())
                .ok_or_else(|| WorkflowError::UnknownParameter {
                    task: task.to_string(),
                    parameter: name.clone(),
                })?;
            field.set(value.clone())?;
        }
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<&Field, WorkflowError> {
        self.fields
            .get(name)
            .ok_or_else(|| WorkflowError::validation(name, "no such field"))
    }
}
