//! Layered application settings.
//!
//! Settings are an explicit chain of stores: lookups consult local values
//! first and fall back to an optional parent. When an application or router
//! mounts another, the child is created with [`Settings::child`] so it
//! inherits the parent's values until it overrides them locally.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Setting name for case-sensitive path matching.
pub const CASE_SENSITIVE_ROUTING: &str = "case sensitive routing";

/// Setting name for strict trailing-slash matching.
pub const STRICT_ROUTING: &str = "strict routing";

/// Setting name for merging a nested match's params with its parent's.
pub const MERGE_PARAMS: &str = "merge params";

/// A layered configuration store.
///
/// # Example
///
/// ```
/// use viaduct_core::Settings;
/// use std::sync::Arc;
///
/// let mut parent = Settings::new();
/// parent.enable("case sensitive routing");
///
/// let parent = Arc::new(parent);
/// let mut child = Settings::child(&parent);
///
/// // Inherited until overridden.
/// assert!(child.enabled("case sensitive routing"));
/// child.disable("case sensitive routing");
/// assert!(!child.enabled("case sensitive routing"));
/// assert!(parent.enabled("case sensitive routing"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: HashMap<String, Value>,
    parent: Option<Arc<Settings>>,
}

impl Settings {
    /// Creates an empty root settings store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a child store inheriting from `parent`.
    #[must_use]
    pub fn child(parent: &Arc<Settings>) -> Self {
        Self {
            values: HashMap::new(),
            parent: Some(Arc::clone(parent)),
        }
    }

    /// Sets a value locally.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Looks up a value, falling back through the parent chain.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self.values.get(name) {
            Some(value) => Some(value),
            None => self.parent.as_ref().and_then(|p| p.get(name)),
        }
    }

    /// Whether a setting is truthy.
    #[must_use]
    pub fn enabled(&self, name: &str) -> bool {
        match self.get(name) {
            None | Some(Value::Null) | Some(Value::Bool(false)) => false,
            Some(_) => true,
        }
    }

    /// Whether a setting is absent or falsy.
    #[must_use]
    pub fn disabled(&self, name: &str) -> bool {
        !self.enabled(name)
    }

    /// Sets a setting to `true`.
    pub fn enable(&mut self, name: impl Into<String>) {
        self.set(name, Value::Bool(true));
    }

    /// Sets a setting to `false`.
    pub fn disable(&mut self, name: impl Into<String>) {
        self.set(name, Value::Bool(false));
    }
}
