//! Per-call write options.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Options handed to every backend right before a write attempt.
///
/// The most common use is a pre-generated identifier: when a new entity is
/// fanned out to several backends, each of them must store it under the same
/// id, so the id is chosen once by the caller and passed along here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteOptions {
    /// Identifier to assign to a newly created entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_id: Option<String>,

    /// Backend-specific options.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WriteOptions {
    /// Creates empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options carrying a freshly generated UUID v4 as `new_id`.
    pub fn generated() -> Self {
        Self::new().with_new_id(Uuid::new_v4().to_string())
    }

    /// Sets the identifier to assign to a new entity.
    pub fn with_new_id(mut self, id: impl Into<String>) -> Self {
        self.new_id = Some(id.into());
        self
    }

    /// Sets a backend-specific option.
    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Returns a backend-specific option.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Returns true if no option is set.
    pub fn is_empty(&self) -> bool {
        self.new_id.is_none() && self.extra.is_empty()
    }
}
