//! Entity types.
//!
//! An [`Entity`] is a schemaless record: a collection name, an optional
//! identifier (absent until the entity has been persisted) and a JSON object
//! of fields. Hydration into typed domain objects is left to callers.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Collection used by entities created without an explicit collection.
pub const DEFAULT_COLLECTION: &str = "NONE";

/// A schemaless entity.
///
/// # Examples
///
/// ```
/// use helios_gateway::types::Entity;
/// use serde_json::json;
///
/// let entity = Entity::new("users")
///     .with_field("name", json!("Ada"))
///     .with_field("age", json!(36));
///
/// assert!(entity.is_new());
/// assert_eq!(entity.get("name"), Some(&json!("Ada")));
///
/// let saved = entity.with_id("42");
/// assert_eq!(saved.key().unwrap().to_string(), "users/42");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Collection (table, index, bucket...) the entity belongs to.
    collection: String,

    /// Identifier, if the entity has already been stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,

    /// Field values.
    #[serde(default)]
    fields: Map<String, Value>,
}

impl Entity {
    /// Creates an empty, not yet identified entity.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: None,
            fields: Map::new(),
        }
    }

    /// Creates an entity from an existing field map.
    pub fn from_fields(collection: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            collection: collection.into(),
            id: None,
            fields,
        }
    }

    /// Sets the identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets a field value.
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Returns the collection name.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Returns the identifier, if any.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Assigns an identifier in place.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// Returns true if the entity has never been stored.
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// Returns the key addressing this entity, if it has an identifier.
    pub fn key(&self) -> Option<EntityKey> {
        self.id
            .as_ref()
            .map(|id| EntityKey::new(self.collection.clone(), id.clone()))
    }

    /// Returns a field value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Sets a field value in place, returning the previous one.
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(name.into(), value)
    }

    /// Returns all fields.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Returns all fields mutably.
    pub fn fields_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.fields
    }

    /// Consumes the entity, returning its fields.
    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::new(DEFAULT_COLLECTION)
    }
}

/// Address of a single stored entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    /// Collection name.
    pub collection: String,
    /// Entity identifier.
    pub id: String,
}

impl EntityKey {
    /// Creates a new key.
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}
