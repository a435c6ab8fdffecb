//! In-memory backend implementation.
//!
//! Entities live in per-collection maps ordered by id. Descriptors are
//! evaluated in process: filters are combined with AND, then results are
//! sorted, capped by the descriptor limit and paginated.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::core::{Capabilities, Gateway, OperationSet};
use crate::error::{BackendError, GatewayResult};
use crate::types::{
    Entity, EntityKey, Filter, FilterOperator, PageInfo, Projection, ResultSet,
    ResultSetDescriptor, SortDirection, WriteOptions,
};

/// Property name under which the entity id is exposed to filters and projections.
const ID_PROPERTY: &str = "id";

type Collections = HashMap<String, BTreeMap<String, Entity>>;

/// A backend keeping entities in process memory.
///
/// Supports every standard operation. It can be switched
/// [unavailable](InMemoryGateway::set_available) to simulate an outage, in
/// which case every operation fails with [`BackendError::Unavailable`].
pub struct InMemoryGateway {
    name: String,
    capabilities: Capabilities,
    collections: RwLock<Collections>,
    options: Mutex<WriteOptions>,
    available: AtomicBool,
}

impl InMemoryGateway {
    /// Creates an empty backend.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capabilities: Capabilities::all(),
            collections: RwLock::new(HashMap::new()),
            options: Mutex::new(WriteOptions::default()),
            available: AtomicBool::new(true),
        }
    }

    /// Restricts the standard operations this backend accepts.
    pub fn with_allowed(mut self, allowed: OperationSet) -> Self {
        self.capabilities.set_allowed(allowed);
        self
    }

    /// Replaces the declared capabilities.
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Simulates an outage (`false`) or a recovery (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, AtomicOrdering::SeqCst);
    }

    /// Returns true unless an outage is simulated.
    pub fn is_available(&self) -> bool {
        self.available.load(AtomicOrdering::SeqCst)
    }

    /// Stores an entity directly, bypassing availability and options.
    pub fn insert(&self, entity: Entity) -> GatewayResult<()> {
        let Some(key) = entity.key() else {
            return Err(self.invalid("entity inserted without id").into());
        };
        self.collections
            .write()
            .entry(key.collection)
            .or_default()
            .insert(key.id, entity);
        Ok(())
    }

    /// Returns a stored entity.
    pub fn get(&self, key: &EntityKey) -> Option<Entity> {
        self.collections
            .read()
            .get(&key.collection)
            .and_then(|entities| entities.get(&key.id))
            .cloned()
    }

    /// Returns the number of entities in a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    /// Removes every entity.
    pub fn clear(&self) {
        self.collections.write().clear();
    }

    /// Returns the options received for the next write.
    pub fn pending_options(&self) -> WriteOptions {
        self.options.lock().clone()
    }

    fn check_available(&self) -> Result<(), BackendError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(BackendError::Unavailable {
                backend_name: self.name.clone(),
                message: "simulated outage".to_string(),
            })
        }
    }

    fn invalid(&self, message: impl Into<String>) -> BackendError {
        BackendError::InvalidEntity {
            backend_name: self.name.clone(),
            message: message.into(),
        }
    }

    /// Returns the matching entities, sorted and limited, with the total count
    /// before pagination.
    fn select(&self, descriptor: &ResultSetDescriptor) -> Result<(Vec<Entity>, u64), BackendError> {
        let matcher = Matcher::compile(&self.name, descriptor.filters())?;

        let mut selected: Vec<Entity> = self
            .collections
            .read()
            .get(descriptor.collection())
            .map(|entities| {
                entities
                    .values()
                    .filter(|entity| matcher.matches(entity))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if !descriptor.sort_keys().is_empty() {
            selected.sort_by(|a, b| {
                descriptor
                    .sort_keys()
                    .iter()
                    .map(|key| {
                        let ordering = compare_values(
                            &property(a, &key.property),
                            &property(b, &key.property),
                        )
                        .unwrap_or(Ordering::Equal);
                        match key.direction {
                            SortDirection::Asc => ordering,
                            SortDirection::Desc => ordering.reverse(),
                        }
                    })
                    .find(|ordering| *ordering != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        if let Some(limit) = descriptor.max_results() {
            selected.truncate(limit as usize);
        }

        let total = selected.len() as u64;
        if let Some(offset) = descriptor.offset() {
            selected = selected
                .into_iter()
                .skip(offset as usize)
                .take(descriptor.page_size() as usize)
                .collect();
        }

        Ok((selected, total))
    }

    fn page_info(descriptor: &ResultSetDescriptor, total: u64) -> Option<PageInfo> {
        descriptor.page().map(|page| PageInfo {
            page,
            page_size: descriptor.page_size(),
            total,
        })
    }
}

impl fmt::Debug for InMemoryGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryGateway")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .field("collections", &self.collections.read().len())
            .field("available", &self.is_available())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Gateway for InMemoryGateway {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn set_options(&self, options: &WriteOptions) {
        *self.options.lock() = options.clone();
    }

    async fn fetch(&self, descriptor: &ResultSetDescriptor) -> GatewayResult<Projection> {
        self.check_available()?;
        let (entities, total) = self.select(descriptor)?;

        let rows = entities
            .into_iter()
            .map(|entity| {
                let id = entity.id().map(str::to_string);
                let mut row = entity.into_fields();
                if let Some(id) = id {
                    row.insert(ID_PROPERTY.to_string(), Value::String(id));
                }
                row
            })
            .collect();

        Ok(match Self::page_info(descriptor, total) {
            Some(page) => Projection::paginated(rows, page),
            None => Projection::new(rows),
        })
    }

    async fn fetch_all(&self, descriptor: &ResultSetDescriptor) -> GatewayResult<ResultSet> {
        self.check_available()?;
        let (entities, total) = self.select(descriptor)?;

        Ok(match Self::page_info(descriptor, total) {
            Some(page) => ResultSet::paginated(entities, page),
            None => ResultSet::new(entities),
        })
    }

    async fn fetch_one(&self, key: &EntityKey) -> GatewayResult<Entity> {
        self.check_available()?;
        self.get(key).ok_or_else(|| {
            BackendError::NotFound {
                backend_name: self.name.clone(),
                collection: key.collection.clone(),
                id: key.id.clone(),
            }
            .into()
        })
    }

    /// Stores entities, assigning ids to new ones.
    ///
    /// The first new entity takes `new_id` from the write options when set;
    /// any other new entity gets a fresh UUID.
    async fn persist(&self, entities: &[Entity]) -> GatewayResult<bool> {
        self.check_available()?;
        let mut new_id = std::mem::take(&mut *self.options.lock()).new_id;

        let mut collections = self.collections.write();
        for entity in entities {
            let mut stored = entity.clone();
            if stored.is_new() {
                let id = new_id.take().unwrap_or_else(|| Uuid::new_v4().to_string());
                stored.set_id(id);
            }
            let Some(key) = stored.key() else {
                continue;
            };
            debug!(backend = %self.name, key = %key, "Persisting entity");
            collections
                .entry(key.collection)
                .or_default()
                .insert(key.id, stored);
        }

        Ok(true)
    }

    async fn update(
        &self,
        descriptor: &ResultSetDescriptor,
        data: &Map<String, Value>,
    ) -> GatewayResult<bool> {
        self.check_available()?;
        let matcher = Matcher::compile(&self.name, descriptor.filters())?;

        let mut collections = self.collections.write();
        let mut updated = 0usize;
        if let Some(entities) = collections.get_mut(descriptor.collection()) {
            for entity in entities.values_mut().filter(|entity| matcher.matches(entity)) {
                for (name, value) in data {
                    entity.set(name.clone(), value.clone());
                }
                updated += 1;
            }
        }
        debug!(backend = %self.name, updated, "Updated entities");

        Ok(true)
    }

    /// Deletes entities by key.
    ///
    /// Returns `Ok(false)` if one of them was not stored.
    async fn delete(&self, entities: &[Entity]) -> GatewayResult<bool> {
        self.check_available()?;

        let keys = entities
            .iter()
            .map(|entity| {
                entity
                    .key()
                    .ok_or_else(|| self.invalid("cannot delete an entity without id"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut collections = self.collections.write();
        let mut all_found = true;
        for key in keys {
            let removed = collections
                .get_mut(&key.collection)
                .and_then(|stored| stored.remove(&key.id));
            all_found &= removed.is_some();
        }

        Ok(all_found)
    }

    /// Deletes every entity matching the descriptor filters.
    ///
    /// Sorting, limit and pagination are ignored.
    async fn purge(&self, descriptor: &ResultSetDescriptor) -> GatewayResult<bool> {
        self.check_available()?;
        let matcher = Matcher::compile(&self.name, descriptor.filters())?;

        if let Some(entities) = self.collections.write().get_mut(descriptor.collection()) {
            entities.retain(|_, entity| !matcher.matches(entity));
        }

        Ok(true)
    }
}

/// Filters compiled once per call.
struct Matcher<'a> {
    filters: Vec<(&'a Filter, Option<Regex>)>,
}

impl<'a> Matcher<'a> {
    fn compile(backend_name: &str, filters: &'a [Filter]) -> Result<Self, BackendError> {
        let filters = filters
            .iter()
            .map(|filter| {
                let pattern = match filter.operator {
                    FilterOperator::Like => Some(like_pattern(backend_name, filter)?),
                    _ => None,
                };
                Ok::<_, BackendError>((filter, pattern))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { filters })
    }

    fn matches(&self, entity: &Entity) -> bool {
        self.filters.iter().all(|(filter, pattern)| {
            let value = property(entity, &filter.property);
            match filter.operator {
                FilterOperator::Equals => values_equal(&value, &filter.value),
                FilterOperator::NotEquals => !values_equal(&value, &filter.value),
                FilterOperator::LowerThan => {
                    compare_values(&value, &filter.value) == Some(Ordering::Less)
                }
                FilterOperator::LowerOrEqual => matches!(
                    compare_values(&value, &filter.value),
                    Some(Ordering::Less | Ordering::Equal)
                ),
                FilterOperator::GreaterThan => {
                    compare_values(&value, &filter.value) == Some(Ordering::Greater)
                }
                FilterOperator::GreaterOrEqual => matches!(
                    compare_values(&value, &filter.value),
                    Some(Ordering::Greater | Ordering::Equal)
                ),
                FilterOperator::Like => match (pattern, value.as_str()) {
                    (Some(regex), Some(text)) => regex.is_match(text),
                    _ => false,
                },
                FilterOperator::In => filter
                    .value
                    .as_array()
                    .is_some_and(|candidates| candidates.iter().any(|c| values_equal(&value, c))),
            }
        })
    }
}

/// Translates a SQL `LIKE` pattern into an anchored regular expression.
fn like_pattern(backend_name: &str, filter: &Filter) -> Result<Regex, BackendError> {
    let Some(pattern) = filter.value.as_str() else {
        return Err(BackendError::Query {
            backend_name: backend_name.to_string(),
            message: format!("LIKE filter on '{}' needs a string pattern", filter.property),
        });
    };

    let translated = regex::escape(pattern).replace('%', ".*").replace('_', ".");
    Regex::new(&format!("^{translated}$")).map_err(|e| BackendError::Query {
        backend_name: backend_name.to_string(),
        message: e.to_string(),
    })
}

fn property(entity: &Entity, name: &str) -> Value {
    if name == ID_PROPERTY {
        if let Some(id) = entity.id() {
            return Value::String(id.to_string());
        }
    }
    entity.get(name).cloned().unwrap_or(Value::Null)
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) => Some(Ordering::Less),
        (_, Value::Null) => Some(Ordering::Greater),
        _ => None,
    }
}
