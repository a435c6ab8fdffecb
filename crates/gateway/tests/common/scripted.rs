//! A backend whose outcome is scripted per operation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value, json};

use helios_gateway::core::{Capabilities, Gateway, Operation};
use helios_gateway::error::{BackendError, GatewayResult};
use helios_gateway::types::{
    Entity, EntityKey, Projection, ResultSet, ResultSetDescriptor, WriteOptions,
};

/// Shared, ordered log of calls across several backends, as `"name:operation"`.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Creates an empty call log.
pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Outcome of a scripted operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Returns a result (`Ok(true)` for writes).
    Succeed,
    /// Raises [`BackendError::Unavailable`].
    Fail,
    /// Returns `Ok(false)` for writes. Reads behave as [`Behavior::Fail`].
    SoftFail,
}

/// A backend whose outcome is chosen per operation.
///
/// Every operation succeeds unless scripted otherwise. Successful reads tag
/// their results with the backend name under the `source` field.
pub struct ScriptedGateway {
    name: String,
    caps: Capabilities,
    behaviors: Mutex<HashMap<Operation, Behavior>>,
    calls: Mutex<Vec<Operation>>,
    options: Mutex<Vec<WriteOptions>>,
    log: Option<CallLog>,
}

impl ScriptedGateway {
    /// Creates a backend implementing and allowing every standard operation.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            caps: Capabilities::all(),
            behaviors: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            options: Mutex::new(Vec::new()),
            log: None,
        }
    }

    /// Replaces the declared capabilities.
    pub fn with_capabilities(mut self, caps: Capabilities) -> Self {
        self.caps = caps;
        self
    }

    /// Makes an operation raise.
    pub fn failing(self, operation: Operation) -> Self {
        self.set_behavior(operation, Behavior::Fail);
        self
    }

    /// Makes a write return `Ok(false)`.
    pub fn soft_failing(self, operation: Operation) -> Self {
        self.set_behavior(operation, Behavior::SoftFail);
        self
    }

    /// Appends every call to a shared log.
    pub fn with_log(mut self, log: &CallLog) -> Self {
        self.log = Some(log.clone());
        self
    }

    /// Wraps the backend in an `Arc`.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Changes the outcome of an operation.
    pub fn set_behavior(&self, operation: Operation, behavior: Behavior) {
        self.behaviors.lock().insert(operation, behavior);
    }

    /// Returns how many times an operation was invoked.
    pub fn calls(&self, operation: &Operation) -> usize {
        self.calls.lock().iter().filter(|op| *op == operation).count()
    }

    /// Returns how many operations were invoked in total.
    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns the options received through `set_options`, in order.
    pub fn received_options(&self) -> Vec<WriteOptions> {
        self.options.lock().clone()
    }

    fn invoke(&self, operation: Operation) -> Behavior {
        if let Some(log) = &self.log {
            log.lock().push(format!("{}:{}", self.name, operation));
        }
        let behavior = self
            .behaviors
            .lock()
            .get(&operation)
            .copied()
            .unwrap_or(Behavior::Succeed);
        self.calls.lock().push(operation);
        behavior
    }

    fn error(&self, operation: &Operation) -> BackendError {
        BackendError::Unavailable {
            backend_name: self.name.clone(),
            message: format!("scripted failure of {operation}"),
        }
    }

    fn read(&self, operation: Operation) -> GatewayResult<()> {
        match self.invoke(operation.clone()) {
            Behavior::Succeed => Ok(()),
            Behavior::Fail | Behavior::SoftFail => Err(self.error(&operation).into()),
        }
    }

    fn write(&self, operation: Operation) -> GatewayResult<bool> {
        match self.invoke(operation.clone()) {
            Behavior::Succeed => Ok(true),
            Behavior::SoftFail => Ok(false),
            Behavior::Fail => Err(self.error(&operation).into()),
        }
    }

    fn tagged(&self, collection: &str) -> Entity {
        Entity::new(collection).with_field("source", json!(self.name))
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    fn set_options(&self, options: &WriteOptions) {
        self.options.lock().push(options.clone());
    }

    async fn fetch(&self, _descriptor: &ResultSetDescriptor) -> GatewayResult<Projection> {
        self.read(Operation::Fetch)?;
        let mut row = Map::new();
        row.insert("source".to_string(), json!(self.name));
        Ok(Projection::new(vec![row]))
    }

    async fn fetch_all(&self, descriptor: &ResultSetDescriptor) -> GatewayResult<ResultSet> {
        self.read(Operation::FetchAll)?;
        Ok(ResultSet::new(vec![self.tagged(descriptor.collection())]))
    }

    async fn fetch_one(&self, key: &EntityKey) -> GatewayResult<Entity> {
        self.read(Operation::FetchOne)?;
        Ok(self.tagged(&key.collection).with_id(key.id.clone()))
    }

    async fn persist(&self, _entities: &[Entity]) -> GatewayResult<bool> {
        self.write(Operation::Persist)
    }

    async fn update(
        &self,
        _descriptor: &ResultSetDescriptor,
        _data: &Map<String, Value>,
    ) -> GatewayResult<bool> {
        self.write(Operation::Update)
    }

    async fn delete(&self, _entities: &[Entity]) -> GatewayResult<bool> {
        self.write(Operation::Delete)
    }

    async fn purge(&self, _descriptor: &ResultSetDescriptor) -> GatewayResult<bool> {
        self.write(Operation::Purge)
    }
}

/// Returns the `source` tag of an entity produced by a [`ScriptedGateway`].
pub fn source_of(entity: &Entity) -> Option<&str> {
    entity.get("source").and_then(Value::as_str)
}
