//! The backend adapter contract.
//!
//! This module defines the [`Gateway`] trait, implemented by every concrete
//! backend (relational database, search index, cache, remote service) and by
//! the [`MetaGateway`](crate::meta::MetaGateway) orchestrator itself.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::{BackendError, GatewayError, GatewayResult};
use crate::types::{Entity, EntityKey, Projection, ResultSet, ResultSetDescriptor, WriteOptions};

use super::capabilities::Capabilities;
use super::operation::{Operation, OperationArgs};

/// A dynamically typed gateway.
pub type DynGateway = Arc<dyn Gateway>;

/// A backend adapter.
///
/// Adapters implement the operations they support and declare them through
/// [`capabilities`](Gateway::capabilities). Operations left at their default
/// body fail with [`BackendError::UnsupportedOperation`].
///
/// # Failure signalling
///
/// Reads fail by returning an error. Writes may additionally return
/// `Ok(false)`, a soft failure meaning "nothing raised, but the write did not
/// happen"; orchestrators treat it like an error.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use helios_gateway::core::{Capabilities, Gateway, OperationSet};
/// use helios_gateway::error::GatewayResult;
/// use helios_gateway::types::{Entity, EntityKey};
///
/// struct RedisCache { caps: Capabilities, /* ... */ }
///
/// #[async_trait]
/// impl Gateway for RedisCache {
///     fn name(&self) -> &str { "redis" }
///
///     fn capabilities(&self) -> &Capabilities { &self.caps }
///
///     async fn fetch_one(&self, key: &EntityKey) -> GatewayResult<Entity> {
///         // ...
///     }
/// }
/// ```
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Returns a human-readable name for this backend.
    fn name(&self) -> &str;

    /// Returns the capabilities of this backend.
    fn capabilities(&self) -> &Capabilities;

    /// Answers whether this backend should be attempted for a call.
    fn can(&self, operation: &Operation, args: &OperationArgs<'_>) -> bool {
        self.capabilities().allows(operation, args)
    }

    /// Receives per-call options right before a write is attempted.
    fn set_options(&self, _options: &WriteOptions) {}

    /// Reads a projection.
    async fn fetch(&self, _descriptor: &ResultSetDescriptor) -> GatewayResult<Projection> {
        Err(unsupported(self.name(), Operation::Fetch))
    }

    /// Reads a set of entities.
    async fn fetch_all(&self, _descriptor: &ResultSetDescriptor) -> GatewayResult<ResultSet> {
        Err(unsupported(self.name(), Operation::FetchAll))
    }

    /// Reads a single entity.
    async fn fetch_one(&self, _key: &EntityKey) -> GatewayResult<Entity> {
        Err(unsupported(self.name(), Operation::FetchOne))
    }

    /// Stores entities.
    async fn persist(&self, _entities: &[Entity]) -> GatewayResult<bool> {
        Err(unsupported(self.name(), Operation::Persist))
    }

    /// Sets `data` on every entity matching the descriptor.
    async fn update(
        &self,
        _descriptor: &ResultSetDescriptor,
        _data: &Map<String, Value>,
    ) -> GatewayResult<bool> {
        Err(unsupported(self.name(), Operation::Update))
    }

    /// Deletes entities.
    async fn delete(&self, _entities: &[Entity]) -> GatewayResult<bool> {
        Err(unsupported(self.name(), Operation::Delete))
    }

    /// Deletes every entity matching the descriptor.
    async fn purge(&self, _descriptor: &ResultSetDescriptor) -> GatewayResult<bool> {
        Err(unsupported(self.name(), Operation::Purge))
    }
}

/// Builds the error returned by operations a backend does not implement.
pub fn unsupported(backend_name: &str, operation: Operation) -> GatewayError {
    GatewayError::Backend(BackendError::UnsupportedOperation {
        backend_name: backend_name.to_string(),
        operation: operation.to_string(),
    })
}
