//! The [`MetaGateway`] orchestrator.
//!
//! # Reads
//!
//! `fetch`, `fetch_all` and `fetch_one` walk the read priority table from the
//! highest priority down. Backends whose `can` answers false are skipped and
//! do not count as attempts. The first success wins; each failure is reported
//! to the failure sink before the next backend is tried. When every eligible
//! backend failed, the call fails with [`GatewayError::NoBackendSucceeded`].
//!
//! # Writes
//!
//! `persist`, `update`, `delete` and `purge` are fanned out to every eligible
//! backend in write priority order. A backend returning `Ok(false)` has
//! failed softly. Failures of ordinary backends are reported and absorbed;
//! a failure of the writing master stops the loop and fails the call with
//! [`GatewayError::WritingMasterFailure`].
//!
//! The returned status is the one of the last backend processed:
//!
//! | Outcome of the backend | Running status |
//! |------------------------|----------------|
//! | `Ok(true)` | `true` |
//! | `Ok(false)` | `false` |
//! | `Err(_)` (not master) | unchanged |
//!
//! With no eligible backend the status stays `false`.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::{debug, error, info, instrument, warn};

use crate::core::{Capabilities, DynGateway, Gateway, Operation, OperationArgs};
use crate::error::{GatewayError, GatewayResult, RegistrationError};
use crate::types::{Entity, EntityKey, Projection, ResultSet, ResultSetDescriptor, WriteOptions};

use super::events::{DynFailureSink, FailureEvent, FailureKind, TracingSink};
use super::priority::{PriorityTable, WRITING_MASTER_PRIORITY};
use super::registration::{BackendRegistration, RegistrationFlags, is_master_priority};
use super::stats::{BackendStats, StatsRegistry};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Default name reported through [`Gateway::name`].
const DEFAULT_NAME: &str = "meta";

/// Routes gateway operations over a set of prioritized backends.
///
/// Backends are registered once, usually at startup, then the orchestrator
/// is shared (typically behind an `Arc`) and serves concurrent calls.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use helios_gateway::backends::InMemoryGateway;
/// use helios_gateway::meta::{MetaGateway, RegistrationFlags};
/// use helios_gateway::types::{Entity, EntityKey, WriteOptions};
/// use serde_json::json;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let sql = Arc::new(InMemoryGateway::new("sql"));
/// let cache = Arc::new(InMemoryGateway::new("cache"));
///
/// let mut meta = MetaGateway::new();
/// meta.register_backend("sql", sql.clone(), 0, 0, RegistrationFlags::WRITING_MASTER)?
///     .register_backend("cache", cache.clone(), 10, 0, RegistrationFlags::NONE)?;
///
/// let user = Entity::new("users").with_field("name", json!("Ada"));
/// let options = WriteOptions::new().with_new_id("42");
/// assert!(meta.persist_with(&[user], &options).await?);
///
/// // Served by the cache, which has the highest read priority.
/// let found = meta.fetch_one(&EntityKey::new("users", "42")).await?;
/// assert_eq!(found.get("name"), Some(&json!("Ada")));
/// assert!(!meta.did_fallback_on_last_read());
/// # Ok::<(), helios_gateway::GatewayError>(())
/// # }).unwrap();
/// ```
pub struct MetaGateway {
    name: String,
    capabilities: Capabilities,
    records: Vec<BackendRegistration>,
    read_priorities: PriorityTable,
    write_priorities: PriorityTable,
    did_fallback: AtomicBool,
    sink: DynFailureSink,
    stats: StatsRegistry,
    pending_options: Mutex<Option<WriteOptions>>,
}

impl MetaGateway {
    /// Creates an orchestrator with no backend, logging failures through `tracing`.
    pub fn new() -> Self {
        Self::with_sink(Arc::new(TracingSink))
    }

    /// Creates an orchestrator reporting failures to `sink`.
    pub fn with_sink(sink: DynFailureSink) -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            capabilities: Capabilities::all(),
            records: Vec::new(),
            read_priorities: PriorityTable::new(),
            write_priorities: PriorityTable::new(),
            did_fallback: AtomicBool::new(false),
            sink,
            stats: StatsRegistry::new(),
            pending_options: Mutex::new(None),
        }
    }

    /// Sets the name reported when this orchestrator is itself used as a backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replaces the failure sink.
    pub fn set_failure_sink(&mut self, sink: DynFailureSink) {
        self.sink = sink;
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Registers a backend, or replaces the one registered under `id`.
    ///
    /// The backend is inserted in both priority tables. A requested priority
    /// that is already taken resolves to the next free slot below it. With
    /// [`RegistrationFlags::WRITING_MASTER`], the write priority is forced to
    /// [`WRITING_MASTER_PRIORITY`] whatever value was supplied.
    ///
    /// # Errors
    ///
    /// - [`RegistrationError::EmptyId`] if `id` is empty
    /// - [`RegistrationError::InvalidFlags`] if an unknown flag is set
    /// - [`RegistrationError::ReservedPriority`] if `write_priority` is
    ///   [`WRITING_MASTER_PRIORITY`] without the writing master flag
    /// - [`RegistrationError::DuplicateWritingMaster`] if a writing master is
    ///   already registered, including under the same `id`
    /// - [`RegistrationError::PriorityExhausted`] if no slot is left below
    ///   the requested priority
    ///
    /// A failed registration leaves the orchestrator unchanged.
    pub fn register_backend(
        &mut self,
        id: impl Into<String>,
        gateway: DynGateway,
        read_priority: i64,
        write_priority: i64,
        flags: RegistrationFlags,
    ) -> GatewayResult<&mut Self> {
        let id = id.into();
        let writing_master = self.validate_registration(&id, write_priority, flags)?;

        let mut read_table = self.read_priorities.clone();
        let mut write_table = self.write_priorities.clone();
        read_table.remove(&id);
        write_table.remove(&id);

        let read_priority = read_table.insert(id.clone(), read_priority)?;
        let write_priority = if writing_master {
            write_table.insert_exact(id.clone(), WRITING_MASTER_PRIORITY);
            WRITING_MASTER_PRIORITY
        } else {
            write_table.insert(id.clone(), write_priority)?
        };

        self.read_priorities = read_table;
        self.write_priorities = write_table;
        self.stats.track(&id);

        info!(
            backend_id = %id,
            backend = gateway.name(),
            read_priority,
            write_priority,
            writing_master,
            "Registered backend"
        );

        let record = BackendRegistration {
            id,
            gateway,
            read_priority,
            write_priority,
            writing_master,
        };
        match self.records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }

        Ok(self)
    }

    /// Registers a backend with priorities `0`/`0` and no flag.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        gateway: DynGateway,
    ) -> GatewayResult<&mut Self> {
        self.register_backend(id, gateway, 0, 0, RegistrationFlags::NONE)
    }

    /// Registers the writing master.
    pub fn register_writing_master(
        &mut self,
        id: impl Into<String>,
        gateway: DynGateway,
        read_priority: i64,
    ) -> GatewayResult<&mut Self> {
        self.register_backend(
            id,
            gateway,
            read_priority,
            WRITING_MASTER_PRIORITY,
            RegistrationFlags::WRITING_MASTER,
        )
    }

    /// Checks a registration request, returning whether it is for the writing master.
    fn validate_registration(
        &self,
        id: &str,
        write_priority: i64,
        flags: RegistrationFlags,
    ) -> Result<bool, RegistrationError> {
        if id.is_empty() {
            return Err(RegistrationError::EmptyId);
        }

        if flags.unknown_bits() != 0 {
            return Err(RegistrationError::InvalidFlags { flags: flags.bits() });
        }

        let writing_master = flags.is_writing_master();
        if !writing_master && is_master_priority(write_priority) {
            return Err(RegistrationError::ReservedPriority { id: id.to_string() });
        }

        if writing_master {
            if let Some(existing) = self.writing_master() {
                return Err(RegistrationError::DuplicateWritingMaster {
                    id: id.to_string(),
                    existing: existing.to_string(),
                });
            }
        }

        Ok(writing_master)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Returns the registered backends, in registration order.
    pub fn backends(&self) -> &[BackendRegistration] {
        &self.records
    }

    /// Returns the registered backend identifiers, in registration order.
    pub fn backend_ids(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.id.as_str()).collect()
    }

    /// Returns the adapter registered under `id`.
    pub fn backend(&self, id: &str) -> Option<&DynGateway> {
        self.registration(id).map(|r| &r.gateway)
    }

    /// Returns the registration record of `id`.
    pub fn registration(&self, id: &str) -> Option<&BackendRegistration> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Returns the read priority table.
    pub fn read_priorities(&self) -> &PriorityTable {
        &self.read_priorities
    }

    /// Returns the write priority table.
    pub fn write_priorities(&self) -> &PriorityTable {
        &self.write_priorities
    }

    /// Returns the identifier of the writing master, if one is registered.
    pub fn writing_master(&self) -> Option<&str> {
        self.write_priorities.get(WRITING_MASTER_PRIORITY)
    }

    /// Returns true if the last read succeeded on a backend other than the
    /// first one attempted.
    pub fn did_fallback_on_last_read(&self) -> bool {
        self.did_fallback.load(Ordering::SeqCst)
    }

    /// Returns a snapshot of the outcome counters of a backend.
    pub fn backend_stats(&self, id: &str) -> Option<BackendStats> {
        self.stats.get(id)
    }

    /// Returns the counters registry.
    pub fn stats(&self) -> &StatsRegistry {
        &self.stats
    }

    // ========================================================================
    // Capability query
    // ========================================================================

    /// Returns true if at least one registered backend can perform the call.
    ///
    /// Backends are asked in registration order; priorities play no role.
    pub fn can(&self, operation: &Operation, args: &OperationArgs<'_>) -> bool {
        self.records.iter().any(|r| r.gateway.can(operation, args))
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Reads a projection from the first backend able to serve it.
    #[instrument(skip(self, descriptor), fields(operation = "fetch", collection = %descriptor.collection()))]
    pub async fn fetch(&self, descriptor: &ResultSetDescriptor) -> GatewayResult<Projection> {
        self.route_read(
            Operation::Fetch,
            OperationArgs::Descriptor(descriptor),
            move |gateway| gateway.fetch(descriptor),
        )
        .await
    }

    /// Reads a set of entities from the first backend able to serve it.
    #[instrument(skip(self, descriptor), fields(operation = "fetch_all", collection = %descriptor.collection()))]
    pub async fn fetch_all(&self, descriptor: &ResultSetDescriptor) -> GatewayResult<ResultSet> {
        self.route_read(
            Operation::FetchAll,
            OperationArgs::Descriptor(descriptor),
            move |gateway| gateway.fetch_all(descriptor),
        )
        .await
    }

    /// Reads a single entity from the first backend able to serve it.
    #[instrument(skip(self, key), fields(operation = "fetch_one", key = %key))]
    pub async fn fetch_one(&self, key: &EntityKey) -> GatewayResult<Entity> {
        self.route_read(Operation::FetchOne, OperationArgs::Key(key), move |gateway| {
            gateway.fetch_one(key)
        })
        .await
    }

    async fn route_read<'a, T, F>(
        &'a self,
        operation: Operation,
        args: OperationArgs<'a>,
        call: F,
    ) -> GatewayResult<T>
    where
        T: Send,
        F: Fn(&'a dyn Gateway) -> BoxFuture<'a, GatewayResult<T>> + Send,
    {
        self.did_fallback.store(false, Ordering::SeqCst);

        let mut attempted: Vec<String> = Vec::new();
        let mut last_error: Option<GatewayError> = None;

        for (priority, id) in self.read_priorities.iter() {
            let Some(record) = self.registration(id) else {
                continue;
            };
            let gateway = record.gateway.as_ref();

            if !gateway.can(&operation, &args) {
                debug!(backend_id = id, priority, "Backend cannot serve read, skipping");
                continue;
            }

            attempted.push(id.to_string());
            match call(gateway).await {
                Ok(value) => {
                    self.stats.record_success(id);
                    if attempted.len() > 1 {
                        self.did_fallback.store(true, Ordering::SeqCst);
                        debug!(
                            backend_id = id,
                            attempts = attempted.len(),
                            "Read served by fallback backend"
                        );
                    }
                    return Ok(value);
                }
                Err(e) => {
                    warn!(backend_id = id, priority, error = %e, "Backend failed reading");
                    self.report_failure(FailureKind::Read, id, &operation, &args, &e);
                    last_error = Some(e);
                }
            }
        }

        Err(GatewayError::NoBackendSucceeded {
            operation: operation.to_string(),
            attempted,
            registered: self.records.iter().map(BackendRegistration::describe).collect(),
            source: last_error.map(Box::new),
        })
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Stores entities on every eligible backend.
    ///
    /// Uses the options stored by [`Gateway::set_options`], if any.
    pub async fn persist(&self, entities: &[Entity]) -> GatewayResult<bool> {
        let options = self.take_pending_options();
        self.persist_with(entities, &options).await
    }

    /// Stores entities on every eligible backend, with per-call options.
    #[instrument(skip_all, fields(operation = "persist", count = entities.len()))]
    pub async fn persist_with(
        &self,
        entities: &[Entity],
        options: &WriteOptions,
    ) -> GatewayResult<bool> {
        self.route_write(
            Operation::Persist,
            OperationArgs::Entities(entities),
            options,
            move |gateway| gateway.persist(entities),
        )
        .await
    }

    /// Updates matching entities on every eligible backend.
    pub async fn update(
        &self,
        descriptor: &ResultSetDescriptor,
        data: &Map<String, Value>,
    ) -> GatewayResult<bool> {
        let options = self.take_pending_options();
        self.update_with(descriptor, data, &options).await
    }

    /// Updates matching entities on every eligible backend, with per-call options.
    #[instrument(skip_all, fields(operation = "update", collection = %descriptor.collection()))]
    pub async fn update_with(
        &self,
        descriptor: &ResultSetDescriptor,
        data: &Map<String, Value>,
        options: &WriteOptions,
    ) -> GatewayResult<bool> {
        self.route_write(
            Operation::Update,
            OperationArgs::Update { descriptor, data },
            options,
            move |gateway| gateway.update(descriptor, data),
        )
        .await
    }

    /// Deletes entities on every eligible backend.
    pub async fn delete(&self, entities: &[Entity]) -> GatewayResult<bool> {
        let options = self.take_pending_options();
        self.delete_with(entities, &options).await
    }

    /// Deletes entities on every eligible backend, with per-call options.
    #[instrument(skip_all, fields(operation = "delete", count = entities.len()))]
    pub async fn delete_with(
        &self,
        entities: &[Entity],
        options: &WriteOptions,
    ) -> GatewayResult<bool> {
        self.route_write(
            Operation::Delete,
            OperationArgs::Entities(entities),
            options,
            move |gateway| gateway.delete(entities),
        )
        .await
    }

    /// Deletes matching entities on every eligible backend.
    pub async fn purge(&self, descriptor: &ResultSetDescriptor) -> GatewayResult<bool> {
        let options = self.take_pending_options();
        self.purge_with(descriptor, &options).await
    }

    /// Deletes matching entities on every eligible backend, with per-call options.
    #[instrument(skip_all, fields(operation = "purge", collection = %descriptor.collection()))]
    pub async fn purge_with(
        &self,
        descriptor: &ResultSetDescriptor,
        options: &WriteOptions,
    ) -> GatewayResult<bool> {
        self.route_write(
            Operation::Purge,
            OperationArgs::Descriptor(descriptor),
            options,
            move |gateway| gateway.purge(descriptor),
        )
        .await
    }

    async fn route_write<'a, F>(
        &'a self,
        operation: Operation,
        args: OperationArgs<'a>,
        options: &'a WriteOptions,
        call: F,
    ) -> GatewayResult<bool>
    where
        F: Fn(&'a dyn Gateway) -> BoxFuture<'a, GatewayResult<bool>> + Send,
    {
        let mut status = false;
        let mut eligible = 0usize;

        for (priority, id) in self.write_priorities.iter() {
            let Some(record) = self.registration(id) else {
                continue;
            };
            let gateway = record.gateway.as_ref();

            if !gateway.can(&operation, &args) {
                debug!(backend_id = id, priority, "Backend cannot perform write, skipping");
                continue;
            }

            eligible += 1;
            gateway.set_options(options);

            let failure = match call(gateway).await {
                Ok(true) => {
                    status = true;
                    self.stats.record_success(id);
                    continue;
                }
                Ok(false) => {
                    status = false;
                    GatewayError::BackendDidNotSucceed {
                        backend_id: id.to_string(),
                        operation: operation.to_string(),
                    }
                }
                Err(e) => e,
            };

            self.report_failure(FailureKind::Write, id, &operation, &args, &failure);

            if is_master_priority(priority) {
                error!(backend_id = id, error = %failure, "Writing master failed, aborting write");
                return Err(GatewayError::WritingMasterFailure {
                    backend_id: id.to_string(),
                    operation: operation.to_string(),
                    source: Box::new(failure),
                });
            }

            warn!(backend_id = id, priority, error = %failure, "Backend failed writing, continuing");
        }

        if eligible == 0 {
            debug!("No backend eligible for write");
        }

        Ok(status)
    }

    fn report_failure(
        &self,
        kind: FailureKind,
        backend_id: &str,
        operation: &Operation,
        args: &OperationArgs<'_>,
        error: &GatewayError,
    ) {
        self.stats.record_failure(backend_id, error.to_string());
        self.sink.notify(&FailureEvent {
            kind,
            backend_id,
            operation,
            args,
            error,
        });
    }

    fn take_pending_options(&self) -> WriteOptions {
        self.pending_options.lock().take().unwrap_or_default()
    }
}

impl Default for MetaGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MetaGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaGateway")
            .field("name", &self.name)
            .field("backends", &self.records)
            .field("read_priorities", &self.read_priorities)
            .field("write_priorities", &self.write_priorities)
            .field("did_fallback", &self.did_fallback_on_last_read())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Gateway for MetaGateway {
    fn name(&self) -> &str {
        &self.name
    }

    /// Declares every standard operation.
    ///
    /// This is not what the orchestrator can actually serve: the registered
    /// backends decide that, so callers must ask [`Gateway::can`], which is
    /// answered by [`MetaGateway::can`].
    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn can(&self, operation: &Operation, args: &OperationArgs<'_>) -> bool {
        MetaGateway::can(self, operation, args)
    }

    fn set_options(&self, options: &WriteOptions) {
        *self.pending_options.lock() = Some(options.clone());
    }

    async fn fetch(&self, descriptor: &ResultSetDescriptor) -> GatewayResult<Projection> {
        MetaGateway::fetch(self, descriptor).await
    }

    async fn fetch_all(&self, descriptor: &ResultSetDescriptor) -> GatewayResult<ResultSet> {
        MetaGateway::fetch_all(self, descriptor).await
    }

    async fn fetch_one(&self, key: &EntityKey) -> GatewayResult<Entity> {
        MetaGateway::fetch_one(self, key).await
    }

    async fn persist(&self, entities: &[Entity]) -> GatewayResult<bool> {
        MetaGateway::persist(self, entities).await
    }

    async fn update(
        &self,
        descriptor: &ResultSetDescriptor,
        data: &Map<String, Value>,
    ) -> GatewayResult<bool> {
        MetaGateway::update(self, descriptor, data).await
    }

    async fn delete(&self, entities: &[Entity]) -> GatewayResult<bool> {
        MetaGateway::delete(self, entities).await
    }

    async fn purge(&self, descriptor: &ResultSetDescriptor) -> GatewayResult<bool> {
        MetaGateway::purge(self, descriptor).await
    }
}
