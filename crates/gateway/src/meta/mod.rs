//! Priority-routed orchestration over several backends.
//!
//! [`MetaGateway`] holds a set of registered backends and two
//! [`PriorityTable`]s, one for reads and one for writes.
//!
//! | Operation kind | Backends attempted | On backend failure |
//! |----------------|--------------------|--------------------|
//! | Read | In read priority order, until one succeeds | Report, try the next one |
//! | Write | Every eligible backend, in write priority order | Report; abort if writing master |
//!
//! # Components
//!
//! - [`priority`] - Collision-free priority tables
//! - [`registration`] - Registration flags and records
//! - [`gateway`] - The orchestrator and its routing algorithms
//! - [`events`] - Failure sinks
//! - [`stats`] - Per-backend outcome counters
//! - [`config`] - Declarative configuration
//!
//! # Example
//!
//! ```ignore
//! use helios_gateway::meta::{ChannelSink, MetaGateway};
//!
//! let (sink, mut failures) = ChannelSink::new();
//! let mut meta = MetaGateway::with_sink(Arc::new(sink));
//! meta.register_writing_master("mysql", mysql, 0)?
//!     .register_backend("redis", redis, 10, -10, RegistrationFlags::NONE)?
//!     .register_backend("elastic", elastic, -10, 0, RegistrationFlags::NONE)?;
//!
//! // Served by redis, or by mysql when redis misses.
//! let user = meta.fetch_one(&EntityKey::new("users", "42")).await?;
//!
//! // Written to mysql first, then elastic, then redis.
//! meta.persist_with(&[article], &WriteOptions::generated()).await?;
//! ```

pub mod config;
pub mod events;
pub mod gateway;
pub mod priority;
pub mod registration;
pub mod stats;

pub use config::{BackendEntry, ConfigWarning, MetaGatewayConfig, MetaGatewayConfigBuilder};
pub use events::{
    ChannelSink, DynFailureSink, FailureEvent, FailureKind, FailureRecord, FailureSink, NullSink,
    TracingSink,
};
pub use gateway::MetaGateway;
pub use priority::{PriorityTable, WRITING_MASTER_PRIORITY};
pub use registration::{BackendRegistration, RegistrationFlags};
pub use stats::{BackendStats, StatsRegistry};
