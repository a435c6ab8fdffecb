//! Helios Gateway
//!
//! This crate provides a data-access indirection layer: application code reads
//! and writes entities through one uniform contract without knowing which
//! concrete backend (relational database, search index, cache, remote
//! service) serves each request.
//!
//! # Features
//!
//! - **Read fallback**: reads walk backends by read priority until one succeeds
//! - **Write fan-out**: writes reach every eligible backend, by write priority
//! - **Writing master**: one authoritative backend whose failure aborts a write
//! - **Capability checks**: backends declare, per operation and per call, what they accept
//! - **Failure sinks**: partial failures are reported without affecting control flow
//!
//! # Backend Features
//!
//! Available backend features:
//! - `memory` (default) - Process-local reference backend
//!
//! # Architecture
//!
//! - [`types`] - Entities, descriptors, result sets and write options
//! - [`error`] - Error types for all operations
//! - [`core`] - The [`Gateway`] adapter contract and capabilities
//! - [`meta`] - The [`MetaGateway`] orchestrator, priority tables and sinks
//! - [`backends`] - Backend implementations
//!
//! # Quick Start
//!
//! ```
//! # #[cfg(feature = "memory")]
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! use std::sync::Arc;
//! use helios_gateway::backends::InMemoryGateway;
//! use helios_gateway::types::{Entity, ResultSetDescriptor, WriteOptions};
//! use helios_gateway::MetaGateway;
//! use serde_json::json;
//!
//! let primary = Arc::new(InMemoryGateway::new("primary"));
//! let replica = Arc::new(InMemoryGateway::new("replica"));
//!
//! let mut meta = MetaGateway::new();
//! meta.register_writing_master("primary", primary.clone(), 0)?
//!     .register_backend("replica", replica.clone(), 10, 0, Default::default())?;
//!
//! // Same id on every backend.
//! let article = Entity::new("articles").with_field("title", json!("Hello"));
//! meta.persist_with(&[article], &WriteOptions::generated()).await?;
//!
//! // The replica answers first; if it goes down, reads fall back to the primary.
//! replica.set_available(false);
//! let all = meta.fetch_all(&ResultSetDescriptor::new("articles")).await?;
//! assert_eq!(all.len(), 1);
//! assert!(meta.did_fallback_on_last_read());
//! # Ok::<(), helios_gateway::GatewayError>(())
//! # }).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod core;
pub mod error;
pub mod meta;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{GatewayError, GatewayResult};
pub use types::{Entity, EntityKey, ResultSetDescriptor, WriteOptions};

// Re-export core traits
pub use crate::core::{Capabilities, DynGateway, Gateway, Operation, OperationArgs, OperationSet};

// Re-export the orchestrator
pub use meta::{FailureSink, MetaGateway, MetaGatewayConfig, RegistrationFlags};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
