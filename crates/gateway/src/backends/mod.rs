//! Backend adapter implementations.
//!
//! Concrete adapters implement [`Gateway`](crate::core::Gateway). Each one is
//! gated behind a feature flag.
//!
//! # Available Backends
//!
//! | Backend | Feature | Description |
//! |---------|---------|-------------|
//! | In-memory | `memory` | Process-local collections, for tests and prototyping |
//!
//! # Example
//!
//! ```
//! # #[cfg(feature = "memory")]
//! # {
//! use helios_gateway::backends::InMemoryGateway;
//! use helios_gateway::core::OperationSet;
//!
//! // A read-only replica
//! let replica = InMemoryGateway::new("replica").with_allowed(OperationSet::READ);
//! # }
//! ```

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "memory")]
pub use memory::InMemoryGateway;
