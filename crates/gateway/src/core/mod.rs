//! Core gateway traits and abstractions.
//!
//! This module provides the contract every backend adapter implements:
//!
//! - [`Gateway`] - The seven data-access operations plus capability discovery
//! - [`Operation`] / [`OperationSet`] - Operation identifiers and bitmasks
//! - [`OperationArgs`] - Borrowed call arguments, forwarded opaquely
//! - [`Capabilities`] - Implemented/allowed operations and per-operation predicates
//!
//! # Example: Declaring a Read-Mostly Backend
//!
//! ```
//! use helios_gateway::core::{Capabilities, Operation, OperationArgs, OperationSet};
//!
//! // Implements everything, but only accepts reads and inserts.
//! let caps = Capabilities::all()
//!     .with_allowed(OperationSet::READ | OperationSet::PERSIST);
//!
//! assert!(caps.allows(&Operation::FetchAll, &OperationArgs::None));
//! assert!(caps.allows(&Operation::Persist, &OperationArgs::None));
//! assert!(!caps.allows(&Operation::Purge, &OperationArgs::None));
//! ```

pub mod capabilities;
pub mod gateway;
pub mod operation;

pub use capabilities::{Capabilities, CapabilityPredicate};
pub use gateway::{DynGateway, Gateway, unsupported};
pub use operation::{Operation, OperationArgs, OperationSet};
