//! Error types for the gateway layer.
//!
//! This module defines all error types used throughout the gateway layer,
//! following a hierarchy that separates registration errors, backend errors,
//! configuration errors, and the aggregate routing failures raised by
//! [`MetaGateway`](crate::meta::MetaGateway).

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all gateway operations.
///
/// Adapter-level failures travel as [`BackendError`]. The orchestrator never
/// lets them escape a routed read or write directly: they are wrapped in
/// [`GatewayError::NoBackendSucceeded`] or [`GatewayError::WritingMasterFailure`],
/// with the original error kept as the `source`.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Backend registration errors
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// Errors raised by a backend adapter
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Declarative configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Every eligible backend failed a reading operation (or none was eligible).
    #[error(
        "no backend was able to perform reading operation ({operation}); attempted: [{}]; registered: [{}]",
        .attempted.join(", "),
        .registered.join(", ")
    )]
    NoBackendSucceeded {
        operation: String,
        attempted: Vec<String>,
        registered: Vec<String>,
        #[source]
        source: Option<Box<GatewayError>>,
    },

    /// The writing master failed a writing operation.
    #[error("writing master '{backend_id}' failed performing writing operation ({operation})")]
    WritingMasterFailure {
        backend_id: String,
        operation: String,
        #[source]
        source: Box<GatewayError>,
    },

    /// A backend returned a failure status for a writing operation without raising.
    #[error("backend '{backend_id}' did not achieve writing operation ({operation})")]
    BackendDidNotSucceed {
        backend_id: String,
        operation: String,
    },

    /// A backend reference matched no registered or supplied backend.
    #[error("backend reference '{id}' matches no known backend")]
    BackendNotFound { id: String },
}

impl GatewayError {
    /// Returns true if this is a writing master failure.
    pub fn is_writing_master_failure(&self) -> bool {
        matches!(self, GatewayError::WritingMasterFailure { .. })
    }

    /// Returns true if this is an exhausted read.
    pub fn is_no_backend_succeeded(&self) -> bool {
        matches!(self, GatewayError::NoBackendSucceeded { .. })
    }

    /// Returns the identifiers of the backends attempted by a failed read.
    pub fn attempted_backends(&self) -> Option<&[String]> {
        match self {
            GatewayError::NoBackendSucceeded { attempted, .. } => Some(attempted),
            _ => None,
        }
    }
}

/// Errors raised synchronously while registering a backend.
///
/// These are fatal to the registration call only; the orchestrator is left
/// exactly as it was before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// Backend identifiers must not be empty.
    #[error("backend identifier must not be empty")]
    EmptyId,

    /// Flags outside the recognised set were supplied.
    #[error("unknown registration flags {flags:#x}")]
    InvalidFlags { flags: u32 },

    /// The maximum write priority is reserved for the writing master.
    #[error(
        "write priority i64::MAX is reserved to the writing master; backend '{id}' was registered without the WRITING_MASTER flag"
    )]
    ReservedPriority { id: String },

    /// A writing master is already registered.
    #[error("cannot register '{id}' as writing master: '{existing}' already is")]
    DuplicateWritingMaster { id: String, existing: String },

    /// No free priority slot remains below the requested one.
    #[error("no free priority slot left for backend '{id}'")]
    PriorityExhausted { id: String },
}

/// Errors originating from a backend adapter.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend is currently unavailable.
    #[error("backend unavailable: {backend_name}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// The requested entity does not exist in this backend.
    #[error("entity not found in {backend_name}: {collection}/{id}")]
    NotFound {
        backend_name: String,
        collection: String,
        id: String,
    },

    /// The backend does not implement the operation.
    #[error("operation '{operation}' not supported by {backend_name}")]
    UnsupportedOperation {
        backend_name: String,
        operation: String,
    },

    /// The entity passed to the backend cannot be handled.
    #[error("invalid entity for {backend_name}: {message}")]
    InvalidEntity {
        backend_name: String,
        message: String,
    },

    /// Query evaluation failed.
    #[error("query failed in {backend_name}: {message}")]
    Query {
        backend_name: String,
        message: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    Serialization { message: String },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Errors found while validating a declarative gateway configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A backend entry has an empty identifier.
    #[error("backend entry #{index} has an empty identifier")]
    EmptyBackendId { index: usize },

    /// The same identifier appears twice.
    #[error("duplicate backend id: {0}")]
    DuplicateBackendId(String),

    /// More than one entry is flagged as writing master.
    #[error("multiple writing masters configured: {}", .0.join(", "))]
    MultipleWritingMasters(Vec<String>),

    /// A non-master entry requests the reserved write priority.
    #[error("backend '{0}' requests the write priority reserved to the writing master")]
    ReservedWritePriority(String),

    /// The configuration document could not be parsed.
    #[error("invalid configuration document: {0}")]
    Parse(String),
}

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Backend(BackendError::Serialization {
            message: err.to_string(),
        })
    }
}
