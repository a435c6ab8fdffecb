//! Declarative configuration for [`MetaGateway`].
//!
//! A configuration lists backend entries by identifier; the adapters
//! themselves are supplied separately, keyed by the same identifiers.
//!
//! # Example
//!
//! ```
//! use helios_gateway::meta::{BackendEntry, MetaGatewayConfig};
//!
//! let config = MetaGatewayConfig::builder()
//!     .writing_master("sql", 0)
//!     .backend("cache", 10, 0)
//!     .with_backend(BackendEntry::new("search").with_write_priority(-5))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.writing_master_id(), Some("sql"));
//!
//! let parsed = MetaGatewayConfig::from_json(r#"{
//!     "backends": [
//!         { "id": "sql", "writing_master": true },
//!         { "id": "cache", "read_priority": 10 }
//!     ]
//! }"#).unwrap();
//! assert_eq!(parsed.backends.len(), 2);
//! assert!(parsed.backends[1].enabled);
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::DynGateway;
use crate::error::{ConfigError, GatewayError, GatewayResult};

use super::gateway::MetaGateway;
use super::priority::WRITING_MASTER_PRIORITY;
use super::registration::RegistrationFlags;

/// Configuration of a single backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendEntry {
    /// Identifier the backend is registered under.
    pub id: String,

    /// Requested read priority.
    #[serde(default)]
    pub read_priority: i64,

    /// Requested write priority. Ignored for the writing master.
    #[serde(default)]
    pub write_priority: i64,

    /// Whether this backend is the writing master.
    #[serde(default)]
    pub writing_master: bool,

    /// Whether this backend is registered at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl BackendEntry {
    /// Creates an enabled entry with priorities `0`/`0`.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            read_priority: 0,
            write_priority: 0,
            writing_master: false,
            enabled: default_enabled(),
        }
    }

    /// Sets the read priority.
    pub fn with_read_priority(mut self, priority: i64) -> Self {
        self.read_priority = priority;
        self
    }

    /// Sets the write priority.
    pub fn with_write_priority(mut self, priority: i64) -> Self {
        self.write_priority = priority;
        self
    }

    /// Marks the entry as writing master.
    pub fn as_writing_master(mut self) -> Self {
        self.writing_master = true;
        self
    }

    /// Enables or disables the entry.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Returns the registration flags of this entry.
    pub fn flags(&self) -> RegistrationFlags {
        if self.writing_master {
            RegistrationFlags::WRITING_MASTER
        } else {
            RegistrationFlags::NONE
        }
    }
}

/// Complete orchestrator configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaGatewayConfig {
    /// Backends, in registration order.
    #[serde(default)]
    pub backends: Vec<BackendEntry>,
}

impl MetaGatewayConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for constructing configuration.
    pub fn builder() -> MetaGatewayConfigBuilder {
        MetaGatewayConfigBuilder::new()
    }

    /// Parses a JSON configuration document.
    ///
    /// The document is parsed only; call [`validate`](Self::validate) to
    /// check it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Returns the entry with the given identifier.
    pub fn backend(&self, id: &str) -> Option<&BackendEntry> {
        self.backends.iter().find(|b| b.id == id)
    }

    /// Returns the enabled entries, in declaration order.
    pub fn enabled_backends(&self) -> impl Iterator<Item = &BackendEntry> {
        self.backends.iter().filter(|b| b.enabled)
    }

    /// Returns the identifier of the enabled writing master.
    pub fn writing_master_id(&self) -> Option<&str> {
        self.enabled_backends()
            .find(|b| b.writing_master)
            .map(|b| b.id.as_str())
    }

    /// Validates the configuration.
    ///
    /// Returns warnings for suspicious but usable settings.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, ConfigError> {
        let mut warnings = Vec::new();

        let mut seen_ids = HashSet::new();
        for (index, backend) in self.backends.iter().enumerate() {
            if backend.id.is_empty() {
                return Err(ConfigError::EmptyBackendId { index });
            }
            if !seen_ids.insert(backend.id.as_str()) {
                return Err(ConfigError::DuplicateBackendId(backend.id.clone()));
            }
        }

        let masters: Vec<_> = self
            .enabled_backends()
            .filter(|b| b.writing_master)
            .map(|b| b.id.clone())
            .collect();
        if masters.len() > 1 {
            return Err(ConfigError::MultipleWritingMasters(masters));
        }

        for backend in self.enabled_backends() {
            if backend.writing_master {
                if backend.write_priority != 0 && backend.write_priority != WRITING_MASTER_PRIORITY
                {
                    warnings.push(ConfigWarning::MasterWritePriorityIgnored {
                        backend_id: backend.id.clone(),
                        requested: backend.write_priority,
                    });
                }
            } else if backend.write_priority == WRITING_MASTER_PRIORITY {
                return Err(ConfigError::ReservedWritePriority(backend.id.clone()));
            }
        }

        if masters.is_empty() {
            warnings.push(ConfigWarning::NoWritingMaster);
        }

        for backend in self.backends.iter().filter(|b| !b.enabled) {
            warnings.push(ConfigWarning::DisabledBackend(backend.id.clone()));
        }

        Ok(warnings)
    }
}

/// Builder for constructing [`MetaGatewayConfig`].
#[derive(Debug, Default)]
pub struct MetaGatewayConfigBuilder {
    backends: Vec<BackendEntry>,
}

impl MetaGatewayConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a backend entry.
    pub fn with_backend(mut self, backend: BackendEntry) -> Self {
        self.backends.push(backend);
        self
    }

    /// Adds an ordinary backend.
    pub fn backend(self, id: impl Into<String>, read_priority: i64, write_priority: i64) -> Self {
        self.with_backend(
            BackendEntry::new(id)
                .with_read_priority(read_priority)
                .with_write_priority(write_priority),
        )
    }

    /// Adds the writing master.
    pub fn writing_master(self, id: impl Into<String>, read_priority: i64) -> Self {
        self.with_backend(
            BackendEntry::new(id)
                .with_read_priority(read_priority)
                .as_writing_master(),
        )
    }

    /// Builds the configuration, validating it first.
    pub fn build(self) -> Result<MetaGatewayConfig, ConfigError> {
        let config = MetaGatewayConfig {
            backends: self.backends,
        };

        // Validate and ignore warnings for build
        let _ = config.validate()?;
        Ok(config)
    }

    /// Builds the configuration and returns warnings.
    pub fn build_with_warnings(
        self,
    ) -> Result<(MetaGatewayConfig, Vec<ConfigWarning>), ConfigError> {
        let config = MetaGatewayConfig {
            backends: self.backends,
        };

        let warnings = config.validate()?;
        Ok((config, warnings))
    }
}

/// Non-fatal configuration findings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// No enabled backend is the writing master: every write failure is tolerated.
    NoWritingMaster,

    /// The writing master requested a write priority that will be overridden.
    MasterWritePriorityIgnored {
        /// The writing master.
        backend_id: String,
        /// The priority that was requested.
        requested: i64,
    },

    /// The entry is disabled and will not be registered.
    DisabledBackend(String),
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::NoWritingMaster => {
                write!(
                    f,
                    "no writing master configured; failed writes will never be reported to callers"
                )
            }
            ConfigWarning::MasterWritePriorityIgnored {
                backend_id,
                requested,
            } => {
                write!(
                    f,
                    "write priority {requested} of writing master '{backend_id}' is ignored"
                )
            }
            ConfigWarning::DisabledBackend(id) => write!(f, "backend '{id}' is disabled"),
        }
    }
}

impl MetaGateway {
    /// Builds an orchestrator from a configuration and the adapters it names.
    ///
    /// Enabled entries are registered in declaration order. Adapters in
    /// `gateways` that the configuration does not mention are ignored.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::Config`] if the configuration is invalid
    /// - [`GatewayError::BackendNotFound`] if an enabled entry has no adapter
    /// - any registration error
    pub fn from_config(
        config: &MetaGatewayConfig,
        gateways: &HashMap<String, DynGateway>,
    ) -> GatewayResult<Self> {
        for warning in config.validate()? {
            warn!(%warning, "Gateway configuration warning");
        }

        let mut meta = MetaGateway::new();
        for entry in config.enabled_backends() {
            let gateway = gateways
                .get(&entry.id)
                .cloned()
                .ok_or_else(|| GatewayError::BackendNotFound {
                    id: entry.id.clone(),
                })?;

            meta.register_backend(
                entry.id.clone(),
                gateway,
                entry.read_priority,
                entry.write_priority,
                entry.flags(),
            )?;
        }

        Ok(meta)
    }
}
