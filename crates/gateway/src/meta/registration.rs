//! Backend registration records and flags.

use std::fmt;
use std::ops::BitOr;

use crate::core::DynGateway;

use super::priority::WRITING_MASTER_PRIORITY;

/// Flags accepted by [`MetaGateway::register_backend`](super::MetaGateway::register_backend).
///
/// Only [`RegistrationFlags::WRITING_MASTER`] is recognised; any other bit
/// makes the registration fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RegistrationFlags(u32);

impl RegistrationFlags {
    /// No flag.
    pub const NONE: Self = Self(0);

    /// Marks the backend as the single authority for writes.
    pub const WRITING_MASTER: Self = Self(1);

    /// Every recognised flag.
    pub const KNOWN: Self = Self::WRITING_MASTER;

    /// Builds flags from raw bits, keeping unknown bits so they can be rejected.
    pub const fn from_bits_retain(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if every bit of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the bits that are not recognised.
    pub const fn unknown_bits(self) -> u32 {
        self.0 & !Self::KNOWN.0
    }

    /// Returns true if the writing master flag is set.
    pub const fn is_writing_master(self) -> bool {
        self.contains(Self::WRITING_MASTER)
    }
}

impl BitOr for RegistrationFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A registered backend.
///
/// Created once per registration and owned by the orchestrator for its whole
/// lifetime. The priorities stored here are the ones actually assigned, after
/// collision handling and writing master promotion.
#[derive(Clone)]
pub struct BackendRegistration {
    pub(crate) id: String,
    pub(crate) gateway: DynGateway,
    pub(crate) read_priority: i64,
    pub(crate) write_priority: i64,
    pub(crate) writing_master: bool,
}

impl BackendRegistration {
    /// Returns the backend identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the adapter.
    pub fn gateway(&self) -> &DynGateway {
        &self.gateway
    }

    /// Returns the assigned read priority.
    pub fn read_priority(&self) -> i64 {
        self.read_priority
    }

    /// Returns the assigned write priority.
    pub fn write_priority(&self) -> i64 {
        self.write_priority
    }

    /// Returns true if this backend is the writing master.
    pub fn is_writing_master(&self) -> bool {
        self.writing_master
    }

    /// Short description used in diagnostics: `id (adapter name)`.
    pub fn describe(&self) -> String {
        format!("{} ({})", self.id, self.gateway.name())
    }
}

impl fmt::Debug for BackendRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistration")
            .field("id", &self.id)
            .field("gateway", &self.gateway.name())
            .field("read_priority", &self.read_priority)
            .field("write_priority", &self.write_priority)
            .field("writing_master", &self.writing_master)
            .finish()
    }
}

/// Returns true if a write priority marks the writing master.
pub(crate) fn is_master_priority(priority: i64) -> bool {
    priority == WRITING_MASTER_PRIORITY
}
