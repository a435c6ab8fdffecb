//! Operations and operation sets.
//!
//! Every call routed through a gateway is identified by an [`Operation`].
//! The seven standard operations map to bits of an [`OperationSet`], which
//! backends use as a static allow-list. Anything else is a
//! [`Operation::Custom`] operation that only takes part in capability queries.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{Entity, EntityKey, ResultSetDescriptor};

/// A gateway operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operation {
    /// Read a projection.
    Fetch,
    /// Read a single entity by key.
    FetchOne,
    /// Read a set of entities.
    FetchAll,
    /// Store entities.
    Persist,
    /// Update every entity matching a descriptor.
    Update,
    /// Delete entities.
    Delete,
    /// Delete every entity matching a descriptor.
    Purge,
    /// A backend-specific operation.
    Custom(String),
}

impl Operation {
    /// The standard operations, reads first.
    pub const STANDARD: [Operation; 7] = [
        Operation::Fetch,
        Operation::FetchOne,
        Operation::FetchAll,
        Operation::Persist,
        Operation::Update,
        Operation::Delete,
        Operation::Purge,
    ];

    /// Returns the snake_case name of this operation.
    pub fn name(&self) -> &str {
        match self {
            Operation::Fetch => "fetch",
            Operation::FetchOne => "fetch_one",
            Operation::FetchAll => "fetch_all",
            Operation::Persist => "persist",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Purge => "purge",
            Operation::Custom(name) => name,
        }
    }

    /// Parses an operation name.
    ///
    /// Both snake_case (`fetch_all`) and camelCase (`fetchAll`) spellings of
    /// the standard operations are recognised; anything else is custom.
    pub fn parse(name: &str) -> Self {
        match name {
            "fetch" => Operation::Fetch,
            "fetch_one" | "fetchOne" => Operation::FetchOne,
            "fetch_all" | "fetchAll" => Operation::FetchAll,
            "persist" => Operation::Persist,
            "update" => Operation::Update,
            "delete" => Operation::Delete,
            "purge" => Operation::Purge,
            other => Operation::Custom(other.to_string()),
        }
    }

    /// Returns the bit of this operation, or `None` for custom operations.
    pub fn bit(&self) -> Option<OperationSet> {
        let bit = match self {
            Operation::Fetch => OperationSet::FETCH,
            Operation::FetchOne => OperationSet::FETCH_ONE,
            Operation::FetchAll => OperationSet::FETCH_ALL,
            Operation::Persist => OperationSet::PERSIST,
            Operation::Update => OperationSet::UPDATE,
            Operation::Delete => OperationSet::DELETE,
            Operation::Purge => OperationSet::PURGE,
            Operation::Custom(_) => return None,
        };
        Some(bit)
    }

    /// Returns true for the standard operations.
    pub fn is_standard(&self) -> bool {
        !matches!(self, Operation::Custom(_))
    }

    /// Returns true for reading operations.
    pub fn is_read(&self) -> bool {
        matches!(
            self,
            Operation::Fetch | Operation::FetchOne | Operation::FetchAll
        )
    }

    /// Returns true for writing operations.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Operation::Persist | Operation::Update | Operation::Delete | Operation::Purge
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl From<&str> for Operation {
    fn from(name: &str) -> Self {
        Operation::parse(name)
    }
}

impl From<String> for Operation {
    fn from(name: String) -> Self {
        Operation::parse(&name)
    }
}

impl From<Operation> for String {
    fn from(operation: Operation) -> Self {
        match operation {
            Operation::Custom(name) => name,
            standard => standard.name().to_string(),
        }
    }
}

/// A bitmask over the standard operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationSet(u8);

impl OperationSet {
    /// No operation.
    pub const NONE: Self = Self(0);
    /// `fetch`
    pub const FETCH: Self = Self(1);
    /// `fetch_one`
    pub const FETCH_ONE: Self = Self(1 << 1);
    /// `fetch_all`
    pub const FETCH_ALL: Self = Self(1 << 2);
    /// `persist`
    pub const PERSIST: Self = Self(1 << 3);
    /// `update`
    pub const UPDATE: Self = Self(1 << 4);
    /// `delete`
    pub const DELETE: Self = Self(1 << 5);
    /// `purge`
    pub const PURGE: Self = Self(1 << 6);
    /// Every reading operation.
    pub const READ: Self = Self(Self::FETCH.0 | Self::FETCH_ONE.0 | Self::FETCH_ALL.0);
    /// Every writing operation.
    pub const WRITE: Self = Self(Self::PERSIST.0 | Self::UPDATE.0 | Self::DELETE.0 | Self::PURGE.0);
    /// Every standard operation.
    pub const ALL: Self = Self(Self::READ.0 | Self::WRITE.0);

    /// Builds a set from raw bits, dropping unknown ones.
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// Returns the raw bits.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns true if every operation of `other` is in this set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true if the sets share at least one operation.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Returns true if the set is empty.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Adds operations.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Removes operations.
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Returns true if `operation` is a standard operation in this set.
    pub fn allows(self, operation: &Operation) -> bool {
        operation.bit().is_some_and(|bit| self.contains(bit))
    }

    /// Iterates over the standard operations in this set.
    pub fn iter(self) -> impl Iterator<Item = Operation> {
        Operation::STANDARD
            .into_iter()
            .filter(move |operation| self.allows(operation))
    }
}

impl BitOr for OperationSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for OperationSet {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for OperationSet {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl FromIterator<Operation> for OperationSet {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        iter.into_iter()
            .filter_map(|operation| operation.bit())
            .fold(Self::NONE, |set, bit| set | bit)
    }
}

/// Borrowed arguments of a gateway call.
///
/// The orchestrator never looks inside: it hands them to capability checks
/// and failure sinks as they were received.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum OperationArgs<'a> {
    /// No arguments.
    None,
    /// A result set descriptor (`fetch`, `fetch_all`, `purge`).
    Descriptor(&'a ResultSetDescriptor),
    /// An entity key (`fetch_one`).
    Key(&'a EntityKey),
    /// Entities (`persist`, `delete`).
    Entities(&'a [Entity]),
    /// A descriptor and the field values to apply (`update`).
    Update {
        /// Entities to update.
        descriptor: &'a ResultSetDescriptor,
        /// Field values to set.
        data: &'a Map<String, Value>,
    },
    /// Free-form arguments of a custom operation.
    Value(&'a Value),
}

impl OperationArgs<'_> {
    /// Returns a JSON snapshot of the arguments.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
