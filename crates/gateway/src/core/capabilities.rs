//! Backend capability declarations.
//!
//! A backend answers "can you perform operation X with these arguments?"
//! through its [`Capabilities`]. The answer combines three checks, in order:
//!
//! 1. Does the backend implement the operation at all? If not, no.
//! 2. Is there a predicate registered for the operation? If so, it decides.
//! 3. Otherwise, standard operations must be in the allowed set; custom
//!    operations are allowed as soon as they are implemented.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use super::operation::{Operation, OperationArgs, OperationSet};

/// A per-operation capability predicate.
pub type CapabilityPredicate = Arc<dyn Fn(&OperationArgs<'_>) -> bool + Send + Sync>;

/// What a backend implements and what it accepts to perform.
///
/// # Examples
///
/// ```
/// use helios_gateway::core::{Capabilities, Operation, OperationArgs, OperationSet};
/// use helios_gateway::types::ResultSetDescriptor;
///
/// // A search index that only serves the "articles" collection.
/// let caps = Capabilities::new(OperationSet::FETCH_ALL | OperationSet::PERSIST)
///     .with_predicate(Operation::FetchAll, |args| match args {
///         OperationArgs::Descriptor(d) => d.collection() == "articles",
///         _ => false,
///     });
///
/// let articles = ResultSetDescriptor::new("articles");
/// let users = ResultSetDescriptor::new("users");
/// assert!(caps.allows(&Operation::FetchAll, &OperationArgs::Descriptor(&articles)));
/// assert!(!caps.allows(&Operation::FetchAll, &OperationArgs::Descriptor(&users)));
/// assert!(!caps.allows(&Operation::Purge, &OperationArgs::Descriptor(&articles)));
/// ```
#[derive(Clone)]
pub struct Capabilities {
    implemented: OperationSet,
    allowed: OperationSet,
    custom: HashSet<String>,
    predicates: HashMap<Operation, CapabilityPredicate>,
}

impl Capabilities {
    /// Declares the implemented standard operations, all of them allowed.
    pub fn new(implemented: OperationSet) -> Self {
        Self {
            implemented,
            allowed: OperationSet::ALL,
            custom: HashSet::new(),
            predicates: HashMap::new(),
        }
    }

    /// Declares every standard operation as implemented and allowed.
    pub fn all() -> Self {
        Self::new(OperationSet::ALL)
    }

    /// Declares the reading operations only.
    pub fn read_only() -> Self {
        Self::new(OperationSet::READ)
    }

    /// Restricts the allowed standard operations.
    pub fn with_allowed(mut self, allowed: OperationSet) -> Self {
        self.allowed = allowed;
        self
    }

    /// Declares an implemented custom operation.
    pub fn with_custom_operation(mut self, name: impl Into<String>) -> Self {
        self.custom.insert(name.into());
        self
    }

    /// Registers a predicate that decides eligibility for an operation.
    pub fn with_predicate<F>(mut self, operation: Operation, predicate: F) -> Self
    where
        F: Fn(&OperationArgs<'_>) -> bool + Send + Sync + 'static,
    {
        self.predicates.insert(operation, Arc::new(predicate));
        self
    }

    /// Changes the allowed standard operations in place.
    pub fn set_allowed(&mut self, allowed: OperationSet) {
        self.allowed = allowed;
    }

    /// Returns the implemented standard operations.
    pub fn implemented(&self) -> OperationSet {
        self.implemented
    }

    /// Returns the allowed standard operations.
    pub fn allowed(&self) -> OperationSet {
        self.allowed
    }

    /// Returns true if the operation is implemented.
    pub fn implements(&self, operation: &Operation) -> bool {
        match operation {
            Operation::Custom(name) => self.custom.contains(name),
            standard => self.implemented.allows(standard),
        }
    }

    /// Returns true if a predicate is registered for the operation.
    pub fn has_predicate(&self, operation: &Operation) -> bool {
        self.predicates.contains_key(operation)
    }

    /// Answers the capability question for an operation and its arguments.
    pub fn allows(&self, operation: &Operation, args: &OperationArgs<'_>) -> bool {
        if !self.implements(operation) {
            return false;
        }

        if let Some(predicate) = self.predicates.get(operation) {
            return predicate(args);
        }

        match operation {
            Operation::Custom(_) => true,
            standard => self.allowed.allows(standard),
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut predicates: Vec<_> = self.predicates.keys().map(Operation::name).collect();
        predicates.sort_unstable();
        f.debug_struct("Capabilities")
            .field("implemented", &self.implemented)
            .field("allowed", &self.allowed)
            .field("custom", &self.custom)
            .field("predicates", &predicates)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_behaviour() {
        let caps = Capabilities::all();
        assert!(caps.allows(&Operation::Fetch, &OperationArgs::None));

        // restricting allowed operations is honoured
        let caps = caps.with_allowed(OperationSet::FETCH_ONE);
        assert!(!caps.allows(&Operation::Fetch, &OperationArgs::None));
        assert!(caps.allows(&Operation::FetchOne, &OperationArgs::None));
    }

    #[test]
    fn test_custom_operations_allowed_if_implemented() {
        let caps = Capabilities::all().with_custom_operation("reindex");
        assert!(caps.allows(&Operation::parse("reindex"), &OperationArgs::None));
        assert!(!caps.allows(&Operation::parse("non-existent"), &OperationArgs::None));
    }

    #[test]
    fn test_predicate_is_authoritative() {
        let caps = Capabilities::all()
            .with_allowed(OperationSet::NONE)
            .with_custom_operation("fetch_something")
            .with_predicate(Operation::parse("fetch_something"), |_| true)
            .with_predicate(Operation::Fetch, |_| true)
            .with_predicate(Operation::Persist, |_| false);

        assert!(caps.allows(&Operation::parse("fetch_something"), &OperationArgs::None));
        // predicate overrides the allow-list in both directions
        assert!(caps.allows(&Operation::Fetch, &OperationArgs::None));
        assert!(!caps.allows(&Operation::Persist, &OperationArgs::None));
    }

    #[test]
    fn test_predicate_ignored_when_not_implemented() {
        let caps = Capabilities::read_only()
            .with_predicate(Operation::Purge, |_| true)
            .with_predicate(Operation::parse("fetch_something_missing"), |_| true);

        assert!(caps.has_predicate(&Operation::Purge));
        assert!(!caps.allows(&Operation::Purge, &OperationArgs::None));
        assert!(!caps.allows(
            &Operation::parse("fetch_something_missing"),
            &OperationArgs::None
        ));
    }
}
