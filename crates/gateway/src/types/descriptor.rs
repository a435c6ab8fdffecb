//! Result set descriptors.
//!
//! A [`ResultSetDescriptor`] tells a backend which entities to read (or to
//! update/purge): the target collection, a conjunction of filters, sort keys
//! and pagination. Backends translate it into their own query language.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Page size used when paginating without an explicit size.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Comparison operator of a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FilterOperator {
    /// `=`
    #[default]
    #[serde(rename = "=")]
    Equals,
    /// `!=`
    #[serde(rename = "!=")]
    NotEquals,
    /// `<`
    #[serde(rename = "<")]
    LowerThan,
    /// `<=`
    #[serde(rename = "<=")]
    LowerOrEqual,
    /// `>`
    #[serde(rename = ">")]
    GreaterThan,
    /// `>=`
    #[serde(rename = ">=")]
    GreaterOrEqual,
    /// SQL-style pattern match (`%` and `_` wildcards).
    #[serde(rename = "LIKE")]
    Like,
    /// Membership in a JSON array value.
    #[serde(rename = "IN")]
    In,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            FilterOperator::Equals => "=",
            FilterOperator::NotEquals => "!=",
            FilterOperator::LowerThan => "<",
            FilterOperator::LowerOrEqual => "<=",
            FilterOperator::GreaterThan => ">",
            FilterOperator::GreaterOrEqual => ">=",
            FilterOperator::Like => "LIKE",
            FilterOperator::In => "IN",
        };
        write!(f, "{}", symbol)
    }
}

/// A single property filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Property the filter applies to.
    pub property: String,
    /// Value to compare against.
    pub value: Value,
    /// Comparison operator.
    #[serde(default)]
    pub operator: FilterOperator,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

/// A sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    /// Property to sort on.
    pub property: String,
    /// Direction.
    #[serde(default)]
    pub direction: SortDirection,
}

/// Describes a set of entities.
///
/// # Examples
///
/// ```
/// use helios_gateway::types::{FilterOperator, ResultSetDescriptor, SortDirection};
/// use serde_json::json;
///
/// let descriptor = ResultSetDescriptor::new("users")
///     .filter("active", json!(true))
///     .filter_with("age", json!(18), FilterOperator::GreaterOrEqual)
///     .sort("name", SortDirection::Asc)
///     .paginate(2, 50);
///
/// assert_eq!(descriptor.filters().len(), 2);
/// assert_eq!(descriptor.offset(), Some(50));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSetDescriptor {
    collection: String,
    #[serde(default)]
    filters: Vec<Filter>,
    #[serde(default)]
    sort: Vec<SortKey>,
    /// 1-based page number; 0 disables pagination.
    #[serde(default)]
    page: u32,
    #[serde(default = "default_page_size")]
    page_size: u32,
    /// Hard cap on the number of returned entities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl ResultSetDescriptor {
    /// Creates a descriptor matching every entity of a collection.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
            sort: Vec::new(),
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
            limit: None,
        }
    }

    /// Adds an equality filter.
    pub fn filter(self, property: impl Into<String>, value: Value) -> Self {
        self.filter_with(property, value, FilterOperator::Equals)
    }

    /// Adds a filter with an explicit operator.
    pub fn filter_with(
        mut self,
        property: impl Into<String>,
        value: Value,
        operator: FilterOperator,
    ) -> Self {
        self.filters.push(Filter {
            property: property.into(),
            value,
            operator,
        });
        self
    }

    /// Adds a sort key.
    pub fn sort(mut self, property: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.push(SortKey {
            property: property.into(),
            direction,
        });
        self
    }

    /// Enables pagination. Page numbers start at 1.
    pub fn paginate(mut self, page: u32, page_size: u32) -> Self {
        self.page = page.max(1);
        self.page_size = page_size.max(1);
        self
    }

    /// Caps the number of returned entities.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Retargets the descriptor to another collection.
    pub fn collection_name(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Returns the target collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Returns the filters.
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Returns the sort keys.
    pub fn sort_keys(&self) -> &[SortKey] {
        &self.sort
    }

    /// Returns the 1-based page, or `None` when not paginated.
    pub fn page(&self) -> Option<u32> {
        (self.page > 0).then_some(self.page)
    }

    /// Returns the page size.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Returns the hard limit, if any.
    pub fn max_results(&self) -> Option<u32> {
        self.limit
    }

    /// Returns the offset of the first entity of the requested page.
    pub fn offset(&self) -> Option<u64> {
        self.page()
            .map(|page| u64::from(page - 1) * u64::from(self.page_size))
    }
}
