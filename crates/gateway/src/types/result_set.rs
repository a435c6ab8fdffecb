//! Read results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::entity::Entity;

/// Pagination details of a paginated read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// 1-based page number.
    pub page: u32,
    /// Requested page size.
    pub page_size: u32,
    /// Total number of matching entities across all pages.
    pub total: u64,
}

impl PageInfo {
    /// Returns the number of pages needed to cover `total`.
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.page_size))
    }

    /// Returns true if a page follows this one.
    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }
}

/// A set of entities returned by `fetch_all`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    entities: Vec<Entity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    page: Option<PageInfo>,
}

impl ResultSet {
    /// Creates an unpaginated result set.
    pub fn new(entities: Vec<Entity>) -> Self {
        Self {
            entities,
            page: None,
        }
    }

    /// Creates a paginated result set.
    pub fn paginated(entities: Vec<Entity>, page: PageInfo) -> Self {
        Self {
            entities,
            page: Some(page),
        }
    }

    /// Returns the entities.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Returns pagination details, if paginated.
    pub fn page_info(&self) -> Option<&PageInfo> {
        self.page.as_ref()
    }

    /// Returns the number of entities in this set.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterates over the entities.
    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.entities.iter()
    }
}

impl IntoIterator for ResultSet {
    type Item = Entity;
    type IntoIter = std::vec::IntoIter<Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.into_iter()
    }
}

/// Raw rows returned by `fetch`.
///
/// Unlike a [`ResultSet`], a projection is not hydrated into entities; it is
/// the shape the backend produced (selected columns, aggregates, search hits).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    rows: Vec<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    page: Option<PageInfo>,
}

impl Projection {
    /// Creates an unpaginated projection.
    pub fn new(rows: Vec<Map<String, Value>>) -> Self {
        Self { rows, page: None }
    }

    /// Creates a paginated projection.
    pub fn paginated(rows: Vec<Map<String, Value>>, page: PageInfo) -> Self {
        Self {
            rows,
            page: Some(page),
        }
    }

    /// Returns the rows.
    pub fn rows(&self) -> &[Map<String, Value>] {
        &self.rows
    }

    /// Returns pagination details, if paginated.
    pub fn page_info(&self) -> Option<&PageInfo> {
        self.page.as_ref()
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
