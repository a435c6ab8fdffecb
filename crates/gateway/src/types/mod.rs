//! Core types for the gateway layer.
//!
//! This module contains the value types that cross the adapter seam:
//!
//! - [`Entity`] / [`EntityKey`] - Schemaless entities addressed by collection and id
//! - [`ResultSetDescriptor`] - What to read: filters, sorting, pagination
//! - [`ResultSet`] / [`Projection`] - What a read returns
//! - [`WriteOptions`] - Per-call configuration handed to adapters before writes

mod descriptor;
mod entity;
mod options;
mod result_set;

pub use descriptor::{
    DEFAULT_PAGE_SIZE, Filter, FilterOperator, ResultSetDescriptor, SortDirection, SortKey,
};
pub use entity::{DEFAULT_COLLECTION, Entity, EntityKey};
pub use options::WriteOptions;
pub use result_set::{PageInfo, Projection, ResultSet};
