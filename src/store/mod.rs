//! Persistence port for flows, runs and run nodes.
//!
//! The orchestrator only talks to [`Store`], which hands out
//! [`DbCollection`]s registered by a backend ([`DbStore::init`]).
//! [`MemStore`] is the in-process backend.

pub mod data;
mod db;
pub mod query;
mod store;

use std::error::Error;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter};

use crate::{ForgeError, Result};

use query::*;

pub use db::MemStore;
pub use store::Store;

/// Maps backend errors to ForgeError.
pub(crate) fn map_db_err(err: impl Error) -> ForgeError {
    ForgeError::Store(err.to_string())
}

/// Identifiers for the storage collections.
#[derive(Debug, Clone, AsRefStr, PartialEq, Hash, Eq, EnumIter)]
pub enum StoreIden {
    /// Deployed flow definitions.
    #[strum(serialize = "flows")]
    Flows,
    /// Flow runs.
    #[strum(serialize = "runs")]
    Runs,
    /// Per-node run records.
    #[strum(serialize = "run_nodes")]
    RunNodes,
}

/// Paginated query result.
#[derive(Debug, Deserialize, Serialize)]
pub struct PageData<T> {
    /// Total number of matching records.
    pub count: usize,
    /// Current page number (1-based).
    pub page_num: usize,
    /// Total number of pages.
    pub page_count: usize,
    /// Number of records per page.
    pub page_size: usize,
    /// Records in the current page.
    pub rows: Vec<T>,
}

/// Trait for types that can identify their storage collection.
pub trait DbCollectionIden {
    fn iden() -> StoreIden;
}

/// Trait for database collection operations.
pub trait DbCollection: Send + Sync {
    /// The type of items stored in this collection.
    type Item;

    /// Checks if a record with the given ID exists.
    fn exists(
        &self,
        id: &str,
    ) -> Result<bool>;

    /// Finds a record by ID.
    fn find(
        &self,
        id: &str,
    ) -> Result<Self::Item>;

    /// Queries records with pagination and filtering.
    fn query(
        &self,
        query: &Query,
    ) -> Result<PageData<Self::Item>>;

    /// Creates a new record; fails if the id is taken.
    fn create(
        &self,
        data: &Self::Item,
    ) -> Result<bool>;

    /// Creates every record or none of them.
    fn create_many(
        &self,
        data: &[Self::Item],
    ) -> Result<usize>;

    /// Updates an existing record.
    fn update(
        &self,
        data: &Self::Item,
    ) -> Result<bool>;

    /// Deletes a record by ID.
    fn delete(
        &self,
        id: &str,
    ) -> Result<bool>;
}

/// Trait for database store initialization.
pub trait DbStore {
    /// Registers the backend's collections with the store.
    fn init(
        &self,
        s: &Store,
    ) -> Result<()>;
}
