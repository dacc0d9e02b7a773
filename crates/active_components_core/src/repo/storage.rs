//! Storage backend contract used by active records.
//!
//! # Responsibility
//! - Define the minimal table-level operations records persist through.
//! - Carry backend failures as semantic errors.
//!
//! # Invariants
//! - `insert`/`update` report "nothing written" as `Ok(false)`, transport
//!   failures as `Err`.
//! - `update` receives the full non-null payload plus the persisted snapshot
//!   and is responsible for diffing.

use crate::db::DbError;
use crate::model::criteria::Criteria;
use crate::model::value::{AttributeMap, AttributeValue};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug)]
pub enum StorageError {
    Db(DbError),
    InvalidData(String),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid storage data: {message}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Table-level persistence operations.
pub trait Storage {
    /// Inserts one row built from `attributes`.
    fn insert(&self, table: &str, attributes: &AttributeMap) -> StorageResult<bool>;

    /// Updates the row matching `snapshot` with what changed in `attributes`.
    fn update(
        &self,
        table: &str,
        attributes: &AttributeMap,
        snapshot: &AttributeMap,
    ) -> StorageResult<bool>;

    /// Returns rows matching `criteria`.
    fn select(&self, table: &str, criteria: &Criteria) -> StorageResult<Vec<AttributeMap>>;

    /// Returns the key generated by the most recent insert.
    fn last_insert_id(&self) -> StorageResult<AttributeValue>;
}
