//! Storage contracts and persistence implementations.
//!
//! # Responsibility
//! - Define the table-level `Storage` contract records persist through.
//! - Isolate SQLite statement details from record orchestration.
//!
//! # Invariants
//! - Storage APIs report transport failures as `StorageError`, and
//!   "nothing written" as `Ok(false)`.

pub mod sqlite_storage;
pub mod storage;
