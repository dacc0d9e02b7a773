//! Application-level services shared across models.
//!
//! # Responsibility
//! - Provide the dependency container used to wire storage backends and
//!   other collaborators.

pub mod container;
