//! Record and form model layer.
//!
//! # Responsibility
//! - Define the attribute/value model, the error log and query criteria.
//! - Provide the `Model`, `ActiveRecord` and `FormModel` contracts that
//!   concrete record types implement.
//!
//! # Invariants
//! - Attribute names accepted by the setter path are the type's declared
//!   `ATTRIBUTES`; everything else is ignored.
//! - Persistence payloads never carry `Null` values.
//!
//! # See also
//! - crate::validation for rule evaluation.
//! - crate::repo for storage backends.

pub mod attributes;
pub mod base;
pub mod criteria;
pub mod errors;
pub mod form;
pub mod record;
pub mod template;
pub mod value;

pub use base::{Lifecycle, Model, ModelError, ModelResult, ModelState, Scenario};
