//! Rule-driven attribute validation.
//!
//! # Responsibility
//! - Describe validation rules (`Rule`) and their parameters.
//! - Evaluate one rule per short-lived `ValidationSession`.
//!
//! # Invariants
//! - Sessions are never shared between validation calls.

pub mod patterns;
pub mod rule;
pub mod session;
