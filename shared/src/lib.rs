//! Shared types and models for the Lehem ERP backend
//!
//! This crate contains the domain types used across the system:
//! closed enums for statuses and state machines, entity models,
//! prefixed-code generation, and monetary rounding.

pub mod codes;
pub mod models;
pub mod money;
pub mod types;
pub mod validation;

pub use codes::*;
pub use models::*;
pub use money::*;
pub use types::*;
pub use validation::*;
