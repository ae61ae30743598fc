//! Core integrity validation types.
//!
//! ## Overview
//!
//! - **[`IntegrityValidator`]**: checks a store against every foreign key of a schema
//! - **[`ValidationMode`]**: what to do with violations (Strict, Repair, Permissive)
//! - **[`Violation`]**: one row whose reference resolves to nothing
//! - **[`ValidationReport`]**: first-pass violations plus what the call did to the store
//!
//! ## Passes
//!
//! ```text
//! pass 0   sweep all edges ──► record violations, schedule rows (Repair)
//!          delete scheduled rows
//! pass 1   sweep all edges ──► schedule rows orphaned by pass 0
//!          ...
//! pass N   sweep all edges ──► nothing scheduled: fixed point
//! ```

pub mod mode;
pub mod report;
pub mod validator;
pub mod violation;

pub use mode::ValidationMode;
pub use report::{ValidationOutcome, ValidationReport};
pub use validator::IntegrityValidator;
pub use violation::Violation;
