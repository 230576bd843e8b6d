#![deny(missing_docs)]

//! Small helpers shared by every LDN crate.

/// Logging macros.
pub mod logging;

/// Redaction of secrets in logs.
pub mod hidden;
pub use hidden::*;

/// Fixed size, zero padded byte fields.
pub mod fixed;
pub use fixed::*;
