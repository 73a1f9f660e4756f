//! Tenement Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging, and error handling for the tenement workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`CommonError`] and the [`Result`] alias
//! - **Types**: [`Jurisdiction`] and [`SourceFormat`], the vocabulary every
//!   ingestion component keys on
//! - **Logging**: tracing subscriber setup driven by `LOG_*` variables
//!
//! # Example
//!
//! ```no_run
//! use tenement_common::{Jurisdiction, Result};
//!
//! fn parse(code: &str) -> Result<Jurisdiction> {
//!     code.parse()
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{CommonError, Result};
pub use types::{Jurisdiction, SourceFormat};
