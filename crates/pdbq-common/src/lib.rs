//! PDBQ Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, error taxonomy, and logging setup for the PDBQ workspace.
//!
//! # Overview
//!
//! - **Error Handling**: the classified [`PdbqError`] surface every
//!   operation resolves to
//! - **Types**: the structure/search/similarity domain model
//! - **Logging**: tracing initialization shared by all binaries
//!
//! # Example
//!
//! ```no_run
//! use pdbq_common::types::StructureId;
//!
//! fn canonical(raw: &str) -> pdbq_common::Result<String> {
//!     let id = StructureId::parse(raw)?;
//!     Ok(id.to_string())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{PdbqError, Result};
