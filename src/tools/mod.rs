//! Tool operation implementations.
//!
//! This module contains the operation dispatcher and the per-tool handlers:
//! - `query`: read and write statement execution
//! - `table`: table listing, schema, creation, size
//! - `view`, `procedure`, `function`, `index`: object lifecycle management
//! - `index_analysis`: index health diagnostics
//! - `schema`: schema and object catalogs
//! - `performance`: server performance diagnostics
//! - `dispatch`: the static (tool, action) operation table

pub mod dispatch;
pub mod function;
pub mod index;
pub mod index_analysis;
pub mod performance;
pub mod procedure;
pub mod query;
pub mod schema;
pub mod table;
pub mod view;

pub use dispatch::{Dispatcher, OperationRequest};

/// Cell accessor for rendered result rows, with NULL as empty text.
pub(crate) fn cell<'a>(row: &'a [Option<String>], idx: usize) -> &'a str {
    row.get(idx).and_then(|v| v.as_deref()).unwrap_or("")
}
