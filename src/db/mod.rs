//! Database access layer.
//!
//! This module provides SQL Server access functionality:
//! - Per-call connection opening (no pooling)
//! - Statement prefix classification
//! - Statement execution and result normalization
//! - Column value rendering

pub mod classify;
pub mod connection;
pub mod executor;
pub mod values;

pub use classify::{classify, Classified, StatementClass};
pub use connection::ConnectionDescriptor;
pub use executor::{
    quote_ident, ResultSet, StatementExecutor, EXEC_STATUS, NO_RESULTS, RESOURCE_ROW_CAP,
};
