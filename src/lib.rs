//! MSSQL MCP Server Library
//!
//! This library provides MCP (Model Context Protocol) tools for AI assistants
//! to administer a Microsoft SQL Server database.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::DbError;
pub use mcp::DbService;
