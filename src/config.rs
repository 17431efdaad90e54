//! Configuration handling for the MSSQL MCP Server.
//!
//! This module provides configuration management via CLI arguments and environment variables.
//! The environment variable surface follows the common `MSSQL_*` convention so the server
//! drops into existing deployments without changes.

use clap::{Parser, ValueEnum};

use crate::db::ConnectionDescriptor;

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_MCP_ENDPOINT: &str = "/";
pub const DEFAULT_MSSQL_PORT: u16 = 1433;
pub const DEFAULT_APP_NAME: &str = "mssql-mcp-server";

/// Transport mode for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// Standard input/output (for CLI integration)
    #[default]
    Stdio,
    /// Streamable HTTP (for web clients)
    Http,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Configuration for the MSSQL MCP Server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mssql-mcp-server",
    about = "MCP server for Microsoft SQL Server administration",
    version,
    author
)]
pub struct Config {
    /// SQL Server hostname or IP address
    #[arg(long = "host", value_name = "HOST", env = "MSSQL_HOST")]
    pub host: Option<String>,

    /// SQL Server TCP port
    #[arg(long, default_value_t = DEFAULT_MSSQL_PORT, env = "MSSQL_PORT")]
    pub port: u16,

    /// Database to connect to
    #[arg(long, value_name = "NAME", env = "MSSQL_DATABASE")]
    pub database: Option<String>,

    /// SQL login user (ignored when --trusted-connection is set)
    #[arg(long, env = "MSSQL_USER")]
    pub user: Option<String>,

    /// SQL login password (sensitive - never logged)
    #[arg(long, env = "MSSQL_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Use Windows integrated authentication instead of a SQL login
    #[arg(long, env = "MSSQL_TRUSTED_CONNECTION")]
    pub trusted_connection: bool,

    /// Accept the server certificate without validation (self-signed setups)
    #[arg(long, env = "MSSQL_TRUST_CERT")]
    pub trust_cert: bool,

    /// Application name reported to the server
    #[arg(long, default_value = DEFAULT_APP_NAME, env = "MSSQL_APP_NAME")]
    pub app_name: String,

    /// Transport mode (stdio or http)
    #[arg(
        short,
        long,
        value_enum,
        default_value = "stdio",
        env = "MCP_TRANSPORT"
    )]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_HTTP_HOST,
        env = "MCP_HTTP_HOST"
    )]
    pub http_host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(
        long,
        default_value_t = DEFAULT_HTTP_PORT,
        env = "MCP_HTTP_PORT"
    )]
    pub http_port: u16,

    /// MCP endpoint path (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_MCP_ENDPOINT,
        env = "MCP_ENDPOINT"
    )]
    pub mcp_endpoint: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,

    /// Enable logging output (disabled by default to avoid interfering with stdio transport)
    #[arg(long, env = "MCP_ENABLE_LOGS")]
    pub enable_logs: bool,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            host: None,
            port: DEFAULT_MSSQL_PORT,
            database: None,
            user: None,
            password: None,
            trusted_connection: false,
            trust_cert: false,
            app_name: DEFAULT_APP_NAME.to_string(),
            transport: TransportMode::Stdio,
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            mcp_endpoint: DEFAULT_MCP_ENDPOINT.to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            enable_logs: false,
        }
    }

    /// Build the connection descriptor from this configuration.
    ///
    /// Host and database are mandatory; anything else falls back to a
    /// sensible default. Returns an error message suitable for stderr when
    /// the mandatory pieces are missing.
    pub fn connection_descriptor(&self) -> Result<ConnectionDescriptor, String> {
        let host = self
            .host
            .clone()
            .ok_or("MSSQL_HOST and MSSQL_DATABASE must be set")?;
        let database = self
            .database
            .clone()
            .ok_or("MSSQL_HOST and MSSQL_DATABASE must be set")?;

        Ok(ConnectionDescriptor {
            host,
            port: self.port,
            database,
            user: self.user.clone(),
            password: self.password.clone(),
            trusted_connection: self.trusted_connection,
            trust_cert: self.trust_cert,
            app_name: self.app_name.clone(),
        })
    }

    /// Get the HTTP bind address.
    pub fn http_bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
