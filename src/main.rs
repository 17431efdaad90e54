//! MSSQL MCP Server - Main entry point.
//!
//! This server provides MCP (Model Context Protocol) tools for AI assistants
//! to administer a Microsoft SQL Server database.

use clap::Parser;
use mssql_mcp_server::config::{Config, TransportMode};
use mssql_mcp_server::mcp::DbService;
use mssql_mcp_server::transport::{HttpTransport, StdioTransport, Transport};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logging is off unless requested: the stdio transport shares stdout with
/// the protocol stream, and stray log lines there corrupt it.
fn init_tracing(config: &Config) {
    if !config.enable_logs {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    init_tracing(&config);

    let descriptor = match config.connection_descriptor() {
        Ok(descriptor) => descriptor,
        Err(message) => {
            eprintln!("Error: {}", message);
            eprintln!();
            eprintln!("Usage: mssql-mcp-server --host <HOST> --database <NAME> [options]");
            eprintln!();
            eprintln!("Environment variables:");
            eprintln!("  MSSQL_HOST, MSSQL_PORT, MSSQL_DATABASE");
            eprintln!("  MSSQL_USER, MSSQL_PASSWORD");
            eprintln!("  MSSQL_TRUSTED_CONNECTION, MSSQL_TRUST_CERT, MSSQL_APP_NAME");
            std::process::exit(1);
        }
    };

    info!(
        transport = %config.transport,
        target = %descriptor.redacted(),
        "Starting MSSQL MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let service = DbService::new(descriptor);

    let result = match config.transport {
        TransportMode::Stdio => {
            let transport = StdioTransport::new(service);
            transport.run().await
        }
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            let transport = HttpTransport::new(
                service,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            );
            transport.run().await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
