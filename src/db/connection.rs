//! Per-call connection opening.
//!
//! Every tool call opens a fresh TDS connection, uses it, and drops it when
//! the call returns. There is no pool and no retry; a failed handshake maps
//! straight to a connection error the caller sees.

use tiberius::{AuthMethod, Client, Config};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

use crate::error::{DbError, DbResult};

/// A live client for the duration of one call.
pub type DbClient = Client<Compat<TcpStream>>;

/// Everything needed to open a connection, built once at startup.
#[derive(Debug, Clone)]
pub struct ConnectionDescriptor {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub trusted_connection: bool,
    pub trust_cert: bool,
    pub app_name: String,
}

impl ConnectionDescriptor {
    /// Redacted display form for logs. Never includes the password.
    pub fn redacted(&self) -> String {
        let auth = if self.trusted_connection {
            "trusted".to_string()
        } else {
            self.user.clone().unwrap_or_else(|| "<none>".to_string())
        };
        format!(
            "{}:{}/{} (auth: {})",
            self.host, self.port, self.database, auth
        )
    }

    fn tds_config(&self) -> DbResult<Config> {
        let mut config = Config::new();
        config.host(&self.host);
        config.port(self.port);
        config.database(&self.database);
        config.application_name(&self.app_name);

        if self.trusted_connection {
            // Integrated auth needs platform SSPI/GSSAPI support this build
            // does not carry.
            return Err(DbError::connection(
                "Integrated authentication is not supported by this build",
                "Provide MSSQL_USER and MSSQL_PASSWORD for SQL login authentication",
            ));
        }

        match (&self.user, &self.password) {
            (Some(user), Some(password)) => {
                config.authentication(AuthMethod::sql_server(user, password));
            }
            _ => {
                return Err(DbError::connection(
                    "No credentials configured",
                    "Set MSSQL_USER and MSSQL_PASSWORD",
                ));
            }
        }

        if self.trust_cert {
            config.trust_cert();
        }

        Ok(config)
    }

    /// Open a fresh connection: TCP connect, then TDS handshake and login.
    pub async fn open(&self) -> DbResult<DbClient> {
        let config = self.tds_config()?;

        debug!(target = %self.redacted(), "opening connection");

        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| {
                DbError::connection(
                    format!("TCP connect to {}:{} failed: {}", self.host, self.port, e),
                    "Check that SQL Server is reachable and the port is correct",
                )
            })?;
        tcp.set_nodelay(true)?;

        let client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| {
                DbError::connection(
                    e.to_string(),
                    "Check credentials, database name, and TLS settings",
                )
            })?;

        debug!(target = %self.redacted(), "connection established");
        Ok(client)
    }
}
