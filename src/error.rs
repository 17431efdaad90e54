//! Error types for the MSSQL MCP Server.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Each variant carries enough context for AI assistants to understand what went
//! wrong and which parameter or statement caused it.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Unknown action '{action}' for tool '{tool}'")]
    UnknownOperation { tool: String, action: String },

    #[error("Missing required parameter: {parameter}")]
    MissingParameter { parameter: String },

    #[error("Statement class {class} is not allowed for {operation}: {reason}")]
    OperationNotAllowed {
        operation: String,
        class: String,
        reason: String,
    },

    #[error("Statement could not be classified (leading tokens: '{tokens}')")]
    UnclassifiedStatement { tokens: String },

    #[error("Execution failed: {message}")]
    Execution { message: String, suggestion: String },

    #[error("Resource not found: {uri}")]
    ResourceNotFound { uri: String },
}

impl DbError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create an unknown operation error for a (tool, action) pair.
    pub fn unknown_operation(tool: impl Into<String>, action: impl Into<String>) -> Self {
        Self::UnknownOperation {
            tool: tool.into(),
            action: action.into(),
        }
    }

    /// Create a missing parameter error.
    pub fn missing_parameter(parameter: impl Into<String>) -> Self {
        Self::MissingParameter {
            parameter: parameter.into(),
        }
    }

    /// Create an operation-not-allowed error for a rejected statement class.
    pub fn not_allowed(
        operation: impl Into<String>,
        class: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::OperationNotAllowed {
            operation: operation.into(),
            class: class.into(),
            reason: reason.into(),
        }
    }

    /// Create an unclassified statement error from the leading tokens.
    pub fn unclassified(tokens: impl Into<String>) -> Self {
        Self::UnclassifiedStatement {
            tokens: tokens.into(),
        }
    }

    /// Create an execution error with a helpful suggestion.
    pub fn execution(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a resource not found error.
    pub fn resource_not_found(uri: impl Into<String>) -> Self {
        Self::ResourceNotFound { uri: uri.into() }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Execution { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

/// Convert tiberius errors to DbError.
impl From<tiberius::error::Error> for DbError {
    fn from(err: tiberius::error::Error) -> Self {
        match &err {
            tiberius::error::Error::Io { .. } => DbError::connection(
                err.to_string(),
                "Check network connectivity and SQL Server status",
            ),
            tiberius::error::Error::Tls(_) => DbError::connection(
                err.to_string(),
                "Verify TLS configuration; MSSQL_TRUST_CERT=true accepts self-signed certificates",
            ),
            tiberius::error::Error::Routing { .. } => DbError::connection(
                err.to_string(),
                "The server redirected the connection; check host and port",
            ),
            tiberius::error::Error::Server(token) => DbError::execution(
                format!("{} (code {})", token.message(), token.code()),
                "Check the SQL syntax and referenced objects",
            ),
            _ => DbError::execution(err.to_string(), "Check the statement and try again"),
        }
    }
}

impl From<std::io::Error> for DbError {
    fn from(err: std::io::Error) -> Self {
        DbError::connection(
            format!("I/O error: {}", err),
            "Check network connectivity and SQL Server status",
        )
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Build suggestion data as JSON value.
fn suggestion_data(suggestion: Option<&str>) -> Option<serde_json::Value> {
    suggestion.map(|s| serde_json::json!({ "suggestion": s }))
}

/// Convert DbError to MCP ErrorData for semantic error categorization.
/// Includes the suggestion field in the `data` object when available.
impl From<DbError> for rmcp::ErrorData {
    fn from(err: DbError) -> Self {
        match &err {
            // Caller mistakes -> invalid_params
            DbError::UnknownOperation { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), None)
            }
            DbError::MissingParameter { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), None)
            }
            DbError::OperationNotAllowed { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), None)
            }
            DbError::UnclassifiedStatement { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), None)
            }

            DbError::ResourceNotFound { .. } => {
                rmcp::ErrorData::resource_not_found(err.to_string(), None)
            }

            // Connection -> internal_error (retryable)
            DbError::Connection { suggestion, .. } => {
                rmcp::ErrorData::internal_error(err.to_string(), suggestion_data(Some(suggestion)))
            }

            DbError::Execution { suggestion, .. } => {
                rmcp::ErrorData::internal_error(err.to_string(), suggestion_data(Some(suggestion)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::connection("Failed to connect", "Check credentials");
        assert!(err.to_string().contains("Connection failed"));
    }

    #[test]
    fn test_missing_parameter_names_parameter() {
        let err = DbError::missing_parameter("table_name");
        assert!(err.to_string().contains("table_name"));
    }

    #[test]
    fn test_unknown_operation_names_tool_and_action() {
        let err = DbError::unknown_operation("table", "shrink");
        let msg = err.to_string();
        assert!(msg.contains("table"));
        assert!(msg.contains("shrink"));
    }

    #[test]
    fn test_error_suggestion() {
        let err = DbError::execution("Syntax error", "Check SQL syntax");
        assert_eq!(err.suggestion(), Some("Check SQL syntax"));
    }

    #[test]
    fn test_error_retryable() {
        assert!(DbError::connection("err", "sugg").is_retryable());
        assert!(!DbError::missing_parameter("sql").is_retryable());
        assert!(!DbError::execution("err", "sugg").is_retryable());
    }

    // Tests for From<DbError> for rmcp::ErrorData

    #[test]
    fn test_unknown_operation_maps_to_invalid_params() {
        let err = DbError::unknown_operation("view", "rotate");
        let mcp_err: rmcp::ErrorData = err.into();
        // invalid_params uses -32602
        assert_eq!(mcp_err.code.0, -32602);
    }

    #[test]
    fn test_missing_parameter_maps_to_invalid_params() {
        let err = DbError::missing_parameter("sql");
        let mcp_err: rmcp::ErrorData = err.into();
        assert_eq!(mcp_err.code.0, -32602);
    }

    #[test]
    fn test_not_allowed_maps_to_invalid_params() {
        let err = DbError::not_allowed("query.write", "Read", "use query.read for SELECT");
        let mcp_err: rmcp::ErrorData = err.into();
        assert_eq!(mcp_err.code.0, -32602);
    }

    #[test]
    fn test_unclassified_maps_to_invalid_params() {
        let err = DbError::unclassified("MERGE INTO");
        let mcp_err: rmcp::ErrorData = err.into();
        assert_eq!(mcp_err.code.0, -32602);
    }

    #[test]
    fn test_resource_not_found_maps_to_resource_not_found() {
        let err = DbError::resource_not_found("mssql://users");
        let mcp_err: rmcp::ErrorData = err.into();
        // resource_not_found uses -32002 in rmcp
        assert_eq!(mcp_err.code.0, -32002);
    }

    #[test]
    fn test_connection_maps_to_internal_error() {
        let err = DbError::connection("failed", "try again");
        let mcp_err: rmcp::ErrorData = err.into();
        // internal_error uses -32603
        assert_eq!(mcp_err.code.0, -32603);
    }

    #[test]
    fn test_execution_maps_to_internal_error() {
        let err = DbError::execution("timeout", "simplify the query");
        let mcp_err: rmcp::ErrorData = err.into();
        assert_eq!(mcp_err.code.0, -32603);
    }

    #[test]
    fn test_connection_error_includes_suggestion_in_data() {
        let err = DbError::connection("failed", "try reconnecting");
        let mcp_err: rmcp::ErrorData = err.into();
        assert!(mcp_err.data.is_some());
        let data = mcp_err.data.unwrap();
        assert_eq!(data["suggestion"], "try reconnecting");
    }

    #[test]
    fn test_execution_error_includes_suggestion_in_data() {
        let err = DbError::execution("syntax error", "check syntax");
        let mcp_err: rmcp::ErrorData = err.into();
        assert!(mcp_err.data.is_some());
        let data = mcp_err.data.unwrap();
        assert_eq!(data["suggestion"], "check syntax");
    }
}
