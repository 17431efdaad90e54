//! Integration tests for operation dispatch validation.
//!
//! Validation happens before any connection is opened, so these tests run
//! against an unreachable server and still exercise the full rejection
//! paths: unknown operations, missing parameters, and disallowed classes.

use mssql_mcp_server::db::{ConnectionDescriptor, StatementExecutor};
use mssql_mcp_server::error::DbError;
use mssql_mcp_server::tools::{Dispatcher, OperationRequest};

fn dispatcher() -> Dispatcher {
    Dispatcher::new(StatementExecutor::new(ConnectionDescriptor {
        host: "unreachable.invalid".to_string(),
        port: 1433,
        database: "testdb".to_string(),
        user: Some("sa".to_string()),
        password: Some("secret".to_string()),
        trusted_connection: false,
        trust_cert: false,
        app_name: "mssql-mcp-server".to_string(),
    }))
}

/// Test that an unknown action is rejected with the tool and action named.
#[tokio::test]
async fn test_unknown_action_rejected() {
    let result = dispatcher()
        .dispatch(&OperationRequest::new("query", "upsert"))
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, DbError::UnknownOperation { .. }));
    assert!(err.to_string().contains("upsert"));
    assert!(err.to_string().contains("query"));
}

/// Test that an unknown tool is rejected.
#[tokio::test]
async fn test_unknown_tool_rejected() {
    let result = dispatcher()
        .dispatch(&OperationRequest::new("trigger", "list"))
        .await;
    assert!(matches!(result, Err(DbError::UnknownOperation { .. })));
}

/// Test that a missing required parameter is reported by name.
#[tokio::test]
async fn test_missing_sql_rejected() {
    let result = dispatcher()
        .dispatch(&OperationRequest::new("query", "read"))
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, DbError::MissingParameter { .. }));
    assert_eq!(err.to_string(), "Missing required parameter: sql");
}

/// Test that an empty string counts as a missing parameter.
#[tokio::test]
async fn test_empty_sql_counts_as_missing() {
    let request = OperationRequest::new("query", "read").with_param("sql", "   ");
    let result = dispatcher().dispatch(&request).await;
    assert!(matches!(result, Err(DbError::MissingParameter { .. })));
}

/// Test that a SELECT through the write path is refused.
#[tokio::test]
async fn test_select_not_allowed_on_write() {
    let request = OperationRequest::new("query", "write").with_param("sql", "SELECT 1");
    let result = dispatcher().dispatch(&request).await;

    let err = result.unwrap_err();
    assert!(matches!(err, DbError::OperationNotAllowed { .. }));
    assert!(err.to_string().contains("query.write"));
}

/// Test that CREATE TABLE cannot slip through the generic write path.
#[tokio::test]
async fn test_create_table_not_allowed_on_write() {
    let request = OperationRequest::new("query", "write")
        .with_param("sql", "CREATE TABLE t (id INT PRIMARY KEY)");
    let result = dispatcher().dispatch(&request).await;
    assert!(matches!(result, Err(DbError::OperationNotAllowed { .. })));
}

/// Test that an INSERT through the read path is refused.
#[tokio::test]
async fn test_insert_not_allowed_on_read() {
    let request = OperationRequest::new("query", "read")
        .with_param("sql", "INSERT INTO t (id) VALUES (1)");
    let result = dispatcher().dispatch(&request).await;
    assert!(matches!(result, Err(DbError::OperationNotAllowed { .. })));
}

/// Test that table.create only accepts CREATE TABLE statements.
#[tokio::test]
async fn test_table_create_rejects_drop() {
    let request = OperationRequest::new("table", "create").with_param("sql", "DROP TABLE t");
    let result = dispatcher().dispatch(&request).await;
    assert!(matches!(result, Err(DbError::OperationNotAllowed { .. })));
}

/// Test that index.create accepts the unique variant prefix.
///
/// The request passes validation; the failure comes from the unreachable
/// host, proving classification did not reject it.
#[tokio::test]
async fn test_index_create_accepts_unique_index() {
    let request = OperationRequest::new("index", "create")
        .with_param("sql", "CREATE UNIQUE INDEX ix ON t (c)");
    let result = dispatcher().dispatch(&request).await;
    assert!(matches!(result, Err(DbError::Connection { .. })));
}

/// Test that unclassifiable statements surface the classifier error.
#[tokio::test]
async fn test_unclassified_statement_rejected() {
    let request =
        OperationRequest::new("query", "write").with_param("sql", "TRUNCATE TABLE logs");
    let result = dispatcher().dispatch(&request).await;
    assert!(matches!(result, Err(DbError::UnclassifiedStatement { .. })));
}

/// Test that view.drop reports the missing name rather than a generic error.
#[tokio::test]
async fn test_view_drop_requires_name() {
    let result = dispatcher()
        .dispatch(&OperationRequest::new("view", "drop"))
        .await;
    let err = result.unwrap_err();
    assert_eq!(err.to_string(), "Missing required parameter: view_name");
}

/// Test that index.drop requires both the index and table names.
#[tokio::test]
async fn test_index_drop_requires_both_names() {
    let request = OperationRequest::new("index", "drop").with_param("index_name", "ix");
    let result = dispatcher().dispatch(&request).await;
    let err = result.unwrap_err();
    assert_eq!(err.to_string(), "Missing required parameter: table_name");
}

/// Test that index.describe requires both the index and table names.
#[tokio::test]
async fn test_index_describe_requires_both_names() {
    let request = OperationRequest::new("index", "describe").with_param("index_name", "ix");
    let result = dispatcher().dispatch(&request).await;
    let err = result.unwrap_err();
    assert_eq!(err.to_string(), "Missing required parameter: table_name");
}

/// Test that function.drop requires the function name.
#[tokio::test]
async fn test_function_drop_requires_name() {
    let result = dispatcher()
        .dispatch(&OperationRequest::new("function", "drop"))
        .await;
    let err = result.unwrap_err();
    assert_eq!(err.to_string(), "Missing required parameter: function_name");
}

/// Test that procedure.get_parameters requires the procedure name.
#[tokio::test]
async fn test_procedure_get_parameters_requires_name() {
    let result = dispatcher()
        .dispatch(&OperationRequest::new("procedure", "get_parameters"))
        .await;
    let err = result.unwrap_err();
    assert_eq!(err.to_string(), "Missing required parameter: procedure_name");
}
