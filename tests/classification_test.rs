//! Integration tests for statement classification.
//!
//! These tests verify that SQL statements route to the correct class based
//! on their leading tokens, and that unrecognized statements are rejected.

use mssql_mcp_server::db::{StatementClass, classify};
use mssql_mcp_server::error::DbError;

/// Test that SELECT classifies as a read.
#[test]
fn test_select_is_read() {
    let classified = classify("SELECT * FROM users").unwrap();
    assert_eq!(classified.class, StatementClass::Read);
}

/// Test that data modification statements classify as writes.
#[test]
fn test_dml_is_write() {
    for sql in [
        "INSERT INTO users (name) VALUES ('test')",
        "UPDATE users SET name = 'changed' WHERE id = 1",
        "DELETE FROM users WHERE id = 1",
    ] {
        let classified = classify(sql).unwrap();
        assert_eq!(classified.class, StatementClass::Write, "sql: {}", sql);
    }
}

/// Test that table DDL gets its own class, separate from other DDL.
#[test]
fn test_table_ddl_class() {
    for sql in [
        "CREATE TABLE t (id INT)",
        "ALTER TABLE t ADD col INT",
        "DROP TABLE t",
    ] {
        let classified = classify(sql).unwrap();
        assert_eq!(classified.class, StatementClass::DdlTable, "sql: {}", sql);
    }
}

/// Test that CREATE UNIQUE INDEX lands in the index class, not table DDL.
#[test]
fn test_create_unique_index_is_index_ddl() {
    let classified = classify("CREATE UNIQUE INDEX ix_users_email ON users (email)").unwrap();
    assert_eq!(classified.class, StatementClass::DdlIndex);
    assert_eq!(classified.prefix, "CREATE UNIQUE INDEX");
}

/// Test that classification ignores case and surrounding whitespace.
#[test]
fn test_classification_is_case_insensitive() {
    let classified = classify("  select 1  ").unwrap();
    assert_eq!(classified.class, StatementClass::Read);

    let classified = classify("create Procedure dbo.p AS SELECT 1").unwrap();
    assert_eq!(classified.class, StatementClass::DdlProcedure);
}

/// Test that EXEC and EXECUTE both classify as procedure execution.
#[test]
fn test_exec_variants() {
    assert_eq!(classify("EXEC dbo.p").unwrap().class, StatementClass::Execute);
    assert_eq!(
        classify("EXECUTE dbo.p @x = 1").unwrap().class,
        StatementClass::Execute
    );
}

/// Test that statements outside the known prefixes are rejected.
#[test]
fn test_unknown_statements_rejected() {
    for sql in [
        "MERGE INTO t USING s ON t.id = s.id",
        "TRUNCATE TABLE t",
        "GRANT SELECT ON t TO role",
        "WITH cte AS (SELECT 1 AS n) SELECT * FROM cte",
        "",
    ] {
        let result = classify(sql);
        assert!(
            matches!(result, Err(DbError::UnclassifiedStatement { .. })),
            "should reject: {:?}",
            sql
        );
    }
}
