//! Statement prefix classification.
//!
//! This module assigns every incoming SQL statement to one of eight
//! statement classes by inspecting its first one to three tokens. The
//! classes drive the per-operation allow lists: `query.read` accepts only
//! [`StatementClass::Read`], `query.write` accepts DML and most DDL but
//! never table DDL, and each DDL tool accepts only its own class.
//!
//! Classification is deliberately lexical. The statement body is never
//! parsed; anything that does not start with a known prefix is rejected
//! with an unclassified-statement error.

use crate::error::{DbError, DbResult};

/// Class of a SQL statement, determined by its leading keyword(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementClass {
    /// SELECT
    Read,
    /// INSERT, UPDATE, DELETE
    Write,
    /// CREATE/ALTER/DROP TABLE
    DdlTable,
    /// CREATE/ALTER/DROP VIEW
    DdlView,
    /// CREATE [UNIQUE] INDEX, DROP INDEX
    DdlIndex,
    /// CREATE/ALTER/DROP PROCEDURE
    DdlProcedure,
    /// CREATE/ALTER/DROP FUNCTION
    DdlFunction,
    /// EXEC, EXECUTE
    Execute,
}

impl std::fmt::Display for StatementClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Read => "Read",
            Self::Write => "Write",
            Self::DdlTable => "DdlTable",
            Self::DdlView => "DdlView",
            Self::DdlIndex => "DdlIndex",
            Self::DdlProcedure => "DdlProcedure",
            Self::DdlFunction => "DdlFunction",
            Self::Execute => "Execute",
        };
        write!(f, "{}", name)
    }
}

/// Known statement prefixes, longest first so that three-token prefixes
/// win over their two-token and one-token prefixes.
const PREFIXES: &[(&[&str], StatementClass)] = &[
    (&["CREATE", "UNIQUE", "INDEX"], StatementClass::DdlIndex),
    (&["CREATE", "TABLE"], StatementClass::DdlTable),
    (&["ALTER", "TABLE"], StatementClass::DdlTable),
    (&["DROP", "TABLE"], StatementClass::DdlTable),
    (&["CREATE", "VIEW"], StatementClass::DdlView),
    (&["ALTER", "VIEW"], StatementClass::DdlView),
    (&["DROP", "VIEW"], StatementClass::DdlView),
    (&["CREATE", "INDEX"], StatementClass::DdlIndex),
    (&["DROP", "INDEX"], StatementClass::DdlIndex),
    (&["CREATE", "PROCEDURE"], StatementClass::DdlProcedure),
    (&["ALTER", "PROCEDURE"], StatementClass::DdlProcedure),
    (&["DROP", "PROCEDURE"], StatementClass::DdlProcedure),
    (&["CREATE", "FUNCTION"], StatementClass::DdlFunction),
    (&["ALTER", "FUNCTION"], StatementClass::DdlFunction),
    (&["DROP", "FUNCTION"], StatementClass::DdlFunction),
    (&["SELECT"], StatementClass::Read),
    (&["INSERT"], StatementClass::Write),
    (&["UPDATE"], StatementClass::Write),
    (&["DELETE"], StatementClass::Write),
    (&["EXEC"], StatementClass::Execute),
    (&["EXECUTE"], StatementClass::Execute),
];

/// Result of classifying a statement: the class plus the canonical form of
/// the matched prefix (e.g. "CREATE PROCEDURE"). Handlers that care about
/// the exact verb check the prefix instead of re-tokenizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified {
    pub class: StatementClass,
    pub prefix: &'static str,
}

/// Canonical prefix string for a matched prefix slice.
fn canonical(tokens: &[&str]) -> &'static str {
    match tokens {
        ["CREATE", "UNIQUE", "INDEX"] => "CREATE UNIQUE INDEX",
        ["CREATE", "TABLE"] => "CREATE TABLE",
        ["ALTER", "TABLE"] => "ALTER TABLE",
        ["DROP", "TABLE"] => "DROP TABLE",
        ["CREATE", "VIEW"] => "CREATE VIEW",
        ["ALTER", "VIEW"] => "ALTER VIEW",
        ["DROP", "VIEW"] => "DROP VIEW",
        ["CREATE", "INDEX"] => "CREATE INDEX",
        ["DROP", "INDEX"] => "DROP INDEX",
        ["CREATE", "PROCEDURE"] => "CREATE PROCEDURE",
        ["ALTER", "PROCEDURE"] => "ALTER PROCEDURE",
        ["DROP", "PROCEDURE"] => "DROP PROCEDURE",
        ["CREATE", "FUNCTION"] => "CREATE FUNCTION",
        ["ALTER", "FUNCTION"] => "ALTER FUNCTION",
        ["DROP", "FUNCTION"] => "DROP FUNCTION",
        ["SELECT"] => "SELECT",
        ["INSERT"] => "INSERT",
        ["UPDATE"] => "UPDATE",
        ["DELETE"] => "DELETE",
        ["EXEC"] => "EXEC",
        ["EXECUTE"] => "EXECUTE",
        _ => "",
    }
}

/// Classify a SQL statement by its leading tokens.
///
/// The statement is trimmed and split on whitespace; up to the first three
/// tokens are compared case-insensitively against the prefix table. Empty
/// statements and unknown prefixes return
/// [`DbError::UnclassifiedStatement`].
pub fn classify(sql: &str) -> DbResult<Classified> {
    let tokens: Vec<String> = sql
        .split_whitespace()
        .take(3)
        .map(|t| t.to_ascii_uppercase())
        .collect();

    if tokens.is_empty() {
        return Err(DbError::unclassified(""));
    }

    for (prefix, class) in PREFIXES {
        if prefix.len() <= tokens.len()
            && prefix
                .iter()
                .zip(tokens.iter())
                .all(|(expected, actual)| *expected == actual)
        {
            return Ok(Classified {
                class: *class,
                prefix: canonical(prefix),
            });
        }
    }

    Err(DbError::unclassified(tokens.join(" ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class_of(sql: &str) -> StatementClass {
        classify(sql).unwrap().class
    }

    // =========================================================================
    // One-token prefixes
    // =========================================================================

    #[test]
    fn test_select_is_read() {
        assert_eq!(class_of("SELECT 1"), StatementClass::Read);
        assert_eq!(class_of("select * from users"), StatementClass::Read);
    }

    #[test]
    fn test_dml_is_write() {
        assert_eq!(
            class_of("INSERT INTO users VALUES (1)"),
            StatementClass::Write
        );
        assert_eq!(class_of("UPDATE users SET a = 1"), StatementClass::Write);
        assert_eq!(class_of("DELETE FROM users"), StatementClass::Write);
    }

    #[test]
    fn test_exec_variants() {
        assert_eq!(class_of("EXEC sp_who"), StatementClass::Execute);
        assert_eq!(class_of("EXECUTE sp_who"), StatementClass::Execute);
    }

    // =========================================================================
    // Multi-token prefixes
    // =========================================================================

    #[test]
    fn test_table_ddl() {
        assert_eq!(class_of("CREATE TABLE t (id INT)"), StatementClass::DdlTable);
        assert_eq!(
            class_of("ALTER TABLE t ADD c INT"),
            StatementClass::DdlTable
        );
        assert_eq!(class_of("DROP TABLE t"), StatementClass::DdlTable);
    }

    #[test]
    fn test_view_ddl() {
        assert_eq!(
            class_of("CREATE VIEW v AS SELECT 1 AS n"),
            StatementClass::DdlView
        );
        assert_eq!(
            class_of("ALTER VIEW v AS SELECT 2 AS n"),
            StatementClass::DdlView
        );
        assert_eq!(class_of("DROP VIEW v"), StatementClass::DdlView);
    }

    #[test]
    fn test_index_ddl() {
        assert_eq!(
            class_of("CREATE INDEX ix ON t (c)"),
            StatementClass::DdlIndex
        );
        assert_eq!(class_of("DROP INDEX ix ON t"), StatementClass::DdlIndex);
    }

    #[test]
    fn test_create_unique_index_is_index_ddl() {
        assert_eq!(
            class_of("CREATE UNIQUE INDEX ix ON t (c)"),
            StatementClass::DdlIndex
        );
    }

    #[test]
    fn test_procedure_ddl() {
        assert_eq!(
            class_of("CREATE PROCEDURE p AS SELECT 1"),
            StatementClass::DdlProcedure
        );
        assert_eq!(
            class_of("ALTER PROCEDURE p AS SELECT 2"),
            StatementClass::DdlProcedure
        );
        assert_eq!(class_of("DROP PROCEDURE p"), StatementClass::DdlProcedure);
    }

    #[test]
    fn test_function_ddl() {
        assert_eq!(
            class_of("CREATE FUNCTION f() RETURNS INT AS BEGIN RETURN 1 END"),
            StatementClass::DdlFunction
        );
        assert_eq!(class_of("DROP FUNCTION f"), StatementClass::DdlFunction);
    }

    #[test]
    fn test_case_insensitive_and_leading_whitespace() {
        assert_eq!(
            class_of("  \n\t create   Table t (id INT)"),
            StatementClass::DdlTable
        );
        assert_eq!(class_of("Exec sp_who"), StatementClass::Execute);
    }

    // =========================================================================
    // Rejections
    // =========================================================================

    #[test]
    fn test_empty_statement_unclassified() {
        assert!(matches!(
            classify(""),
            Err(DbError::UnclassifiedStatement { .. })
        ));
        assert!(matches!(
            classify("   \t\n "),
            Err(DbError::UnclassifiedStatement { .. })
        ));
    }

    #[test]
    fn test_unknown_statements_unclassified() {
        for sql in [
            "MERGE INTO t USING s ON t.id = s.id",
            "TRUNCATE TABLE t",
            "GRANT SELECT ON t TO someone",
            "WITH cte AS (SELECT 1 AS n) SELECT * FROM cte",
            "CREATE TRIGGER trg ON t AFTER INSERT AS SELECT 1",
            "DROP DATABASE d",
        ] {
            let result = classify(sql);
            assert!(
                matches!(result, Err(DbError::UnclassifiedStatement { .. })),
                "expected unclassified for: {}",
                sql
            );
        }
    }

    #[test]
    fn test_unclassified_error_names_tokens() {
        let err = classify("MERGE INTO t").unwrap_err();
        assert!(err.to_string().contains("MERGE INTO T"));
    }

    // =========================================================================
    // Canonical prefixes
    // =========================================================================

    #[test]
    fn test_canonical_prefix_reported() {
        assert_eq!(classify("create view v as select 1").unwrap().prefix, "CREATE VIEW");
        assert_eq!(
            classify("create unique index ix on t (c)").unwrap().prefix,
            "CREATE UNIQUE INDEX"
        );
        assert_eq!(classify("execute sp_who").unwrap().prefix, "EXECUTE");
    }
}
