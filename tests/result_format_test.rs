//! Integration tests for result normalization.
//!
//! Read results render as comma-joined lines with a header row, nulls as
//! empty fields, and no quoting or escaping of the values.

use mssql_mcp_server::db::{NO_RESULTS, ResultSet, quote_ident};

fn sample_set() -> ResultSet {
    ResultSet {
        columns: vec!["id".to_string(), "name".to_string(), "city".to_string()],
        rows: vec![
            vec![
                Some("1".to_string()),
                Some("alice".to_string()),
                Some("Portland, OR".to_string()),
            ],
            vec![Some("2".to_string()), None, Some("Boise".to_string())],
        ],
    }
}

/// Test that N data rows render as N+1 lines, header first.
#[test]
fn test_csv_line_count() {
    let csv = sample_set().to_csv();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "id,name,city");
}

/// Test that NULL values render as empty fields.
#[test]
fn test_null_renders_empty() {
    let csv = sample_set().to_csv();
    assert!(csv.contains("2,,Boise"));
}

/// Test that embedded commas pass through without quoting.
#[test]
fn test_values_are_not_escaped() {
    let csv = sample_set().to_csv();
    assert!(csv.contains("1,alice,Portland, OR"));
    assert!(!csv.contains('"'));
}

/// Test that a header-only result is still considered empty.
#[test]
fn test_header_only_set_is_empty() {
    let set = ResultSet {
        columns: vec!["id".to_string()],
        rows: vec![],
    };
    assert!(set.is_empty());
    assert_eq!(set.to_csv(), "id");
}

/// Test the empty-result sentinel text.
#[test]
fn test_no_results_sentinel() {
    assert_eq!(NO_RESULTS, "No results found");
}

/// Test bracket quoting of identifiers, including closing brackets.
#[test]
fn test_quote_ident() {
    assert_eq!(quote_ident("users"), "[users]");
    assert_eq!(quote_ident("odd]name"), "[odd]]name]");
}
