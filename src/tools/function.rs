//! User-defined function operations.
//!
//! Creation accepts CREATE FUNCTION and ALTER FUNCTION scripts; execution
//! wraps a scalar call in a SELECT and reports the single value.

use crate::db::{quote_ident, StatementClass, StatementExecutor};
use crate::error::DbResult;
use crate::tools::cell;

const LIST_FUNCTIONS_SQL: &str = "\
SELECT name, type_desc
FROM sys.objects
WHERE type IN ('FN', 'IF', 'TF')
ORDER BY name";

const DESCRIBE_FUNCTION_SQL: &str =
    "SELECT OBJECT_DEFINITION(OBJECT_ID(@P1)) AS FunctionDefinition";

pub async fn list(executor: &StatementExecutor) -> DbResult<String> {
    let set = executor.fetch(LIST_FUNCTIONS_SQL).await?;
    if set.is_empty() {
        return Ok("No user-defined functions found".to_string());
    }

    let lines: Vec<String> = set
        .rows
        .iter()
        .map(|row| format!("{} ({})", cell(row, 0), cell(row, 1)))
        .collect();
    Ok(lines.join("\n"))
}

pub async fn describe(executor: &StatementExecutor, function_name: &str) -> DbResult<String> {
    let set = executor
        .fetch_with_params(DESCRIBE_FUNCTION_SQL, &[&function_name])
        .await?;
    let definition = set
        .rows
        .first()
        .and_then(|row| row.first())
        .and_then(|v| v.clone());

    match definition {
        Some(definition) => Ok(definition),
        None => Ok(format!("Function '{}' not found", function_name)),
    }
}

pub async fn create(executor: &StatementExecutor, sql: &str) -> DbResult<String> {
    executor.run_write(sql, StatementClass::DdlFunction).await
}

pub async fn drop(executor: &StatementExecutor, function_name: &str) -> DbResult<String> {
    let sql = format!("DROP FUNCTION IF EXISTS {}", quote_ident(function_name));
    executor.run_write(&sql, StatementClass::DdlFunction).await?;
    Ok(format!("Function '{}' deleted successfully", function_name))
}

/// Run a scalar function call, e.g. `dbo.fn_total(3, 'EUR')`.
pub async fn execute(executor: &StatementExecutor, function_call: &str) -> DbResult<String> {
    let sql = format!("SELECT {}", function_call);
    let set = executor.fetch(&sql).await?;
    let value = set
        .rows
        .first()
        .and_then(|row| row.first())
        .and_then(|v| v.clone());
    Ok(format!(
        "Result: {}",
        value.unwrap_or_else(|| "NULL".to_string())
    ))
}
