//! View operations: listing, definition lookup, creation, and removal.

use crate::db::{quote_ident, StatementClass, StatementExecutor};
use crate::error::DbResult;
use crate::tools::cell;

const LIST_VIEWS_SQL: &str = "\
SELECT TABLE_NAME
FROM INFORMATION_SCHEMA.TABLES
WHERE TABLE_TYPE = 'VIEW'
ORDER BY TABLE_NAME";

const DESCRIBE_VIEW_SQL: &str =
    "SELECT OBJECT_DEFINITION(OBJECT_ID(@P1)) AS ViewDefinition";

pub async fn list(executor: &StatementExecutor) -> DbResult<String> {
    let set = executor.fetch(LIST_VIEWS_SQL).await?;
    if set.is_empty() {
        return Ok("No views found".to_string());
    }

    let mut result = String::from("Views in database:\n");
    for row in &set.rows {
        result.push_str(&format!("- {}\n", cell(row, 0)));
    }
    Ok(result)
}

pub async fn describe(executor: &StatementExecutor, view_name: &str) -> DbResult<String> {
    let set = executor
        .fetch_with_params(DESCRIBE_VIEW_SQL, &[&view_name])
        .await?;
    let definition = set
        .rows
        .first()
        .and_then(|row| row.first())
        .and_then(|v| v.clone());

    match definition {
        Some(definition) => Ok(format!(
            "Definition for view '{}':\n{}\n{}",
            view_name,
            "=".repeat(50),
            definition
        )),
        None => Ok(format!("View '{}' not found", view_name)),
    }
}

pub async fn create(executor: &StatementExecutor, sql: &str) -> DbResult<String> {
    executor.run_write(sql, StatementClass::DdlView).await
}

pub async fn drop(executor: &StatementExecutor, view_name: &str) -> DbResult<String> {
    let sql = format!("DROP VIEW IF EXISTS {}", quote_ident(view_name));
    executor.run_write(&sql, StatementClass::DdlView).await?;
    Ok(format!("View '{}' deleted successfully", view_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_sql_targets_views() {
        assert!(LIST_VIEWS_SQL.contains("TABLE_TYPE = 'VIEW'"));
    }

    #[test]
    fn test_describe_sql_uses_object_definition() {
        assert!(DESCRIBE_VIEW_SQL.contains("OBJECT_DEFINITION"));
        assert!(DESCRIBE_VIEW_SQL.contains("@P1"));
    }
}
