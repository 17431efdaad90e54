//! Table operations: listing, schema description, creation, and sizing.

use crate::db::{StatementClass, StatementExecutor};
use crate::error::DbResult;
use crate::tools::cell;

const LIST_TABLES_SQL: &str = "\
SELECT TABLE_NAME, TABLE_TYPE
FROM INFORMATION_SCHEMA.TABLES
WHERE TABLE_TYPE = 'BASE TABLE'
ORDER BY TABLE_NAME";

const DESCRIBE_TABLE_SQL: &str = "\
SELECT
    COLUMN_NAME,
    DATA_TYPE,
    IS_NULLABLE,
    COLUMN_DEFAULT,
    CHARACTER_MAXIMUM_LENGTH
FROM INFORMATION_SCHEMA.COLUMNS
WHERE TABLE_NAME = @P1
ORDER BY ORDINAL_POSITION";

const TABLE_SIZE_SQL: &str = "\
SELECT
    SUM(p.rows) AS row_count,
    CAST(SUM(a.total_pages) * 8 / 1024.0 AS DECIMAL(10,2)) AS total_size_mb
FROM sys.tables t
    INNER JOIN sys.indexes i ON t.object_id = i.object_id
    INNER JOIN sys.partitions p ON t.object_id = p.object_id AND i.index_id = p.index_id
    INNER JOIN sys.allocation_units a ON p.partition_id = a.container_id
WHERE t.name = @P1
GROUP BY t.name";

pub async fn list(executor: &StatementExecutor) -> DbResult<String> {
    let set = executor.fetch(LIST_TABLES_SQL).await?;
    if set.is_empty() {
        return Ok("No tables found".to_string());
    }

    let mut result = String::from("Tables in database:\n");
    for row in &set.rows {
        result.push_str(&format!("- {} ({})\n", cell(row, 0), cell(row, 1)));
    }
    Ok(result)
}

pub async fn describe(executor: &StatementExecutor, table_name: &str) -> DbResult<String> {
    let set = executor
        .fetch_with_params(DESCRIBE_TABLE_SQL, &[&table_name])
        .await?;
    if set.is_empty() {
        return Ok(format!("Table '{}' not found", table_name));
    }

    let mut result = format!("Schema for table '{}':\n", table_name);
    result.push_str("Column Name | Data Type | Nullable | Default | Max Length\n");
    result.push_str(&"-".repeat(60));
    result.push('\n');

    for row in &set.rows {
        let default = row
            .get(3)
            .and_then(|v| v.as_deref())
            .unwrap_or("NULL");
        let max_len = row
            .get(4)
            .and_then(|v| v.as_deref())
            .unwrap_or("N/A");
        result.push_str(&format!(
            "{} | {} | {} | {} | {}\n",
            cell(row, 0),
            cell(row, 1),
            cell(row, 2),
            default,
            max_len
        ));
    }
    Ok(result)
}

pub async fn create(executor: &StatementExecutor, sql: &str) -> DbResult<String> {
    executor.run_write(sql, StatementClass::DdlTable).await
}

pub async fn size(executor: &StatementExecutor, table_name: &str) -> DbResult<String> {
    let set = executor
        .fetch_with_params(TABLE_SIZE_SQL, &[&table_name])
        .await?;
    match set.rows.first() {
        Some(row) => Ok(format!(
            "Table '{}' has {} rows and uses approximately {} MB.",
            table_name,
            cell(row, 0),
            cell(row, 1)
        )),
        None => Ok(format!("Table '{}' not found.", table_name)),
    }
}
