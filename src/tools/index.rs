//! Index operations: listing, creation, and removal.

use crate::db::{quote_ident, StatementClass, StatementExecutor};
use crate::error::DbResult;
use crate::tools::cell;

const LIST_INDEXES_FOR_TABLE_SQL: &str = "\
SELECT
    i.name AS IndexName,
    i.type_desc AS IndexType,
    i.is_unique AS IsUnique,
    i.is_primary_key AS IsPrimaryKey,
    i.is_disabled AS IsDisabled
FROM sys.indexes i
    INNER JOIN sys.objects o ON i.object_id = o.object_id
WHERE o.name = @P1 AND i.name IS NOT NULL
ORDER BY i.name";

const LIST_ALL_INDEXES_SQL: &str = "\
SELECT
    OBJECT_NAME(i.object_id) AS TableName,
    i.name AS IndexName,
    i.type_desc AS IndexType,
    i.is_unique AS IsUnique,
    i.is_primary_key AS IsPrimaryKey,
    i.is_disabled AS IsDisabled
FROM sys.indexes i
    INNER JOIN sys.objects o ON i.object_id = o.object_id
WHERE o.type = 'U' AND i.name IS NOT NULL
ORDER BY OBJECT_NAME(i.object_id), i.name";

const DESCRIBE_INDEX_SQL: &str = "\
SELECT
    i.name AS IndexName,
    i.type_desc AS IndexType,
    i.is_unique AS IsUnique,
    i.is_primary_key AS IsPrimaryKey,
    i.is_disabled AS IsDisabled
FROM sys.indexes i
    INNER JOIN sys.objects o ON i.object_id = o.object_id
WHERE i.name = @P1 AND o.name = @P2";

pub async fn list(executor: &StatementExecutor, table_name: Option<&str>) -> DbResult<String> {
    let (set, mut result) = match table_name {
        Some(table) => {
            let set = executor
                .fetch_with_params(LIST_INDEXES_FOR_TABLE_SQL, &[&table])
                .await?;
            let mut header = format!("Indexes for table '{}':\n", table);
            header.push_str("Name | Type | Unique | Primary Key | Disabled\n");
            header.push_str(&"-".repeat(60));
            header.push('\n');
            (set, header)
        }
        None => {
            let set = executor.fetch(LIST_ALL_INDEXES_SQL).await?;
            let mut header = String::from("Indexes in database:\n");
            header.push_str("Table | Index Name | Type | Unique | Primary Key | Disabled\n");
            header.push_str(&"-".repeat(80));
            header.push('\n');
            (set, header)
        }
    };

    if set.is_empty() {
        return Ok("No indexes found".to_string());
    }

    for row in &set.rows {
        let fields: Vec<&str> = (0..set.columns.len()).map(|i| cell(row, i)).collect();
        result.push_str(&fields.join(" | "));
        result.push('\n');
    }
    Ok(result)
}

pub async fn describe(
    executor: &StatementExecutor,
    index_name: &str,
    table_name: &str,
) -> DbResult<String> {
    let set = executor
        .fetch_with_params(DESCRIBE_INDEX_SQL, &[&index_name, &table_name])
        .await?;

    match set.rows.first() {
        Some(row) => {
            let mut result = format!("Index '{}' in table '{}':\n", index_name, table_name);
            result.push_str("Name | Type | Unique | Primary Key | Disabled\n");
            result.push_str(&"-".repeat(60));
            result.push('\n');
            let fields: Vec<&str> = (0..set.columns.len()).map(|i| cell(row, i)).collect();
            result.push_str(&fields.join(" | "));
            result.push('\n');
            Ok(result)
        }
        None => Ok(format!(
            "Index '{}' not found in table '{}'",
            index_name, table_name
        )),
    }
}

pub async fn create(executor: &StatementExecutor, sql: &str) -> DbResult<String> {
    executor.run_write(sql, StatementClass::DdlIndex).await
}

pub async fn drop(
    executor: &StatementExecutor,
    index_name: &str,
    table_name: &str,
) -> DbResult<String> {
    let sql = format!(
        "DROP INDEX IF EXISTS {} ON {}",
        quote_ident(index_name),
        quote_ident(table_name)
    );
    executor.run_write(&sql, StatementClass::DdlIndex).await?;
    Ok(format!(
        "Index '{}' in table '{}' deleted successfully",
        index_name, table_name
    ))
}
