//! Schema and object catalogs.

use crate::db::StatementExecutor;
use crate::error::DbResult;
use crate::tools::cell;

const LIST_SCHEMAS_SQL: &str = "\
SELECT SCHEMA_NAME(schema_id) AS SchemaName
FROM sys.schemas
ORDER BY SCHEMA_NAME(schema_id)";

const LIST_OBJECTS_FOR_SCHEMA_SQL: &str = "\
SELECT
    OBJECT_NAME(object_id) AS ObjectName,
    type_desc AS ObjectType
FROM sys.objects
WHERE SCHEMA_NAME(schema_id) = @P1
ORDER BY OBJECT_NAME(object_id)";

const LIST_ALL_OBJECTS_SQL: &str = "\
SELECT
    SCHEMA_NAME(schema_id) AS SchemaName,
    OBJECT_NAME(object_id) AS ObjectName,
    type_desc AS ObjectType
FROM sys.objects
ORDER BY SCHEMA_NAME(schema_id), OBJECT_NAME(object_id)";

pub async fn list_schemas(executor: &StatementExecutor) -> DbResult<String> {
    let set = executor.fetch(LIST_SCHEMAS_SQL).await?;
    if set.is_empty() {
        return Ok("No schemas found".to_string());
    }

    let mut result = String::from("Schemas in database:\n");
    for row in &set.rows {
        result.push_str(&format!("- {}\n", cell(row, 0)));
    }
    Ok(result)
}

pub async fn list_objects(
    executor: &StatementExecutor,
    schema_name: Option<&str>,
) -> DbResult<String> {
    let set = match schema_name {
        Some(schema) => {
            executor
                .fetch_with_params(LIST_OBJECTS_FOR_SCHEMA_SQL, &[&schema])
                .await?
        }
        None => executor.fetch(LIST_ALL_OBJECTS_SQL).await?,
    };

    if set.is_empty() {
        return Ok("No objects found".to_string());
    }

    let mut result = String::from("Objects in database:\n");
    for row in &set.rows {
        let fields: Vec<&str> = (0..set.columns.len()).map(|i| cell(row, i)).collect();
        result.push_str(&format!("- {}\n", fields.join(" | ")));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_objects_sql_is_parameterized() {
        assert!(LIST_OBJECTS_FOR_SCHEMA_SQL.contains("@P1"));
    }

    #[test]
    fn test_all_objects_sql_orders_by_schema() {
        assert!(LIST_ALL_OBJECTS_SQL.contains("ORDER BY SCHEMA_NAME(schema_id)"));
    }
}
