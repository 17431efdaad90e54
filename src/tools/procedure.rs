//! Stored procedure operations: catalog, definition lookup, lifecycle,
//! and execution with positional parameters.

use crate::db::{quote_ident, StatementClass, StatementExecutor};
use crate::error::DbResult;
use crate::tools::cell;

const LIST_PROCEDURES_SQL: &str = "\
SELECT
    o.name AS ProcedureName,
    CONVERT(varchar(10), o.create_date, 120) AS CreatedDate,
    CONVERT(varchar(10), o.modify_date, 120) AS ModifiedDate,
    CASE
        WHEN EXISTS (
            SELECT 1 FROM sys.parameters p
            WHERE p.object_id = o.object_id
        ) THEN 'Yes'
        ELSE 'No'
    END AS HasParameters
FROM sys.objects o
WHERE o.type = 'P'
AND o.is_ms_shipped = 0
ORDER BY o.name";

const DESCRIBE_PROCEDURE_SQL: &str =
    "SELECT OBJECT_DEFINITION(OBJECT_ID(@P1)) AS ProcedureDefinition";

// Display transformations (MAX length, Yes/No flags) happen in SQL so the
// rendered cells are already in their final form.
const PROCEDURE_PARAMETERS_SQL: &str = "\
SELECT
    p.parameter_id,
    ISNULL(p.name, '(return value)') AS parameter_name,
    TYPE_NAME(p.user_type_id) AS data_type,
    CASE WHEN p.max_length = -1 THEN 'MAX'
         ELSE CAST(p.max_length AS varchar(10)) END AS max_length,
    CASE WHEN p.precision > 0 THEN CAST(p.precision AS varchar(10)) ELSE '' END AS precision,
    CASE WHEN p.scale > 0 THEN CAST(p.scale AS varchar(10)) ELSE '' END AS scale,
    CASE WHEN p.is_output = 1 THEN 'Yes' ELSE 'No' END AS is_output,
    CASE WHEN p.has_default_value = 1 THEN 'Yes' ELSE 'No' END AS has_default,
    ISNULL(CAST(p.default_value AS nvarchar(100)), '') AS default_value
FROM sys.parameters p
    INNER JOIN sys.objects o ON p.object_id = o.object_id
WHERE o.name = @P1 AND o.type = 'P'
ORDER BY p.parameter_id";

pub async fn list(executor: &StatementExecutor) -> DbResult<String> {
    let set = executor.fetch(LIST_PROCEDURES_SQL).await?;
    if set.is_empty() {
        return Ok("No user-defined stored procedures found".to_string());
    }

    let mut result = String::from("Stored procedures in database:\n");
    result.push_str("Name | Created | Modified | Has Parameters\n");
    result.push_str(&"-".repeat(60));
    result.push('\n');

    for row in &set.rows {
        let created = row.get(1).and_then(|v| v.as_deref()).unwrap_or("N/A");
        let modified = row.get(2).and_then(|v| v.as_deref()).unwrap_or("N/A");
        result.push_str(&format!(
            "{} | {} | {} | {}\n",
            cell(row, 0),
            created,
            modified,
            cell(row, 3)
        ));
    }
    Ok(result)
}

pub async fn describe(executor: &StatementExecutor, procedure_name: &str) -> DbResult<String> {
    let set = executor
        .fetch_with_params(DESCRIBE_PROCEDURE_SQL, &[&procedure_name])
        .await?;
    let definition = set
        .rows
        .first()
        .and_then(|row| row.first())
        .and_then(|v| v.clone());

    match definition {
        Some(definition) => Ok(format!(
            "Definition for procedure '{}':\n{}\n{}",
            procedure_name,
            "=".repeat(50),
            definition
        )),
        None => Ok(format!("Procedure '{}' not found", procedure_name)),
    }
}

pub async fn get_parameters(
    executor: &StatementExecutor,
    procedure_name: &str,
) -> DbResult<String> {
    let set = executor
        .fetch_with_params(PROCEDURE_PARAMETERS_SQL, &[&procedure_name])
        .await?;
    if set.is_empty() {
        return Ok(format!(
            "No parameters found for procedure '{}' or procedure does not exist",
            procedure_name
        ));
    }

    let mut result = format!("Parameters for procedure '{}':\n", procedure_name);
    result.push_str(
        "ID | Name | Data Type | Length | Precision | Scale | Output | Has Default | Default Value\n",
    );
    result.push_str(&"-".repeat(90));
    result.push('\n');

    for row in &set.rows {
        let fields: Vec<&str> = (0..9).map(|i| cell(row, i)).collect();
        result.push_str(&fields.join(" | "));
        result.push('\n');
    }
    Ok(result)
}

pub async fn create(executor: &StatementExecutor, sql: &str) -> DbResult<String> {
    executor.run_write(sql, StatementClass::DdlProcedure).await
}

pub async fn drop(executor: &StatementExecutor, procedure_name: &str) -> DbResult<String> {
    let sql = format!("DROP PROCEDURE IF EXISTS {}", quote_ident(procedure_name));
    executor
        .run_write(&sql, StatementClass::DdlProcedure)
        .await?;
    Ok(format!(
        "Procedure '{}' deleted successfully",
        procedure_name
    ))
}

pub async fn execute(
    executor: &StatementExecutor,
    procedure_name: &str,
    parameters: &[String],
) -> DbResult<String> {
    match executor.exec_procedure(procedure_name, parameters).await? {
        Some(set) if !set.is_empty() => Ok(format!(
            "Procedure '{}' executed successfully.\n\nResults:\n{}",
            procedure_name,
            set.to_csv()
        )),
        _ => Ok(format!(
            "Procedure '{}' executed successfully. No results returned.",
            procedure_name
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_sql_excludes_system_procedures() {
        assert!(LIST_PROCEDURES_SQL.contains("is_ms_shipped = 0"));
        assert!(LIST_PROCEDURES_SQL.contains("o.type = 'P'"));
    }

    #[test]
    fn test_describe_sql_is_parameterized() {
        assert!(DESCRIBE_PROCEDURE_SQL.contains("@P1"));
    }

    #[test]
    fn test_parameters_sql_renders_display_values() {
        assert!(PROCEDURE_PARAMETERS_SQL.contains("@P1"));
        assert!(PROCEDURE_PARAMETERS_SQL.contains("'(return value)'"));
        assert!(PROCEDURE_PARAMETERS_SQL.contains("'MAX'"));
        assert!(PROCEDURE_PARAMETERS_SQL.contains("ORDER BY p.parameter_id"));
    }
}
