//! Raw statement execution.
//!
//! `query.read` runs a SELECT and returns CSV-like text. `query.write`
//! runs DML, most DDL, and procedure execution inside a transaction; the
//! dispatcher has already verified the statement class before either
//! handler runs.

use tracing::info;

use crate::db::{StatementClass, StatementExecutor};
use crate::error::DbResult;

pub async fn read(executor: &StatementExecutor, sql: &str) -> DbResult<String> {
    let result = executor.run_read(sql).await?;
    info!(lines = result.lines().count(), "read statement completed");
    Ok(result)
}

pub async fn write(
    executor: &StatementExecutor,
    sql: &str,
    class: StatementClass,
) -> DbResult<String> {
    let status = executor.run_write(sql, class).await?;
    info!(class = %class, "write statement committed");
    Ok(status)
}
