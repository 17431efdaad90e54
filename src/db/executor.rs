//! Statement execution and result normalization.
//!
//! Read statements produce CSV-like text: one header line of column names,
//! then one line per row, values joined by commas with NULL as an empty
//! field. No quoting or escaping is applied. Write and DDL statements run
//! inside an explicit transaction that commits on success and rolls back
//! on failure, then report a per-class status sentence.

use futures_util::TryStreamExt;
use tiberius::{QueryItem, ToSql};
use tracing::{debug, warn};

use crate::db::connection::{ConnectionDescriptor, DbClient};
use crate::db::values;
use crate::db::StatementClass;
use crate::error::DbResult;

/// Row cap applied when reading table data through the resources surface.
pub const RESOURCE_ROW_CAP: usize = 100;

pub const NO_RESULTS: &str = "No results found";

/// One result set, with values already rendered to text.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl ResultSet {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render as CSV-like text: N rows produce N+1 lines.
    pub fn to_csv(&self) -> String {
        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        lines.push(self.columns.join(","));
        for row in &self.rows {
            let fields: Vec<&str> = row.iter().map(|v| v.as_deref().unwrap_or("")).collect();
            lines.push(fields.join(","));
        }
        lines.join("\n")
    }
}

/// Quote an object name for bracketed interpolation.
///
/// Object names arrive as tool parameters from a trusted administrator;
/// only the closing bracket needs doubling to keep the quoting intact.
pub fn quote_ident(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Runs statements over per-call connections.
#[derive(Debug, Clone)]
pub struct StatementExecutor {
    descriptor: ConnectionDescriptor,
}

impl StatementExecutor {
    pub fn new(descriptor: ConnectionDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn descriptor(&self) -> &ConnectionDescriptor {
        &self.descriptor
    }

    /// Collect every column-bearing result set from a statement or batch.
    ///
    /// Result sets without column metadata (DML inside a batch, temp table
    /// population) never surface here; the TDS stream only announces
    /// metadata for sets that carry columns.
    async fn collect_sets(
        &self,
        client: &mut DbClient,
        sql: &str,
        params: &[&dyn ToSql],
    ) -> DbResult<Vec<ResultSet>> {
        let mut stream = if params.is_empty() {
            client.simple_query(sql).await?
        } else {
            client.query(sql, params).await?
        };

        let mut sets: Vec<ResultSet> = Vec::new();
        while let Some(item) = stream.try_next().await? {
            match item {
                QueryItem::Metadata(meta) => {
                    sets.push(ResultSet {
                        columns: meta
                            .columns()
                            .iter()
                            .map(|c| c.name().to_string())
                            .collect(),
                        rows: Vec::new(),
                    });
                }
                QueryItem::Row(row) => {
                    let mut rendered = Vec::with_capacity(row.len());
                    for (_, data) in row.cells() {
                        rendered.push(values::render(data)?);
                    }
                    if let Some(set) = sets.last_mut() {
                        set.rows.push(rendered);
                    }
                }
            }
        }
        Ok(sets)
    }

    /// Fetch the first column-bearing result set of a statement.
    pub async fn fetch(&self, sql: &str) -> DbResult<ResultSet> {
        let mut client = self.descriptor.open().await?;
        let sets = self.collect_sets(&mut client, sql, &[]).await?;
        Ok(sets.into_iter().next().unwrap_or_default())
    }

    /// Fetch with bound parameters (`@P1`, `@P2`, ...).
    pub async fn fetch_with_params(&self, sql: &str, params: &[&dyn ToSql]) -> DbResult<ResultSet> {
        let mut client = self.descriptor.open().await?;
        let sets = self.collect_sets(&mut client, sql, params).await?;
        Ok(sets.into_iter().next().unwrap_or_default())
    }

    /// Run a read statement and format the result.
    pub async fn run_read(&self, sql: &str) -> DbResult<String> {
        let set = self.fetch(sql).await?;
        if set.is_empty() {
            Ok(NO_RESULTS.to_string())
        } else {
            Ok(set.to_csv())
        }
    }

    /// Run a write or DDL statement inside an explicit transaction and
    /// report the per-class status.
    pub async fn run_write(&self, sql: &str, class: StatementClass) -> DbResult<String> {
        let mut client = self.descriptor.open().await?;

        client.simple_query("BEGIN TRAN").await?.into_results().await?;

        let outcome = self.run_in_transaction(&mut client, sql, class).await;

        match outcome {
            Ok(status) => {
                client
                    .simple_query("COMMIT TRAN")
                    .await?
                    .into_results()
                    .await?;
                debug!(class = %class, "statement committed");
                Ok(status)
            }
            Err(err) => {
                self.rollback(&mut client).await;
                Err(err)
            }
        }
    }

    async fn run_in_transaction(
        &self,
        client: &mut DbClient,
        sql: &str,
        class: StatementClass,
    ) -> DbResult<String> {
        match class {
            StatementClass::Write => {
                let result = client.execute(sql, &[]).await?;
                Ok(rows_affected_status(result.total()))
            }
            StatementClass::Execute => {
                client.execute(sql, &[]).await?;
                Ok(EXEC_STATUS.to_string())
            }
            _ => {
                client.simple_query(sql).await?.into_results().await?;
                Ok(ddl_status(class))
            }
        }
    }

    /// Best-effort rollback. The connection drops right after, so a failed
    /// rollback only costs a log line.
    async fn rollback(&self, client: &mut DbClient) {
        let result = client.simple_query("IF @@TRANCOUNT > 0 ROLLBACK TRAN").await;
        match result {
            Ok(stream) => {
                if let Err(e) = stream.into_results().await {
                    warn!(error = %e, "rollback failed");
                }
            }
            Err(e) => warn!(error = %e, "rollback failed"),
        }
    }

    /// Execute a stored procedure with positional parameters and return
    /// the first column-bearing result set, if the procedure produced one.
    pub async fn exec_procedure(
        &self,
        name: &str,
        params: &[String],
    ) -> DbResult<Option<ResultSet>> {
        let placeholders: Vec<String> = (1..=params.len()).map(|i| format!("@P{}", i)).collect();
        let sql = if placeholders.is_empty() {
            format!("EXEC {}", quote_ident(name))
        } else {
            format!("EXEC {} {}", quote_ident(name), placeholders.join(", "))
        };

        let mut client = self.descriptor.open().await?;
        let refs: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();

        client.simple_query("BEGIN TRAN").await?.into_results().await?;
        let outcome = self.collect_sets(&mut client, &sql, &refs).await;

        match outcome {
            Ok(sets) => {
                client
                    .simple_query("COMMIT TRAN")
                    .await?
                    .into_results()
                    .await?;
                Ok(sets.into_iter().next())
            }
            Err(err) => {
                self.rollback(&mut client).await;
                Err(err)
            }
        }
    }
}

/// Status sentence for EXEC/EXECUTE through `query.write`. The affected
/// count of a procedure body is not meaningful to report, so the sentence
/// is fixed.
pub const EXEC_STATUS: &str = "Stored procedure executed successfully.";

/// Rows-affected status for DML through `query.write`.
pub fn rows_affected_status(rows: u64) -> String {
    format!("Query executed successfully. {} rows affected.", rows)
}

/// Status sentence for a committed DDL statement.
pub fn ddl_status(class: StatementClass) -> String {
    match class {
        StatementClass::DdlProcedure => {
            "Stored procedure operation executed successfully.".to_string()
        }
        StatementClass::DdlView => "View operation executed successfully.".to_string(),
        StatementClass::DdlIndex => "Index operation executed successfully.".to_string(),
        StatementClass::DdlTable => "Table created successfully".to_string(),
        StatementClass::DdlFunction => "Function created/modified successfully".to_string(),
        // Read/Write/Execute never reach here
        _ => "Statement executed successfully.".to_string(),
    }
}
