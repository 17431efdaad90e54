//! MCP service implementation using rmcp.
//!
//! Each tool takes an `action` selector plus the parameters that action
//! needs; validation and routing happen in the dispatcher. Handler errors
//! are folded into the tool result as `Error: {message}` text so a failed
//! call never aborts the protocol session.

use crate::db::{ConnectionDescriptor, ResultSet, StatementExecutor, quote_ident};
use crate::error::DbError;
use crate::tools::{Dispatcher, OperationRequest};
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{
        AnnotateAble, CallToolResult, Content, Implementation, ListResourcesResult,
        PaginatedRequestParam, ProtocolVersion, RawResource, ReadResourceRequestParam,
        ReadResourceResult, ResourceContents, ServerCapabilities, ServerInfo,
    },
    schemars::JsonSchema,
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::warn;

const RESOURCE_SCHEME: &str = "mssql://";
const RESOURCE_SUFFIX: &str = "/data";

/// Base tables and views, tables first, each readable through a resource URI.
const RESOURCE_OBJECTS_SQL: &str = "SELECT TABLE_NAME, TABLE_TYPE \
     FROM INFORMATION_SCHEMA.TABLES \
     WHERE TABLE_TYPE IN ('BASE TABLE', 'VIEW') \
     ORDER BY TABLE_TYPE, TABLE_NAME";

/// Payload returned when the URI itself is valid but the object is empty.
const EMPTY_RESOURCE_TEXT: &str = "No data found";

/// Display name and description for one listed resource.
fn resource_labels(name: &str, table_type: &str) -> (String, String) {
    if table_type == "VIEW" {
        (
            format!("View: {}", name),
            format!("Data from {} view", name),
        )
    } else {
        (
            format!("Table: {}", name),
            format!("Data from {} table", name),
        )
    }
}

fn resource_text(set: &ResultSet) -> String {
    if set.is_empty() {
        EMPTY_RESOURCE_TEXT.to_string()
    } else {
        set.to_csv()
    }
}

/// Input for the query tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct QueryToolInput {
    /// Action to perform: "read" or "write"
    pub action: String,
    /// SQL statement to execute
    pub sql: Option<String>,
}

/// Input for the table tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct TableToolInput {
    /// Action to perform: "list", "describe", "create", or "size"
    pub action: String,
    /// CREATE TABLE statement (for "create")
    pub sql: Option<String>,
    /// Table name (for "describe" and "size")
    pub table_name: Option<String>,
}

/// Input for the view tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ViewToolInput {
    /// Action to perform: "list", "describe", "create", or "drop"
    pub action: String,
    /// CREATE VIEW or ALTER VIEW statement (for "create")
    pub sql: Option<String>,
    /// View name (for "describe" and "drop")
    pub view_name: Option<String>,
}

/// Input for the procedure tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ProcedureToolInput {
    /// Action to perform: "list", "describe", "get_parameters", "create",
    /// "drop", or "execute"
    pub action: String,
    /// CREATE PROCEDURE or ALTER PROCEDURE statement (for "create")
    pub sql: Option<String>,
    /// Procedure name (for "describe", "get_parameters", "drop", and "execute")
    pub procedure_name: Option<String>,
    /// Positional arguments passed to the procedure (for "execute")
    pub parameters: Option<Vec<JsonValue>>,
}

/// Input for the function tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct FunctionToolInput {
    /// Action to perform: "list", "describe", "create", "drop", or "execute"
    pub action: String,
    /// CREATE FUNCTION or ALTER FUNCTION statement (for "create")
    pub sql: Option<String>,
    /// Function name (for "describe" and "drop")
    pub function_name: Option<String>,
    /// Complete invocation such as "dbo.fn_total(42)" (for "execute")
    pub function_call: Option<String>,
}

/// Input for the index tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct IndexToolInput {
    /// Action to perform: "list", "describe", "create", or "drop"
    pub action: String,
    /// CREATE INDEX or CREATE UNIQUE INDEX statement (for "create")
    pub sql: Option<String>,
    /// Index name (for "describe" and "drop")
    pub index_name: Option<String>,
    /// Table name (required for "describe" and "drop", optional filter for "list")
    pub table_name: Option<String>,
}

/// Input for the index_analysis tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct IndexAnalysisToolInput {
    /// Action to perform: "unused", "missing", "fragmented", or "usage_stats"
    pub action: String,
    /// Minimum fragmentation percentage to report (for "fragmented", default 10)
    pub min_fragmentation: Option<f64>,
}

/// Input for the schema tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SchemaToolInput {
    /// Action to perform: "list_schemas" or "list_objects"
    pub action: String,
    /// Restrict object listing to one schema (for "list_objects")
    pub schema_name: Option<String>,
}

/// Input for the performance tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct PerformanceToolInput {
    /// Action to perform: "top_waits", "connection_stats", "blocking_sessions",
    /// "slow_queries", "failed_logins", or "buffer_stats"
    pub action: String,
    /// Maximum queries to return (for "slow_queries", default 20)
    pub limit: Option<u32>,
    /// Average elapsed time threshold in milliseconds (for "slow_queries", default 1000)
    pub min_elapsed_ms: Option<u32>,
    /// How far back to scan the error log in minutes (for "failed_logins", default 120)
    pub time_period_minutes: Option<u32>,
}

#[derive(Clone)]
pub struct DbService {
    /// Shared dispatcher; each call opens its own connection
    dispatcher: Arc<Dispatcher>,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl DbService {
    pub fn new(descriptor: ConnectionDescriptor) -> Self {
        Self {
            dispatcher: Arc::new(Dispatcher::new(StatementExecutor::new(descriptor))),
            tool_router: Self::tool_router(),
        }
    }

    /// Run one operation and fold the outcome into a tool result. Errors
    /// come back as `Error: {message}` text with the error flag set.
    async fn run(&self, request: OperationRequest) -> CallToolResult {
        match self.dispatcher.dispatch(&request).await {
            Ok(text) => CallToolResult::success(vec![Content::text(text)]),
            Err(e) => CallToolResult::error(vec![Content::text(format!("Error: {}", e))]),
        }
    }

    /// Extract the table name from a `mssql://{table}/data` resource URI.
    fn resource_table(uri: &str) -> Option<&str> {
        let table = uri
            .strip_prefix(RESOURCE_SCHEME)?
            .strip_suffix(RESOURCE_SUFFIX)?;
        if table.is_empty() || table.contains('/') {
            None
        } else {
            Some(table)
        }
    }
}

fn opt_param(request: OperationRequest, name: &str, value: Option<impl Into<JsonValue>>) -> OperationRequest {
    match value {
        Some(v) => request.with_param(name, v),
        None => request,
    }
}

#[tool_router]
impl DbService {
    #[tool(
        description = "Run SQL against the database.\nActions: \"read\" executes a SELECT and returns CSV rows; \"write\" executes INSERT/UPDATE/DELETE, EXEC, or procedure/view/index DDL inside a transaction.\nTable DDL must go through the table tool."
    )]
    async fn query(
        &self,
        Parameters(input): Parameters<QueryToolInput>,
    ) -> Result<CallToolResult, McpError> {
        let request = opt_param(
            OperationRequest::new("query", input.action),
            "sql",
            input.sql,
        );
        Ok(self.run(request).await)
    }

    #[tool(
        description = "Inspect and create tables.\nActions: \"list\" all base tables, \"describe\" a table's columns, \"create\" via a CREATE TABLE statement, \"size\" for row count and storage."
    )]
    async fn table(
        &self,
        Parameters(input): Parameters<TableToolInput>,
    ) -> Result<CallToolResult, McpError> {
        let request = OperationRequest::new("table", input.action);
        let request = opt_param(request, "sql", input.sql);
        let request = opt_param(request, "table_name", input.table_name);
        Ok(self.run(request).await)
    }

    #[tool(
        description = "Manage views.\nActions: \"list\" all views, \"describe\" a view's definition, \"create\" via CREATE VIEW or ALTER VIEW, \"drop\" a view by name."
    )]
    async fn view(
        &self,
        Parameters(input): Parameters<ViewToolInput>,
    ) -> Result<CallToolResult, McpError> {
        let request = OperationRequest::new("view", input.action);
        let request = opt_param(request, "sql", input.sql);
        let request = opt_param(request, "view_name", input.view_name);
        Ok(self.run(request).await)
    }

    #[tool(
        description = "Manage stored procedures.\nActions: \"list\" user procedures, \"describe\" a procedure's definition, \"get_parameters\" for its parameter signature, \"create\" via CREATE/ALTER PROCEDURE, \"drop\" by name, \"execute\" with optional positional parameters."
    )]
    async fn procedure(
        &self,
        Parameters(input): Parameters<ProcedureToolInput>,
    ) -> Result<CallToolResult, McpError> {
        let request = OperationRequest::new("procedure", input.action);
        let request = opt_param(request, "sql", input.sql);
        let request = opt_param(request, "procedure_name", input.procedure_name);
        let request = opt_param(request, "parameters", input.parameters);
        Ok(self.run(request).await)
    }

    #[tool(
        description = "Manage user-defined functions.\nActions: \"list\" user functions, \"describe\" a function's definition, \"create\" via CREATE/ALTER FUNCTION, \"drop\" by name, \"execute\" a scalar invocation such as dbo.fn_total(42)."
    )]
    async fn function(
        &self,
        Parameters(input): Parameters<FunctionToolInput>,
    ) -> Result<CallToolResult, McpError> {
        let request = OperationRequest::new("function", input.action);
        let request = opt_param(request, "sql", input.sql);
        let request = opt_param(request, "function_name", input.function_name);
        let request = opt_param(request, "function_call", input.function_call);
        Ok(self.run(request).await)
    }

    #[tool(
        description = "Manage indexes.\nActions: \"list\" indexes (optionally for one table), \"describe\" one index by index and table name, \"create\" via CREATE INDEX or CREATE UNIQUE INDEX, \"drop\" by index and table name."
    )]
    async fn index(
        &self,
        Parameters(input): Parameters<IndexToolInput>,
    ) -> Result<CallToolResult, McpError> {
        let request = OperationRequest::new("index", input.action);
        let request = opt_param(request, "sql", input.sql);
        let request = opt_param(request, "index_name", input.index_name);
        let request = opt_param(request, "table_name", input.table_name);
        Ok(self.run(request).await)
    }

    #[tool(
        description = "Analyze index health from the DMVs.\nActions: \"unused\" indexes with no reads, \"missing\" index suggestions, \"fragmented\" indexes above a threshold, \"usage_stats\" per-index seek/scan/update counts."
    )]
    async fn index_analysis(
        &self,
        Parameters(input): Parameters<IndexAnalysisToolInput>,
    ) -> Result<CallToolResult, McpError> {
        let request = OperationRequest::new("index_analysis", input.action);
        let request = opt_param(request, "min_fragmentation", input.min_fragmentation);
        Ok(self.run(request).await)
    }

    #[tool(
        description = "Browse database schemas.\nActions: \"list_schemas\" for all schemas, \"list_objects\" for tables/views/procedures/functions, optionally scoped to one schema."
    )]
    async fn schema(
        &self,
        Parameters(input): Parameters<SchemaToolInput>,
    ) -> Result<CallToolResult, McpError> {
        let request = OperationRequest::new("schema", input.action);
        let request = opt_param(request, "schema_name", input.schema_name);
        Ok(self.run(request).await)
    }

    #[tool(
        description = "Server performance diagnostics.\nActions: \"top_waits\", \"connection_stats\", \"blocking_sessions\", \"slow_queries\" (limit, min_elapsed_ms), \"failed_logins\" (time_period_minutes), \"buffer_stats\"."
    )]
    async fn performance(
        &self,
        Parameters(input): Parameters<PerformanceToolInput>,
    ) -> Result<CallToolResult, McpError> {
        let request = OperationRequest::new("performance", input.action);
        let request = opt_param(request, "limit", input.limit);
        let request = opt_param(request, "min_elapsed_ms", input.min_elapsed_ms);
        let request = opt_param(request, "time_period_minutes", input.time_period_minutes);
        Ok(self.run(request).await)
    }
}

#[tool_handler]
impl ServerHandler for DbService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: "mssql-mcp-server".to_owned(),
                title: Some("MSSQL MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Tools for administering a Microsoft SQL Server database.\n\
                \n\
                ## Workflow\n\
                1. Call `table` with action \"list\" (or `schema` with \"list_objects\") to discover objects\n\
                2. Read data with `query` action \"read\"\n\
                3. Modify data with `query` action \"write\"; create tables through `table` action \"create\"\n\
                \n\
                ## Statement Routing\n\
                - `query.read` accepts SELECT only\n\
                - `query.write` accepts INSERT/UPDATE/DELETE, EXEC, and procedure/view/index DDL\n\
                - CREATE TABLE must go through `table` action \"create\"\n\
                \n\
                ## Resources\n\
                Each base table and view is exposed as `mssql://{name}/data` returning up to 100 rows as CSV.\n\
                \n\
                Failed operations return text starting with `Error:`; the session stays usable."
                    .to_string(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        // Listing failures degrade to an empty resource list so clients
        // that enumerate resources at startup do not see a hard error.
        let set = match self.dispatcher.executor().fetch(RESOURCE_OBJECTS_SQL).await {
            Ok(set) => set,
            Err(e) => {
                warn!(error = %e, "failed to enumerate tables and views for resources");
                ResultSet {
                    columns: Vec::new(),
                    rows: Vec::new(),
                }
            }
        };

        let resources = set
            .rows
            .iter()
            .filter_map(|row| {
                let name = row.first().cloned().flatten()?;
                let table_type = row.get(1).cloned().flatten()?;
                let (label, description) = resource_labels(&name, &table_type);
                Some(
                    RawResource {
                        uri: format!("{}{}{}", RESOURCE_SCHEME, name, RESOURCE_SUFFIX),
                        name: label,
                        title: None,
                        description: Some(description),
                        mime_type: Some("text/csv".to_string()),
                        size: None,
                        icons: None,
                        meta: None,
                    }
                    .no_annotation(),
                )
            })
            .collect();

        Ok(ListResourcesResult {
            meta: None,
            resources,
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        let table = Self::resource_table(&request.uri)
            .ok_or_else(|| McpError::from(DbError::resource_not_found(&request.uri)))?;

        let sql = format!(
            "SELECT TOP {} * FROM {}",
            crate::db::RESOURCE_ROW_CAP,
            quote_ident(table)
        );
        let set = self
            .dispatcher
            .executor()
            .fetch(&sql)
            .await
            .map_err(McpError::from)?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::TextResourceContents {
                uri: request.uri.clone(),
                mime_type: Some("text/csv".to_string()),
                text: resource_text(&set),
                meta: None,
            }],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_descriptor() -> ConnectionDescriptor {
        ConnectionDescriptor {
            host: "localhost".to_string(),
            port: 1433,
            database: "testdb".to_string(),
            user: Some("sa".to_string()),
            password: Some("secret".to_string()),
            trusted_connection: false,
            trust_cert: true,
            app_name: "mssql-mcp-server".to_string(),
        }
    }

    #[test]
    fn test_service_creation() {
        let _service = DbService::new(test_descriptor());
    }

    #[test]
    fn test_server_info_enables_tools_and_resources() {
        let service = DbService::new(test_descriptor());
        let info = service.get_info();
        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.resources.is_some());
    }

    #[test]
    fn test_resource_uri_parsing() {
        assert_eq!(DbService::resource_table("mssql://Users/data"), Some("Users"));
        assert_eq!(DbService::resource_table("mssql:///data"), None);
        assert_eq!(DbService::resource_table("mssql://Users"), None);
        assert_eq!(DbService::resource_table("mssql://a/b/data"), None);
        assert_eq!(DbService::resource_table("file://Users/data"), None);
    }

    #[test]
    fn test_resource_labels_distinguish_views() {
        let (name, description) = resource_labels("Users", "BASE TABLE");
        assert_eq!(name, "Table: Users");
        assert_eq!(description, "Data from Users table");

        let (name, description) = resource_labels("ActiveUsers", "VIEW");
        assert_eq!(name, "View: ActiveUsers");
        assert_eq!(description, "Data from ActiveUsers view");
    }

    #[test]
    fn test_resource_listing_includes_views() {
        assert!(RESOURCE_OBJECTS_SQL.contains("'BASE TABLE'"));
        assert!(RESOURCE_OBJECTS_SQL.contains("'VIEW'"));
        assert!(RESOURCE_OBJECTS_SQL.contains("ORDER BY TABLE_TYPE, TABLE_NAME"));
    }

    #[test]
    fn test_empty_resource_reports_no_data() {
        let empty = ResultSet {
            columns: vec!["id".to_string(), "name".to_string()],
            rows: Vec::new(),
        };
        assert_eq!(resource_text(&empty), "No data found");

        let populated = ResultSet {
            columns: vec!["id".to_string()],
            rows: vec![vec![Some("1".to_string())]],
        };
        assert_eq!(resource_text(&populated), "id\n1");
    }

    #[tokio::test]
    async fn test_tool_method_folds_errors_into_result() {
        let service = DbService::new(test_descriptor());
        let result = service
            .query(Parameters(QueryToolInput {
                action: "upsert".to_string(),
                sql: None,
            }))
            .await;
        let result = result.unwrap();
        assert_eq!(result.is_error, Some(true));
    }

    #[tokio::test]
    async fn test_unknown_action_reports_error_text() {
        let service = DbService::new(test_descriptor());
        let result = service
            .run(OperationRequest::new("query", "upsert"))
            .await;
        assert_eq!(result.is_error, Some(true));
    }

    #[tokio::test]
    async fn test_missing_sql_reports_error_text() {
        let service = DbService::new(test_descriptor());
        let result = service.run(OperationRequest::new("query", "read")).await;
        assert_eq!(result.is_error, Some(true));
    }
}
