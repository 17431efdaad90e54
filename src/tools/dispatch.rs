//! Operation dispatch.
//!
//! Every tool call reduces to a `(tool, action)` pair with string-keyed
//! parameters. A static table defines the known operations, the parameters
//! each requires, and the statement classes each accepts. Dispatch
//! validates against the table before any connection is opened, so caller
//! mistakes never cost a network round trip.

use std::collections::HashMap;

use serde_json::Value as JsonValue;
use tracing::info;

use crate::db::{classify, StatementClass, StatementExecutor};
use crate::error::{DbError, DbResult};
use crate::tools;

/// Slow-query report defaults: top 20 queries at or above one second of
/// average elapsed time.
pub const DEFAULT_SLOW_QUERY_LIMIT: u32 = 20;
pub const DEFAULT_SLOW_QUERY_MIN_ELAPSED_MS: u32 = 1000;

/// Failed-login scan default window, in minutes.
pub const DEFAULT_FAILED_LOGIN_WINDOW_MINUTES: u32 = 120;

/// Fragmentation percentage below which an index is not reported.
pub const DEFAULT_MIN_FRAGMENTATION: f64 = 10.0;

/// One entry of the operation table.
struct OperationDef {
    tool: &'static str,
    action: &'static str,
    /// Parameter names that must be present and non-empty.
    required: &'static [&'static str],
    /// Statement classes accepted for the `sql` parameter, when the
    /// operation takes one.
    allowed: Option<&'static [StatementClass]>,
    /// Exact statement prefixes accepted, when the operation is stricter
    /// than its class (e.g. `table.create` takes CREATE TABLE only).
    prefixes: Option<&'static [&'static str]>,
}

const OPERATIONS: &[OperationDef] = &[
    OperationDef {
        tool: "query",
        action: "read",
        required: &["sql"],
        allowed: Some(&[StatementClass::Read]),
        prefixes: None,
    },
    OperationDef {
        tool: "query",
        action: "write",
        required: &["sql"],
        // Table DDL is excluded on purpose; table.create is the only door
        // for CREATE TABLE.
        allowed: Some(&[
            StatementClass::Write,
            StatementClass::DdlProcedure,
            StatementClass::DdlView,
            StatementClass::DdlIndex,
            StatementClass::Execute,
        ]),
        prefixes: None,
    },
    OperationDef {
        tool: "table",
        action: "list",
        required: &[],
        allowed: None,
        prefixes: None,
    },
    OperationDef {
        tool: "table",
        action: "describe",
        required: &["table_name"],
        allowed: None,
        prefixes: None,
    },
    OperationDef {
        tool: "table",
        action: "create",
        required: &["sql"],
        allowed: Some(&[StatementClass::DdlTable]),
        prefixes: Some(&["CREATE TABLE"]),
    },
    OperationDef {
        tool: "table",
        action: "size",
        required: &["table_name"],
        allowed: None,
        prefixes: None,
    },
    OperationDef {
        tool: "view",
        action: "list",
        required: &[],
        allowed: None,
        prefixes: None,
    },
    OperationDef {
        tool: "view",
        action: "describe",
        required: &["view_name"],
        allowed: None,
        prefixes: None,
    },
    OperationDef {
        tool: "view",
        action: "create",
        required: &["sql"],
        allowed: Some(&[StatementClass::DdlView]),
        prefixes: Some(&["CREATE VIEW", "ALTER VIEW"]),
    },
    OperationDef {
        tool: "view",
        action: "drop",
        required: &["view_name"],
        allowed: None,
        prefixes: None,
    },
    OperationDef {
        tool: "procedure",
        action: "list",
        required: &[],
        allowed: None,
        prefixes: None,
    },
    OperationDef {
        tool: "procedure",
        action: "describe",
        required: &["procedure_name"],
        allowed: None,
        prefixes: None,
    },
    OperationDef {
        tool: "procedure",
        action: "create",
        required: &["sql"],
        allowed: Some(&[StatementClass::DdlProcedure]),
        prefixes: Some(&["CREATE PROCEDURE", "ALTER PROCEDURE"]),
    },
    OperationDef {
        tool: "procedure",
        action: "get_parameters",
        required: &["procedure_name"],
        allowed: None,
        prefixes: None,
    },
    OperationDef {
        tool: "procedure",
        action: "drop",
        required: &["procedure_name"],
        allowed: None,
        prefixes: None,
    },
    OperationDef {
        tool: "procedure",
        action: "execute",
        required: &["procedure_name"],
        allowed: None,
        prefixes: None,
    },
    OperationDef {
        tool: "function",
        action: "list",
        required: &[],
        allowed: None,
        prefixes: None,
    },
    OperationDef {
        tool: "function",
        action: "describe",
        required: &["function_name"],
        allowed: None,
        prefixes: None,
    },
    OperationDef {
        tool: "function",
        action: "create",
        required: &["sql"],
        allowed: Some(&[StatementClass::DdlFunction]),
        prefixes: Some(&["CREATE FUNCTION", "ALTER FUNCTION"]),
    },
    OperationDef {
        tool: "function",
        action: "drop",
        required: &["function_name"],
        allowed: None,
        prefixes: None,
    },
    OperationDef {
        tool: "function",
        action: "execute",
        required: &["function_call"],
        allowed: None,
        prefixes: None,
    },
    OperationDef {
        tool: "index",
        action: "list",
        required: &[],
        allowed: None,
        prefixes: None,
    },
    OperationDef {
        tool: "index",
        action: "describe",
        required: &["index_name", "table_name"],
        allowed: None,
        prefixes: None,
    },
    OperationDef {
        tool: "index",
        action: "create",
        required: &["sql"],
        allowed: Some(&[StatementClass::DdlIndex]),
        prefixes: Some(&["CREATE INDEX", "CREATE UNIQUE INDEX"]),
    },
    OperationDef {
        tool: "index",
        action: "drop",
        required: &["index_name", "table_name"],
        allowed: None,
        prefixes: None,
    },
    OperationDef {
        tool: "index_analysis",
        action: "unused",
        required: &[],
        allowed: None,
        prefixes: None,
    },
    OperationDef {
        tool: "index_analysis",
        action: "missing",
        required: &[],
        allowed: None,
        prefixes: None,
    },
    OperationDef {
        tool: "index_analysis",
        action: "fragmented",
        required: &[],
        allowed: None,
        prefixes: None,
    },
    OperationDef {
        tool: "index_analysis",
        action: "usage_stats",
        required: &[],
        allowed: None,
        prefixes: None,
    },
    OperationDef {
        tool: "schema",
        action: "list_schemas",
        required: &[],
        allowed: None,
        prefixes: None,
    },
    OperationDef {
        tool: "schema",
        action: "list_objects",
        required: &[],
        allowed: None,
        prefixes: None,
    },
    OperationDef {
        tool: "performance",
        action: "top_waits",
        required: &[],
        allowed: None,
        prefixes: None,
    },
    OperationDef {
        tool: "performance",
        action: "connection_stats",
        required: &[],
        allowed: None,
        prefixes: None,
    },
    OperationDef {
        tool: "performance",
        action: "blocking_sessions",
        required: &[],
        allowed: None,
        prefixes: None,
    },
    OperationDef {
        tool: "performance",
        action: "slow_queries",
        required: &[],
        allowed: None,
        prefixes: None,
    },
    OperationDef {
        tool: "performance",
        action: "failed_logins",
        required: &[],
        allowed: None,
        prefixes: None,
    },
    OperationDef {
        tool: "performance",
        action: "buffer_stats",
        required: &[],
        allowed: None,
        prefixes: None,
    },
];

/// A tool call flattened for dispatch: tool name, action, and the
/// parameters the MCP layer deserialized.
#[derive(Debug, Clone)]
pub struct OperationRequest {
    pub tool: String,
    pub action: String,
    pub params: HashMap<String, JsonValue>,
}

impl OperationRequest {
    pub fn new(tool: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            action: action.into(),
            params: HashMap::new(),
        }
    }

    pub fn with_param(mut self, name: &str, value: impl Into<JsonValue>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    /// String parameter, if present and non-null.
    pub fn str_param(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(|v| v.as_str())
    }

    /// String parameter that dispatch has already verified.
    fn required_str(&self, name: &str) -> DbResult<&str> {
        self.str_param(name)
            .ok_or_else(|| DbError::missing_parameter(name))
    }

    /// List-of-strings parameter (procedure execution arguments).
    pub fn list_param(&self, name: &str) -> Vec<String> {
        self.params
            .get(name)
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .map(|v| match v {
                        JsonValue::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn u32_param(&self, name: &str) -> Option<u32> {
        self.params
            .get(name)
            .and_then(|v| v.as_u64())
            .map(|n| n as u32)
    }

    pub fn f64_param(&self, name: &str) -> Option<f64> {
        self.params.get(name).and_then(|v| v.as_f64())
    }

    /// A required parameter counts as missing when absent, null, or an
    /// empty or whitespace-only string.
    fn has_param(&self, name: &str) -> bool {
        match self.params.get(name) {
            None | Some(JsonValue::Null) => false,
            Some(JsonValue::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        }
    }
}

/// Routes validated operation requests to their handlers.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    executor: StatementExecutor,
}

impl Dispatcher {
    pub fn new(executor: StatementExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &StatementExecutor {
        &self.executor
    }

    /// Validate a request against the operation table, then run it.
    pub async fn dispatch(&self, request: &OperationRequest) -> DbResult<String> {
        let def = OPERATIONS
            .iter()
            .find(|op| op.tool == request.tool && op.action == request.action)
            .ok_or_else(|| DbError::unknown_operation(&request.tool, &request.action))?;

        for name in def.required {
            if !request.has_param(name) {
                return Err(DbError::missing_parameter(*name));
            }
        }

        let sql_class = match def.allowed {
            Some(allowed) => {
                let sql = request.required_str("sql")?;
                let classified = classify(sql)?;
                let operation = format!("{}.{}", def.tool, def.action);

                if !allowed.contains(&classified.class) {
                    return Err(DbError::not_allowed(
                        operation,
                        classified.class.to_string(),
                        format!("statements starting with {} are not accepted here", classified.prefix),
                    ));
                }
                if let Some(prefixes) = def.prefixes {
                    if !prefixes.contains(&classified.prefix) {
                        return Err(DbError::not_allowed(
                            operation,
                            classified.class.to_string(),
                            format!("only {} statements are allowed", prefixes.join(" / ")),
                        ));
                    }
                }
                Some(classified.class)
            }
            None => None,
        };

        info!(tool = %request.tool, action = %request.action, "dispatching operation");
        self.run(request, sql_class).await
    }

    async fn run(
        &self,
        request: &OperationRequest,
        sql_class: Option<StatementClass>,
    ) -> DbResult<String> {
        let ex = &self.executor;
        match (request.tool.as_str(), request.action.as_str()) {
            ("query", "read") => tools::query::read(ex, request.required_str("sql")?).await,
            ("query", "write") => {
                // sql_class is always set for query.write
                let class = sql_class.ok_or_else(|| DbError::missing_parameter("sql"))?;
                tools::query::write(ex, request.required_str("sql")?, class).await
            }

            ("table", "list") => tools::table::list(ex).await,
            ("table", "describe") => {
                tools::table::describe(ex, request.required_str("table_name")?).await
            }
            ("table", "create") => tools::table::create(ex, request.required_str("sql")?).await,
            ("table", "size") => tools::table::size(ex, request.required_str("table_name")?).await,

            ("view", "list") => tools::view::list(ex).await,
            ("view", "describe") => {
                tools::view::describe(ex, request.required_str("view_name")?).await
            }
            ("view", "create") => tools::view::create(ex, request.required_str("sql")?).await,
            ("view", "drop") => tools::view::drop(ex, request.required_str("view_name")?).await,

            ("procedure", "list") => tools::procedure::list(ex).await,
            ("procedure", "get_parameters") => {
                tools::procedure::get_parameters(ex, request.required_str("procedure_name")?).await
            }
            ("procedure", "describe") => {
                tools::procedure::describe(ex, request.required_str("procedure_name")?).await
            }
            ("procedure", "create") => {
                tools::procedure::create(ex, request.required_str("sql")?).await
            }
            ("procedure", "drop") => {
                tools::procedure::drop(ex, request.required_str("procedure_name")?).await
            }
            ("procedure", "execute") => {
                let name = request.required_str("procedure_name")?;
                let params = request.list_param("parameters");
                tools::procedure::execute(ex, name, &params).await
            }

            ("function", "list") => tools::function::list(ex).await,
            ("function", "describe") => {
                tools::function::describe(ex, request.required_str("function_name")?).await
            }
            ("function", "create") => {
                tools::function::create(ex, request.required_str("sql")?).await
            }
            ("function", "drop") => {
                tools::function::drop(ex, request.required_str("function_name")?).await
            }
            ("function", "execute") => {
                tools::function::execute(ex, request.required_str("function_call")?).await
            }

            ("index", "list") => tools::index::list(ex, request.str_param("table_name")).await,
            ("index", "describe") => {
                tools::index::describe(
                    ex,
                    request.required_str("index_name")?,
                    request.required_str("table_name")?,
                )
                .await
            }
            ("index", "create") => tools::index::create(ex, request.required_str("sql")?).await,
            ("index", "drop") => {
                let index_name = request.required_str("index_name")?;
                let table_name = request.required_str("table_name")?;
                tools::index::drop(ex, index_name, table_name).await
            }

            ("index_analysis", "unused") => tools::index_analysis::unused(ex).await,
            ("index_analysis", "missing") => tools::index_analysis::missing(ex).await,
            ("index_analysis", "fragmented") => {
                let threshold = request
                    .f64_param("min_fragmentation")
                    .unwrap_or(DEFAULT_MIN_FRAGMENTATION);
                tools::index_analysis::fragmented(ex, threshold).await
            }
            ("index_analysis", "usage_stats") => tools::index_analysis::usage_stats(ex).await,

            ("schema", "list_schemas") => tools::schema::list_schemas(ex).await,
            ("schema", "list_objects") => {
                tools::schema::list_objects(ex, request.str_param("schema_name")).await
            }

            ("performance", "top_waits") => tools::performance::top_waits(ex).await,
            ("performance", "connection_stats") => tools::performance::connection_stats(ex).await,
            ("performance", "blocking_sessions") => {
                tools::performance::blocking_sessions(ex).await
            }
            ("performance", "slow_queries") => {
                let limit = request.u32_param("limit").unwrap_or(DEFAULT_SLOW_QUERY_LIMIT);
                let min_elapsed = request
                    .u32_param("min_elapsed_ms")
                    .unwrap_or(DEFAULT_SLOW_QUERY_MIN_ELAPSED_MS);
                tools::performance::slow_queries(ex, limit, min_elapsed).await
            }
            ("performance", "failed_logins") => {
                let minutes = request
                    .u32_param("time_period_minutes")
                    .unwrap_or(DEFAULT_FAILED_LOGIN_WINDOW_MINUTES);
                tools::performance::failed_logins(ex, minutes).await
            }
            ("performance", "buffer_stats") => tools::performance::buffer_stats(ex).await,

            // Unreachable: the table lookup above already rejected unknown pairs
            _ => Err(DbError::unknown_operation(&request.tool, &request.action)),
        }
    }
}
