//! MCP (Model Context Protocol) Server
//!
//! Manual JSON-RPC 2.0 over stdio, line-based: one request per line in, one
//! response per line out. No MCP-specific crates; `serde_json` carries the
//! frames and `anyhow` carries loop-boundary errors.
//!
//! # Design
//!
//! Every tool is one row in a dispatch table pairing its wire description
//! with a handler of uniform shape `fn(&McpServer, &Value) -> Result<String>`.
//! `tools/list` and `tools/call` are both derived from the same table, so a
//! tool cannot be listed without being callable or vice versa.
//!
//! Tool invocations are independent and stateless apart from the read-only
//! registry; rejected queries and execution failures come back as ordinary
//! text results, not protocol errors.
//!
//! # Usage
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "conflux": {
//!       "command": "conflux",
//!       "args": ["--db-path", "/data/sales.db", "--db-name", "sales"]
//!     }
//!   }
//! }
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};

use crate::driver::Driver;
use crate::executor::Executor;
use crate::registry::Registry;
use crate::{help, schema, validate};

// ============================================================================
// JSON-RPC 2.0 Structures
// ============================================================================

/// JSON-RPC 2.0 Request
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 Error
#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

/// Text content block for MCP tool results
#[derive(Debug, Serialize)]
struct TextContent {
    #[serde(rename = "type")]
    content_type: String,
    text: String,
}

/// MCP tool call result
#[derive(Debug, Serialize)]
struct CallToolResult {
    content: Vec<TextContent>,
    #[serde(rename = "isError")]
    is_error: bool,
}

impl CallToolResult {
    fn text(text: String) -> Result<Value> {
        let result = Self {
            content: vec![TextContent { content_type: "text".to_string(), text }],
            is_error: false,
        };
        Ok(serde_json::to_value(result)?)
    }
}

// ============================================================================
// Tool Dispatch Table
// ============================================================================

type ToolHandler = fn(&McpServer, &Value) -> Result<String>;

struct ToolDef {
    name: &'static str,
    description: &'static str,
    input_schema: fn() -> Value,
    handler: ToolHandler,
}

static TOOLS: &[ToolDef] = &[
    ToolDef {
        name: "list_databases",
        description: "List all registered databases with their paths, descriptions, and \
                      table counts. The first database is the default: unqualified table \
                      references resolve against it.",
        input_schema: empty_schema,
        handler: tool_list_databases,
    },
    ToolDef {
        name: "get_schema",
        description: "Describe one database: tables, columns, primary and foreign keys, \
                      row counts, and optionally a few sample rows per table. Omit \
                      'database' for the default database.",
        input_schema: get_schema_schema,
        handler: tool_get_schema,
    },
    ToolDef {
        name: "query_data",
        description: "Execute a SQL statement. Reference tables as \
                      [<database>].[<table>]; references to non-default databases are \
                      rewritten to the engine's external-table form automatically. The \
                      statement is validated first and rejected without execution when \
                      it lacks a registered database prefix or uses unsupported dialect \
                      constructs (LIMIT, CAST, quoted ISO dates, True/False, CASE).",
        input_schema: query_schema,
        handler: tool_query_data,
    },
    ToolDef {
        name: "validate_query_syntax",
        description: "Statically check a SQL statement against the dialect rules without \
                      executing it. Returns pass/fail, every error and warning found, and \
                      a quick-reference block.",
        input_schema: sql_schema,
        handler: tool_validate_query_syntax,
    },
    ToolDef {
        name: "test_cross_db_connectivity",
        description: "Check connectivity to every registered database, then run a live \
                      rewrite-and-execute smoke test across the first two reachable \
                      databases.",
        input_schema: empty_schema,
        handler: tool_test_cross_db_connectivity,
    },
    ToolDef {
        name: "get_help",
        description: "Static help text: the addressing convention, dialect notes, and the \
                      available tools.",
        input_schema: empty_schema,
        handler: tool_get_help,
    },
];

fn empty_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

fn sql_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "sql": {
                "type": "string",
                "description": "SQL statement using [<database>].[<table>] references"
            }
        },
        "required": ["sql"]
    })
}

fn query_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "sql": {
                "type": "string",
                "description": "SQL statement using [<database>].[<table>] references"
            },
            "timeout_ms": {
                "type": "number",
                "description": "Busy timeout in milliseconds applied at connection open"
            }
        },
        "required": ["sql"]
    })
}

fn get_schema_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "database": {
                "type": "string",
                "description": "Registered database key (default database if omitted)"
            },
            "format": {
                "type": "string",
                "enum": ["text", "json"],
                "description": "Output format (default: text)"
            },
            "include_samples": {
                "type": "boolean",
                "description": "Include a few sample rows per table (default: false)"
            }
        }
    })
}

// ============================================================================
// MCP Server
// ============================================================================

/// The server: an immutable registry plus the driver, shared by every tool
pub struct McpServer {
    registry: Registry,
    driver: Box<dyn Driver>,
}

impl McpServer {
    /// Create a server over a fully constructed registry
    #[must_use]
    pub fn new(registry: Registry, driver: Box<dyn Driver>) -> Self {
        Self { registry, driver }
    }

    /// Run the serve loop: read JSON-RPC requests from stdin, write
    /// responses to stdout, until stdin closes.
    ///
    /// # Errors
    ///
    /// Returns an error only when stdio itself fails; tool failures are
    /// encoded in responses.
    #[allow(clippy::future_not_send)]
    pub async fn serve(&self) -> Result<()> {
        let stdin = io::stdin();
        let reader = stdin.lock();
        let mut stdout = io::stdout();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_str(&line) {
                Ok(req) => req,
                Err(e) => {
                    let response = JsonRpcResponse {
                        jsonrpc: "2.0".to_string(),
                        id: None,
                        result: None,
                        error: Some(JsonRpcError {
                            code: -32700,
                            message: format!("Parse error: {e}"),
                            data: None,
                        }),
                    };
                    writeln!(stdout, "{}", serde_json::to_string(&response)?)?;
                    stdout.flush()?;
                    continue;
                }
            };

            // Notifications carry no id and expect no response.
            if request.id.is_none() && request.method.starts_with("notifications/") {
                continue;
            }

            let response = self.handle_request(request);
            writeln!(stdout, "{}", serde_json::to_string(&response)?)?;
            stdout.flush()?;
        }

        Ok(())
    }

    fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        tracing::debug!(method = %request.method, "handling request");

        let result = match request.method.as_str() {
            "initialize" => handle_initialize(),
            "tools/list" => handle_list_tools(),
            "tools/call" => self.handle_call_tool(request.params.as_ref()),
            _ => Err(anyhow!("Unknown method: {}", request.method)),
        };

        match result {
            Ok(value) => JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id: request.id,
                result: Some(value),
                error: None,
            },
            Err(e) => JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id: request.id,
                result: None,
                error: Some(JsonRpcError { code: -32603, message: e.to_string(), data: None }),
            },
        }
    }

    fn handle_call_tool(&self, params: Option<&Value>) -> Result<Value> {
        let params = params.ok_or_else(|| anyhow!("Missing params"))?;
        let name = params["name"].as_str().ok_or_else(|| anyhow!("Missing tool name"))?;
        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        let tool = TOOLS
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| anyhow!("Unknown tool: {name}"))?;

        let text = (tool.handler)(self, &arguments)?;
        CallToolResult::text(text)
    }
}

fn handle_initialize() -> Result<Value> {
    Ok(json!({
        "protocolVersion": "2024-11-05",
        "capabilities": {
            "tools": {}
        },
        "serverInfo": {
            "name": "conflux",
            "version": env!("CARGO_PKG_VERSION")
        }
    }))
}

fn handle_list_tools() -> Result<Value> {
    let tools: Vec<Value> = TOOLS
        .iter()
        .map(|t| {
            json!({
                "name": t.name,
                "description": t.description,
                "inputSchema": (t.input_schema)(),
            })
        })
        .collect();
    Ok(json!({ "tools": tools }))
}

// ============================================================================
// Tool Implementations
// ============================================================================

fn tool_list_databases(server: &McpServer, _args: &Value) -> Result<String> {
    let registry = &server.registry;
    if registry.is_empty() {
        return Ok("No databases registered".to_string());
    }

    let mut lines = vec![format!("Available Databases ({}):", registry.len()), "-".repeat(40)];

    for entry in registry.all() {
        let default_marker =
            if Some(entry.key.as_str()) == registry.primary_key() { " (default)" } else { "" };
        lines.push(format!("* {}{default_marker}", entry.key));
        lines.push(format!("  Path: {}", entry.path.display()));
        lines.push(format!("  Description: {}", entry.description));

        match server.driver.connect(&entry.path, None).and_then(|c| c.tables()) {
            Ok(tables) => lines.push(format!("  Tables: {}", tables.len())),
            Err(e) => lines.push(format!("  Status: Error - {}", e.message())),
        }
        lines.push(String::new());
    }

    Ok(lines.join("\n"))
}

fn tool_get_schema(server: &McpServer, args: &Value) -> Result<String> {
    let database = args.get("database").and_then(Value::as_str);
    let format = args.get("format").and_then(Value::as_str).unwrap_or("text");
    let include_samples =
        args.get("include_samples").and_then(Value::as_bool).unwrap_or(false);

    let described =
        match schema::describe(&server.registry, server.driver.as_ref(), database, include_samples)
        {
            Ok(described) => described,
            // Unknown-database is a caller mistake, reported as result text.
            Err(e) => return Ok(e.message()),
        };

    match format.to_lowercase().as_str() {
        "json" => Ok(schema::render_json(&described).map_err(|e| anyhow!(e.message()))?),
        _ => Ok(schema::render_text(&described)),
    }
}

fn tool_query_data(server: &McpServer, args: &Value) -> Result<String> {
    let sql = args["sql"].as_str().ok_or_else(|| anyhow!("Missing required field: sql"))?;

    let mut executor = Executor::new(&server.registry, server.driver.as_ref());
    if let Some(timeout_ms) = args.get("timeout_ms").and_then(Value::as_u64) {
        executor = executor.with_timeout(timeout_ms);
    }

    Ok(executor.run_to_text(sql))
}

fn tool_validate_query_syntax(server: &McpServer, args: &Value) -> Result<String> {
    let sql = args["sql"].as_str().ok_or_else(|| anyhow!("Missing required field: sql"))?;
    let report = validate::validate(sql, &server.registry);

    let mut lines = Vec::new();
    if report.passed() {
        lines.push(format!("Validation passed ({} warnings)", report.warnings.len()));
    } else {
        lines.push(format!(
            "Validation FAILED ({} errors, {} warnings)",
            report.errors.len(),
            report.warnings.len()
        ));
    }

    if !report.errors.is_empty() {
        lines.push("Errors:".to_string());
        for (i, finding) in report.errors.iter().enumerate() {
            lines.push(format!("  {}. [{}] {}", i + 1, finding.category, finding.message));
        }
    }
    if !report.warnings.is_empty() {
        lines.push("Warnings:".to_string());
        for (i, finding) in report.warnings.iter().enumerate() {
            lines.push(format!("  {}. [{}] {}", i + 1, finding.category, finding.message));
        }
    }

    lines.push(String::new());
    lines.push(help::quick_reference().to_string());

    Ok(lines.join("\n"))
}

fn tool_test_cross_db_connectivity(server: &McpServer, _args: &Value) -> Result<String> {
    let registry = &server.registry;
    let mut lines = vec!["Connectivity:".to_string()];

    // (key, first table) for each database that answers a catalog call.
    let mut reachable: Vec<(String, Option<String>)> = Vec::new();

    for entry in registry.all() {
        match server.driver.connect(&entry.path, None).and_then(|c| c.tables()) {
            Ok(tables) => {
                lines.push(format!("  {}: OK ({} tables)", entry.key, tables.len()));
                reachable.push((entry.key.clone(), tables.first().cloned()));
            }
            Err(e) => lines.push(format!("  {}: FAILED - {}", entry.key, e.message())),
        }
    }

    lines.push(String::new());

    // Smoke test: one statement spanning the first two reachable databases,
    // run through the full validate -> rewrite -> execute pipeline.
    let candidates: Vec<(&str, &str)> = reachable
        .iter()
        .filter_map(|(key, table)| table.as_deref().map(|t| (key.as_str(), t)))
        .take(2)
        .collect();

    if let [(key_a, table_a), (key_b, table_b)] = candidates.as_slice() {
        let smoke = format!(
            "SELECT COUNT(*) AS [RowPairs] FROM [{key_a}].[{table_a}], [{key_b}].[{table_b}]"
        );
        lines.push(format!("Smoke test query: {smoke}"));
        let executor = Executor::new(registry, server.driver.as_ref());
        lines.push(executor.run_to_text(&smoke));
    } else {
        lines.push(
            "Smoke test skipped: needs two reachable databases with at least one table each"
                .to_string(),
        );
    }

    Ok(lines.join("\n"))
}

fn tool_get_help(_server: &McpServer, _args: &Value) -> Result<String> {
    Ok(help::help_text().to_string())
}
