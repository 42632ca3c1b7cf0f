//! Tool catalog parsing.
//!
//! Turns the JSON a tool-providing server hands out into `ToolDefinition`
//! records. Three shapes are accepted:
//! - an MCP `list_tools` JSON-RPC response (`result.tools`)
//! - an object with a top-level `tools` array
//! - a bare array of tool objects

use crate::error::AppError;
use crate::ingestion::types::{InputSchema, ToolDefinition};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;

/// Result type for atomizer operations
pub type AtomizerResult<T> = std::result::Result<T, AppError>;

/// Parse a tool catalog into `ToolDefinition` records, preserving catalog order.
///
/// # Errors
/// Returns `AppError::AtomizerError` if no tools array can be found, or if
/// every entry in a non-empty array is malformed. Individual malformed tools
/// are logged and skipped (partial success model). A name seen twice keeps
/// its first definition.
pub fn atomize_tools(json: &Value) -> AtomizerResult<Vec<ToolDefinition>> {
    let tools_array = extract_tools_array(json)?;

    let mut results = Vec::with_capacity(tools_array.len());
    let mut seen: HashSet<String> = HashSet::with_capacity(tools_array.len());

    for (idx, tool_value) in tools_array.iter().enumerate() {
        match normalize_tool(tool_value) {
            Ok(tool) => {
                if !seen.insert(tool.name.clone()) {
                    tracing::warn!(index = idx, name = %tool.name, "Duplicate tool name, keeping first");
                    continue;
                }
                results.push(tool);
            }
            Err(e) => {
                tracing::warn!(index = idx, error = %e, "Skipping malformed tool definition");
            }
        }
    }

    if results.is_empty() && !tools_array.is_empty() {
        return Err(AppError::AtomizerError(
            "All tool definitions failed to parse".into(),
        ));
    }

    tracing::debug!(
        total = tools_array.len(),
        parsed = results.len(),
        "Tool atomization complete"
    );

    Ok(results)
}

/// Read and parse a tool catalog file.
pub fn load_tools_file(path: &Path) -> AtomizerResult<Vec<ToolDefinition>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        AppError::AtomizerError(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let json: Value = serde_json::from_str(&raw).map_err(|e| {
        AppError::AtomizerError(format!("Invalid JSON in {}: {}", path.display(), e))
    })?;

    let tools = atomize_tools(&json)?;
    tracing::info!(path = %path.display(), tools = tools.len(), "Tool catalog loaded");
    Ok(tools)
}

fn extract_tools_array(json: &Value) -> AtomizerResult<&Vec<Value>> {
    if let Some(array) = json.as_array() {
        return Ok(array);
    }

    json.get("result")
        .and_then(|r| r.get("tools"))
        .or_else(|| json.get("tools"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            AppError::AtomizerError(
                "Expected 'result.tools', 'tools' or a top-level array of tools".into(),
            )
        })
}

fn normalize_tool(tool_value: &Value) -> AtomizerResult<ToolDefinition> {
    let name = tool_value
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| {
            AppError::AtomizerError(format!(
                "Tool missing required 'name' field: {:?}",
                tool_value.get("name")
            ))
        })?;

    let description = tool_value
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("");

    let schema = tool_value
        .get("inputSchema")
        .or_else(|| tool_value.get("input_schema"));

    Ok(ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: normalize_schema(schema),
    })
}

/// Lenient schema extraction: anything that is not an object with object
/// `properties` yields an empty schema rather than rejecting the tool.
fn normalize_schema(schema: Option<&Value>) -> InputSchema {
    let Some(schema) = schema else {
        return InputSchema::default();
    };

    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_else(Map::new);

    let required = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    InputSchema {
        schema_type: schema
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("object")
            .to_string(),
        properties,
        required,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_atomize_valid_mcp_response() {
        let response = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {
                "tools": [{
                    "name": "calculate_sum",
                    "description": "Add two numbers.",
                    "inputSchema": {
                        "type": "object",
                        "properties": {
                            "a": { "type": "number", "description": "First number" },
                            "b": { "type": "number" }
                        },
                        "required": ["a", "b"]
                    }
                }]
            }
        });

        let tools = atomize_tools(&response).unwrap();

        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "calculate_sum");
        assert_eq!(tools[0].description, "Add two numbers.");
        assert!(tools[0].is_required("a"));
        assert!(tools[0].is_required("b"));
        assert_eq!(tools[0].parameter_names().count(), 2);
    }

    #[test]
    fn test_atomize_bare_array_and_tools_object() {
        let array = json!([{ "name": "a" }, { "name": "b" }]);
        assert_eq!(atomize_tools(&array).unwrap().len(), 2);

        let object = json!({ "tools": [{ "name": "a", "input_schema": { "properties": {} } }] });
        assert_eq!(atomize_tools(&object).unwrap().len(), 1);
    }

    #[test]
    fn test_atomize_missing_result_returns_error() {
        let response = json!({ "jsonrpc": "2.0" });
        assert!(matches!(
            atomize_tools(&response),
            Err(AppError::AtomizerError(_))
        ));
    }

    #[test]
    fn test_atomize_null_description_uses_empty() {
        let response = json!({
            "result": {
                "tools": [{
                    "name": "no_desc_tool",
                    "description": null,
                    "inputSchema": {}
                }]
            }
        });

        let tools = atomize_tools(&response).unwrap();
        assert_eq!(tools[0].description, "");
    }

    #[test]
    fn test_atomize_missing_name_skips_tool() {
        let response = json!({
            "result": {
                "tools": [
                    { "description": "No name here" },
                    { "name": "valid_tool", "description": "Has name" }
                ]
            }
        });

        let tools = atomize_tools(&response).unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "valid_tool");
    }

    #[test]
    fn test_all_malformed_is_an_error() {
        let response = json!({ "tools": [{ "description": "x" }, { "name": "" }] });
        assert!(atomize_tools(&response).is_err());
    }

    #[test]
    fn test_duplicate_names_keep_first() {
        let response = json!([
            { "name": "dup", "description": "first" },
            { "name": "dup", "description": "second" }
        ]);

        let tools = atomize_tools(&response).unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].description, "first");
    }

    #[test]
    fn test_empty_tools_array_returns_empty_vec() {
        let response = json!({ "result": { "tools": [] } });
        let tools = atomize_tools(&response).unwrap();
        assert!(tools.is_empty());
    }

    #[test]
    fn test_non_object_properties_yield_empty_schema() {
        let response = json!([{
            "name": "odd_tool",
            "inputSchema": { "properties": ["not", "an", "object"], "required": "path" }
        }]);

        let tools = atomize_tools(&response).unwrap();
        assert_eq!(tools[0].parameter_names().count(), 0);
        assert!(tools[0].input_schema.required.is_empty());
    }

    #[test]
    fn test_load_tools_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.json");
        std::fs::write(
            &path,
            json!({ "tools": [{ "name": "read_file", "description": "Read a file" }] }).to_string(),
        )
        .unwrap();

        let tools = load_tools_file(&path).unwrap();
        assert_eq!(tools[0].name, "read_file");

        let missing = load_tools_file(&dir.path().join("missing.json"));
        assert!(matches!(missing, Err(AppError::AtomizerError(_))));
    }
}
