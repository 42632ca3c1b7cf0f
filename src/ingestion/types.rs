//! Type definitions for the tool corpus.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn default_schema_type() -> String {
    "object".to_string()
}

/// Parameter schema of a tool.
///
/// `properties` maps parameter names to opaque JSON schema fragments. Only the
/// optional `description` string inside each fragment is ever read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(rename = "type", default = "default_schema_type")]
    pub schema_type: String,

    #[serde(default)]
    pub properties: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl Default for InputSchema {
    fn default() -> Self {
        Self {
            schema_type: default_schema_type(),
            properties: Map::new(),
            required: Vec::new(),
        }
    }
}

/// A callable tool as indexed by every ranker.
///
/// Immutable once loaded: a corpus generation is replaced wholesale, never
/// edited in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool identifier (e.g. `read_file`)
    pub name: String,

    /// Free-text description, empty when the source omitted it
    #[serde(default)]
    pub description: String,

    #[serde(default, alias = "inputSchema")]
    pub input_schema: InputSchema,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: InputSchema::default(),
        }
    }

    /// Adds a parameter to the schema. Used by loaders and tests.
    pub fn with_parameter(
        mut self,
        name: impl Into<String>,
        description: Option<&str>,
        required: bool,
    ) -> Self {
        let name = name.into();
        let mut fragment = Map::new();
        fragment.insert("type".to_string(), Value::String("string".to_string()));
        if let Some(desc) = description {
            fragment.insert("description".to_string(), Value::String(desc.to_string()));
        }
        if required {
            self.input_schema.required.push(name.clone());
        }
        self.input_schema
            .properties
            .insert(name, Value::Object(fragment));
        self
    }

    /// Name with underscores replaced by spaces (`read_file` -> `read file`).
    pub fn spaced_name(&self) -> String {
        self.name.replace('_', " ")
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.input_schema.properties.keys().map(String::as_str)
    }

    /// `(name, description)` for every parameter, in schema order.
    pub fn parameters(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.input_schema.properties.iter().map(|(name, fragment)| {
            let desc = fragment
                .get("description")
                .and_then(Value::as_str)
                .filter(|d| !d.is_empty());
            (name.as_str(), desc)
        })
    }

    pub fn is_required(&self, parameter: &str) -> bool {
        self.input_schema.required.iter().any(|r| r == parameter)
    }
}

/// One ranked tool in a search response.
///
/// `score` is backend-specific: BM25 scores, cosine similarities and pattern
/// points are not comparable with each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub name: String,
    pub description: String,
    pub score: f64,
}

impl SearchResult {
    pub fn from_tool(tool: &ToolDefinition, score: f64) -> Self {
        Self {
            name: tool.name.clone(),
            description: tool.description.clone(),
            score,
        }
    }
}
