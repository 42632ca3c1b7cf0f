//! Text serialization of tool definitions for embedding.
//!
//! The chosen strategy trades token cost against how much of the schema the
//! embedding model gets to see. Output is a pure function of the tool and the
//! strategy, so re-embedding an unchanged corpus produces identical inputs.

use crate::ingestion::ToolDefinition;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Formatting strategy, listed in increasing verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingFormat {
    /// Description only.
    Minimal,
    /// `read file: Read a file from disk`
    Standard,
    /// Spaced and literal name, description, parameter names.
    #[default]
    Rich,
    /// As `Rich`, with parameter descriptions inlined.
    Verbose,
    /// Labeled multi-line block, required parameters marked with `*`.
    Structured,
}

impl EmbeddingFormat {
    pub const ALL: [EmbeddingFormat; 5] = [
        EmbeddingFormat::Minimal,
        EmbeddingFormat::Standard,
        EmbeddingFormat::Rich,
        EmbeddingFormat::Verbose,
        EmbeddingFormat::Structured,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingFormat::Minimal => "minimal",
            EmbeddingFormat::Standard => "standard",
            EmbeddingFormat::Rich => "rich",
            EmbeddingFormat::Verbose => "verbose",
            EmbeddingFormat::Structured => "structured",
        }
    }
}

impl fmt::Display for EmbeddingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmbeddingFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == wanted)
            .ok_or_else(|| format!("unknown embedding format '{}'", s.trim()))
    }
}

/// Serialize `tool` according to `format`.
pub fn format_tool(tool: &ToolDefinition, format: EmbeddingFormat) -> String {
    match format {
        EmbeddingFormat::Minimal => tool.description.clone(),
        EmbeddingFormat::Standard => format!("{}: {}", tool.spaced_name(), tool.description),
        EmbeddingFormat::Rich => {
            let names: Vec<&str> = tool.parameter_names().collect();
            with_parameters(headline(tool), &names)
        }
        EmbeddingFormat::Verbose => {
            let params: Vec<String> = tool
                .parameters()
                .map(|(name, desc)| match desc {
                    Some(desc) => format!("{name}: {desc}"),
                    None => name.to_string(),
                })
                .collect();
            with_parameters(headline(tool), &params)
        }
        EmbeddingFormat::Structured => structured(tool),
    }
}

/// Rough token count (four characters per token, rounded up).
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

fn headline(tool: &ToolDefinition) -> String {
    format!("{} ({}): {}", tool.spaced_name(), tool.name, tool.description)
}

fn with_parameters<S: AsRef<str>>(mut text: String, params: &[S]) -> String {
    if !params.is_empty() {
        let joined: Vec<&str> = params.iter().map(AsRef::as_ref).collect();
        text.push_str(" Parameters: ");
        text.push_str(&joined.join(", "));
    }
    text
}

fn structured(tool: &ToolDefinition) -> String {
    let mut out = format!("Tool: {}\nDescription: {}\n", tool.name, tool.description);

    let mut params = tool.parameters().peekable();
    if params.peek().is_none() {
        out.push_str("Parameters: none");
        return out;
    }

    out.push_str("Parameters:");
    for (name, desc) in params {
        let marker = if tool.is_required(name) { "*" } else { "" };
        out.push_str("\n  ");
        out.push_str(marker);
        out.push_str(name);
        if let Some(desc) = desc {
            out.push_str(": ");
            out.push_str(desc);
        }
    }
    out
}
