//! BM25 lexical ranker.
//!
//! Each tool becomes one bag-of-words document built from its name (spaced
//! and literal), description, parameter names and parameter descriptions.
//! Scoring is classic Okapi BM25 with the `+1` IDF variant, which keeps IDF
//! positive even for terms present in every document.

use crate::config::{Bm25Params, SearchEngineConfig};
use crate::engines::slot::IndexSlot;
use crate::engines::{rank_descending, run_blocking, Ranker, SearchMethod};
use crate::error::{AppError, Result};
use crate::ingestion::{SearchResult, ToolDefinition};
use async_trait::async_trait;
use std::collections::HashMap;

/// Average length used when the corpus has no tokens at all.
const FALLBACK_AVG_DOC_LEN: f64 = 1.0;

struct Bm25Document {
    tool: ToolDefinition,
    term_freq: HashMap<String, usize>,
    length: usize,
}

struct Bm25Index {
    documents: Vec<Bm25Document>,
    idf: HashMap<String, f64>,
    avg_doc_len: f64,
    params: Bm25Params,
}

impl Bm25Index {
    fn build(tools: &[ToolDefinition], params: Bm25Params) -> Self {
        let documents: Vec<Bm25Document> = tools
            .iter()
            .map(|tool| {
                let tokens = tokenize(&document_text(tool));
                let mut term_freq: HashMap<String, usize> = HashMap::new();
                for token in &tokens {
                    *term_freq.entry(token.clone()).or_insert(0) += 1;
                }
                Bm25Document {
                    tool: tool.clone(),
                    term_freq,
                    length: tokens.len(),
                }
            })
            .collect();

        let n = documents.len();
        let total_len: usize = documents.iter().map(|d| d.length).sum();
        let avg_doc_len = if n == 0 || total_len == 0 {
            FALLBACK_AVG_DOC_LEN
        } else {
            total_len as f64 / n as f64
        };

        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        for doc in &documents {
            for term in doc.term_freq.keys() {
                *doc_freq.entry(term.as_str()).or_insert(0) += 1;
            }
        }
        let idf = doc_freq
            .into_iter()
            .map(|(term, df)| (term.to_string(), inverse_document_frequency(n, df)))
            .collect();

        Self {
            documents,
            idf,
            avg_doc_len,
            params,
        }
    }

    fn score(&self, doc: &Bm25Document, query_terms: &[String]) -> f64 {
        query_terms
            .iter()
            .map(|term| {
                let tf = doc.term_freq.get(term).copied().unwrap_or(0);
                if tf == 0 {
                    return 0.0;
                }
                let idf = self.idf.get(term).copied().unwrap_or(0.0);
                term_score(
                    idf,
                    tf as f64,
                    doc.length as f64,
                    self.avg_doc_len,
                    self.params,
                )
            })
            .sum()
    }

    fn rank(&self, query: &str, top_k: usize) -> Vec<SearchResult> {
        let query_terms = tokenize(query);
        let mut scored: Vec<(usize, f64)> = self
            .documents
            .iter()
            .enumerate()
            .map(|(idx, doc)| (idx, self.score(doc, &query_terms)))
            .collect();
        rank_descending(&mut scored);

        tracing::debug!(terms = query_terms.len(), top_k, "BM25 search");

        scored
            .into_iter()
            .take(top_k)
            .map(|(idx, score)| SearchResult::from_tool(&self.documents[idx].tool, score))
            .collect()
    }
}

/// `ln((N - df + 0.5) / (df + 0.5) + 1)`
pub fn inverse_document_frequency(n: usize, df: usize) -> f64 {
    let (n, df) = (n as f64, df as f64);
    ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
}

/// Contribution of one query term to a document's score.
pub fn term_score(idf: f64, tf: f64, doc_len: f64, avg_doc_len: f64, params: Bm25Params) -> f64 {
    let numerator = tf * (params.k1 + 1.0);
    let denominator = tf + params.k1 * (1.0 - params.b + params.b * doc_len / avg_doc_len);
    idf * numerator / denominator
}

/// Lowercase, turn `_` and `-` into spaces, delete remaining punctuation,
/// split on whitespace and drop single-character tokens.
///
/// Punctuation is removed rather than split on, so `file's` becomes `files`
/// and `v2.0` becomes `v20`.
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            '_' | '-' => Some(' '),
            c if c.is_alphanumeric() || c.is_whitespace() => Some(c),
            _ => None,
        })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|token| token.chars().count() > 1)
        .map(str::to_string)
        .collect()
}

fn document_text(tool: &ToolDefinition) -> String {
    let mut parts = vec![tool.spaced_name(), tool.name.clone(), tool.description.clone()];
    for (name, desc) in tool.parameters() {
        parts.push(name.to_string());
        if let Some(desc) = desc {
            parts.push(desc.to_string());
        }
    }
    parts.join(" ")
}

fn validate_k1(k1: f64) -> Result<()> {
    if !k1.is_finite() || k1 < 0.0 {
        return Err(AppError::ValidationError(format!(
            "bm25.k1 must be a non-negative number, got {k1}"
        )));
    }
    Ok(())
}

fn validate_b(b: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&b) {
        return Err(AppError::ValidationError(format!(
            "bm25.b must be within [0, 1], got {b}"
        )));
    }
    Ok(())
}

fn validate(params: &Bm25Params) -> Result<()> {
    validate_k1(params.k1)?;
    validate_b(params.b)
}

pub struct Bm25Ranker {
    slot: IndexSlot<Bm25Index, Bm25Params>,
}

impl Default for Bm25Ranker {
    fn default() -> Self {
        Self::new(Bm25Params::default())
    }
}

impl Bm25Ranker {
    pub fn new(params: Bm25Params) -> Self {
        Self {
            slot: IndexSlot::new(params),
        }
    }

    /// Parameters of the published index.
    pub async fn params(&self) -> Bm25Params {
        self.slot.settings().await
    }
}

#[async_trait]
impl Ranker for Bm25Ranker {
    fn method(&self) -> SearchMethod {
        SearchMethod::Bm25
    }

    fn validate_config(&self, config: &SearchEngineConfig) -> Result<()> {
        if let Some(overrides) = &config.bm25 {
            if let Some(k1) = overrides.k1 {
                validate_k1(k1)?;
            }
            if let Some(b) = overrides.b {
                validate_b(b)?;
            }
        }
        Ok(())
    }

    async fn initialize(&self, tools: &[ToolDefinition], config: &SearchEngineConfig) -> Result<()> {
        let writer = self.slot.begin_write().await;

        let mut params = *writer.settings();
        if let Some(overrides) = &config.bm25 {
            params.apply(overrides);
        }
        validate(&params)?;

        let start = std::time::Instant::now();
        let tools_owned = tools.to_vec();
        let index =
            run_blocking("BM25 index build", move || Bm25Index::build(&tools_owned, params)).await?;
        let vocabulary = index.idf.len();
        let avg_doc_len = index.avg_doc_len;
        let generation = writer.publish(index, params);

        tracing::info!(
            tools = tools.len(),
            vocabulary,
            avg_doc_len,
            k1 = params.k1,
            b = params.b,
            generation,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "BM25 index built"
        );
        Ok(())
    }

    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        let index = self
            .slot
            .snapshot()
            .ok_or(AppError::NotInitialized(SearchMethod::Bm25))?;

        let query = query.to_string();
        run_blocking("BM25 search", move || index.rank(&query, top_k)).await
    }

    fn is_ready(&self) -> bool {
        self.slot.is_ready()
    }

    fn tool_count(&self) -> usize {
        self.slot.snapshot().map_or(0, |index| index.documents.len())
    }

    fn generation(&self) -> u64 {
        self.slot.generation()
    }
}
