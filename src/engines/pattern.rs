//! Heuristic pattern ranker.
//!
//! Scores tools by how query words line up with the tool's name parts and
//! searchable text. Points per signal:
//!
//! | signal                                              | points |
//! |-----------------------------------------------------|--------|
//! | whole query equals the tool name (`_`-joined)        | 100    |
//! | word equals a name part                             | 20     |
//! | name part contains the word                         | 10     |
//! | word contains a name part                           | 5      |
//! | each word-boundary match in the search text         | 3      |
//! | word is a substring of the search text              | 1      |
//! | description starts with the word                    | 5      |
//!
//! Only the strongest of the three name-part signals counts per word. The
//! total is divided by the number of query words.
//!
//! When no tool scores above zero the ranker returns the first `top_k` tools
//! in corpus order with a score of 0 instead of an empty list.

use crate::config::SearchEngineConfig;
use crate::engines::slot::IndexSlot;
use crate::engines::{rank_descending, run_blocking, Ranker, SearchMethod};
use crate::error::{AppError, Result};
use crate::ingestion::{SearchResult, ToolDefinition};
use async_trait::async_trait;
use regex::Regex;

const EXACT_NAME_BONUS: f64 = 100.0;
const NAME_PART_EXACT: f64 = 20.0;
const NAME_PART_CONTAINS_WORD: f64 = 10.0;
const WORD_CONTAINS_NAME_PART: f64 = 5.0;
const WORD_BOUNDARY_MATCH: f64 = 3.0;
const SUBSTRING_MATCH: f64 = 1.0;
const DESCRIPTION_PREFIX: f64 = 5.0;

struct PatternDocument {
    tool: ToolDefinition,
    name_lower: String,
    description_lower: String,
    search_text: String,
    name_parts: Vec<String>,
}

impl PatternDocument {
    fn new(tool: &ToolDefinition) -> Self {
        let mut text = vec![tool.spaced_name(), tool.name.clone(), tool.description.clone()];
        for (name, desc) in tool.parameters() {
            text.push(name.to_string());
            if let Some(desc) = desc {
                text.push(desc.to_string());
            }
        }

        let name_lower = tool.name.to_lowercase();
        let name_parts = name_lower
            .split(['_', '-'])
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            tool: tool.clone(),
            description_lower: tool.description.to_lowercase(),
            search_text: text.join(" ").to_lowercase(),
            name_parts,
            name_lower,
        }
    }
}

/// A query word with its precompiled word-boundary pattern.
struct QueryWord {
    word: String,
    boundary: Regex,
}

fn query_words(query: &str) -> Result<Vec<QueryWord>> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|word| word.chars().count() > 1)
        .map(|word| {
            let boundary = Regex::new(&format!(r"\b{}\b", regex::escape(word)))
                .map_err(|e| AppError::ValidationError(format!("Unusable query word '{word}': {e}")))?;
            Ok(QueryWord {
                word: word.to_string(),
                boundary,
            })
        })
        .collect()
}

fn score_document(doc: &PatternDocument, exact_name: &str, words: &[QueryWord]) -> f64 {
    let mut score = 0.0;

    if doc.name_lower == exact_name {
        score += EXACT_NAME_BONUS;
    }

    for QueryWord { word, boundary } in words {
        let word = word.as_str();
        if doc.name_parts.iter().any(|part| part == word) {
            score += NAME_PART_EXACT;
        } else if doc.name_parts.iter().any(|part| part.contains(word)) {
            score += NAME_PART_CONTAINS_WORD;
        } else if doc.name_parts.iter().any(|part| word.contains(part.as_str())) {
            score += WORD_CONTAINS_NAME_PART;
        }

        score += WORD_BOUNDARY_MATCH * boundary.find_iter(&doc.search_text).count() as f64;

        if doc.search_text.contains(word) {
            score += SUBSTRING_MATCH;
        }

        if doc.description_lower.starts_with(word) {
            score += DESCRIPTION_PREFIX;
        }
    }

    score / words.len().max(1) as f64
}

/// The query as a tool name: whitespace runs collapse into one `_`.
fn exact_name(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

fn rank(documents: &[PatternDocument], query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
    let words = query_words(query)?;
    let exact_name = exact_name(query);

    let mut scored: Vec<(usize, f64)> = documents
        .iter()
        .enumerate()
        .map(|(idx, doc)| (idx, score_document(doc, &exact_name, &words)))
        .filter(|(_, score)| *score > 0.0)
        .collect();

    if scored.is_empty() {
        tracing::debug!(top_k, "No pattern matches, returning corpus order");
        return Ok(documents
            .iter()
            .take(top_k)
            .map(|doc| SearchResult::from_tool(&doc.tool, 0.0))
            .collect());
    }

    rank_descending(&mut scored);
    tracing::debug!(words = words.len(), matched = scored.len(), top_k, "Pattern search");

    Ok(scored
        .into_iter()
        .take(top_k)
        .map(|(idx, score)| SearchResult::from_tool(&documents[idx].tool, score))
        .collect())
}

pub struct PatternRanker {
    slot: IndexSlot<Vec<PatternDocument>, ()>,
}

impl Default for PatternRanker {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternRanker {
    pub fn new() -> Self {
        Self {
            slot: IndexSlot::new(()),
        }
    }
}

#[async_trait]
impl Ranker for PatternRanker {
    fn method(&self) -> SearchMethod {
        SearchMethod::Pattern
    }

    async fn initialize(&self, tools: &[ToolDefinition], _config: &SearchEngineConfig) -> Result<()> {
        let writer = self.slot.begin_write().await;
        let tools_owned = tools.to_vec();
        let documents = run_blocking("pattern index build", move || {
            tools_owned
                .iter()
                .map(PatternDocument::new)
                .collect::<Vec<_>>()
        })
        .await?;
        let generation = writer.publish(documents, ());

        tracing::info!(tools = tools.len(), generation, "Pattern index built");
        Ok(())
    }

    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        let documents = self
            .slot
            .snapshot()
            .ok_or(AppError::NotInitialized(SearchMethod::Pattern))?;

        let query = query.to_string();
        run_blocking("pattern search", move || rank(&documents, &query, top_k)).await?
    }

    fn is_ready(&self) -> bool {
        self.slot.is_ready()
    }

    fn tool_count(&self) -> usize {
        self.slot.snapshot().map_or(0, |documents| documents.len())
    }

    fn generation(&self) -> u64 {
        self.slot.generation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<ToolDefinition> {
        vec![
            ToolDefinition::new("read_file", "Read a file from disk"),
            ToolDefinition::new("write_file", "Write content to a file"),
            ToolDefinition::new("list_directory", "List directory contents"),
        ]
    }

    async fn ready_ranker() -> PatternRanker {
        let ranker = PatternRanker::new();
        ranker
            .initialize(&corpus(), &SearchEngineConfig::default())
            .await
            .unwrap();
        ranker
    }

    #[tokio::test]
    async fn test_exact_name_ranks_first_with_bonus() {
        let ranker = ready_ranker().await;
        let results = ranker.search("list_directory", 3).await.unwrap();

        assert_eq!(results[0].name, "list_directory");
        assert!(results[0].score >= 100.0, "score was {}", results[0].score);
    }

    #[tokio::test]
    async fn test_spaced_query_matches_exact_name() {
        let ranker = ready_ranker().await;
        let results = ranker.search("read file", 3).await.unwrap();

        assert_eq!(results[0].name, "read_file");
        // Exact bonus plus name-part hits, halved for two words.
        assert!(results[0].score > 50.0);
    }

    #[tokio::test]
    async fn test_exact_name_tolerates_whitespace_runs() {
        let ranker = ready_ranker().await;
        for query in ["list  directory", "\tlist\tdirectory ", "LIST \n DIRECTORY"] {
            let results = ranker.search(query, 1).await.unwrap();
            assert_eq!(results[0].name, "list_directory", "query {query:?}");
            // Bonus of 100 plus name-part hits, halved for two words.
            assert!(results[0].score >= 50.0 + 20.0, "query {query:?}: {}", results[0].score);
        }
        assert_eq!(exact_name(" Read \t file "), "read_file");
    }

    #[test]
    fn test_scoring_breakdown() {
        let doc = PatternDocument::new(&ToolDefinition::new("read_file", "Read a file from disk"));
        let words = query_words("read").unwrap();

        // name part exact (20) + boundary matches in "read file read_file read a file from disk" (2 * 3)
        // + substring (1) + description prefix (5)
        assert_eq!(score_document(&doc, "read", &words), 32.0);
    }

    #[test]
    fn test_partial_name_part_signals() {
        let doc = PatternDocument::new(&ToolDefinition::new("get_forecast", "Weather outlook"));

        let contained = query_words("fore").unwrap();
        // part contains word (10) + substring (1); no boundary match for "fore"
        assert_eq!(score_document(&doc, "fore", &contained), 11.0);

        let containing = query_words("getter").unwrap();
        // word contains part "get" (5); "getter" appears nowhere in the text
        assert_eq!(score_document(&doc, "getter", &containing), 5.0);
    }

    #[tokio::test]
    async fn test_no_match_falls_back_to_corpus_order() {
        let ranker = ready_ranker().await;
        let results = ranker.search("quantum entanglement", 2).await.unwrap();

        let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["read_file", "write_file"]);
        assert!(results.iter().all(|r| r.score == 0.0));
    }

    #[tokio::test]
    async fn test_zero_scores_filtered_when_something_matches() {
        let ranker = ready_ranker().await;
        let results = ranker.search("directory", 3).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "list_directory");
    }

    #[tokio::test]
    async fn test_regex_metacharacters_are_literal() {
        let ranker = ready_ranker().await;
        let results = ranker.search("file.* (", 3).await.unwrap();
        assert!(results.len() <= 3);
    }

    #[tokio::test]
    async fn test_empty_corpus_returns_empty() {
        let ranker = PatternRanker::new();
        ranker
            .initialize(&[], &SearchEngineConfig::default())
            .await
            .unwrap();
        assert!(ranker.search("anything", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_before_initialize_fails() {
        let ranker = PatternRanker::new();
        assert!(matches!(
            ranker.search("read", 1).await,
            Err(AppError::NotInitialized(SearchMethod::Pattern))
        ));
    }
}
