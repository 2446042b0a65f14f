//! Core data models used throughout docq.
//!
//! These types represent the extraction outcomes, chunks, and retrieval
//! results that flow through the ingestion and question-answering pipeline.

use uuid::Uuid;

/// Result of running a single extraction strategy against one file.
///
/// Strategies never propagate errors; everything that goes wrong inside a
/// strategy collapses into [`StrategyOutcome::Failed`] with the reason kept
/// for diagnostics. Whitespace-only output counts as [`StrategyOutcome::NoText`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyOutcome {
    /// Usable text was extracted (non-empty after trimming).
    Text(String),
    /// The strategy ran cleanly but found no text.
    NoText,
    /// The strategy hit an internal error (parse failure, missing tool, ...).
    Failed(String),
}

/// Final verdict of the extraction cascade for one document.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// Input path as given to the cascade.
    pub path: String,
    /// Extracted text; empty when every strategy was exhausted.
    pub text: String,
    /// Name of the strategy that produced the text, if any.
    pub strategy: Option<&'static str>,
    /// Why extraction failed, when it did (failure-log line reason).
    pub reason: Option<String>,
}

impl ExtractionResult {
    pub fn succeeded(&self) -> bool {
        self.strategy.is_some()
    }
}

/// A chunk of a document's extracted text, the unit of retrieval.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    /// Source document identity (the text artifact's file name).
    pub source: String,
    /// Position of this chunk within its document, in split order.
    pub ordinal: usize,
    /// Trimmed chunk text, at least `min_chunk_len` characters.
    pub text: String,
}

impl Chunk {
    pub fn new(source: &str, ordinal: usize, text: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source: source.to_string(),
            ordinal,
            text,
        }
    }
}

/// A single nearest-neighbor hit after response-shape normalization.
///
/// `score` is `None` only when the backend omitted the field (or sent JSON
/// null); a similarity of exactly `0.0` is reported as `Some(0.0)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalHit {
    pub text: String,
    pub source: String,
    pub score: Option<f64>,
}

/// A retrieved source reference shown alongside an answer.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRef {
    pub source: String,
    pub score: Option<f64>,
}

/// The query resolver's result: generated answer plus its grounding.
#[derive(Debug, Clone)]
pub struct Answer {
    pub answer: String,
    /// Retrieved snippets in rank order, as numbered into the prompt.
    pub context: Vec<String>,
    pub sources: Vec<SourceRef>,
}
