//! # Evalyze Core
//!
//! Core library for Evalyze, a reviewer for LLM benchmark results.
//! Decodes uploaded result files, normalizes them into run summaries or
//! per-question record streams, aggregates repeated runs, and answers
//! filter/sort/page queries over the result.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod normalize;
pub mod parser;
pub mod query;
pub mod session;
pub mod types;

// Re-export commonly used types at the crate root.
pub use aggregate::{AggregatedQuestion, AggregationResult, RunStream, StreamSummary, aggregate};
pub use config::{AnalyzerConfig, DisplayConfig, LimitsConfig, load_config};
pub use error::{AnalyzerError, QueryError, Result};
pub use normalize::{Normalized, normalize};
pub use parser::{Artifact, ArtifactFormat, ParsedArtifact, parse};
pub use query::{
    FilterSummary, QueryItem, QueryPage, QueryParams, ScoreRange, SortKey, clamp_page, query,
};
pub use session::{Analysis, BatchReport, FileFailure, analyze};
pub use types::{
    DatasetEntry, DatasetResult, OutcomeRecord, QuestionId, RunSummary, TokenUsage,
};
