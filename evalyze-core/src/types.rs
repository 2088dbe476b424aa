//! Result data model shared by the normalizer, aggregator and query engine.
//!
//! Every value here is built fresh from uploaded artifacts and treated as
//! read-only afterwards. Queries borrow these values; they never mutate them.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// Identifier of one evaluation item.
///
/// Integer ids order before textual ids; within a kind the natural order
/// applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum QuestionId {
    Number(i64),
    Text(String),
}

impl Default for QuestionId {
    fn default() -> Self {
        Self::Number(0)
    }
}

impl From<i64> for QuestionId {
    fn from(id: i64) -> Self {
        Self::Number(id)
    }
}

impl From<&str> for QuestionId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

impl From<&Value> for QuestionId {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::default(),
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().and_then(integral))
                .map(Self::Number)
                .unwrap_or_else(|| Self::Text(n.to_string())),
            Value::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }
}

/// `1.0` names the same question as `1`.
fn integral(f: f64) -> Option<i64> {
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.fract() == 0.0 && in_range).then_some(f as i64)
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Token counts reported for one model answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl TokenUsage {
    pub fn is_empty(&self) -> bool {
        self.prompt.is_none() && self.completion.is_none() && self.total.is_none()
    }
}

/// One model-produced answer to one evaluation item.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutcomeRecord {
    pub question_id: QuestionId,
    #[serde(rename = "question")]
    pub question_text: String,
    pub correct_answer: String,
    pub model_output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_answer: Option<String>,
    pub is_correct: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
    /// Index of the originating file; set only by the aggregator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_run: Option<usize>,
    /// Fields of the source item that the model does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OutcomeRecord {
    pub fn new(question_id: impl Into<QuestionId>, is_correct: bool) -> Self {
        Self {
            question_id: question_id.into(),
            is_correct,
            ..Self::default()
        }
    }

    pub fn with_question(mut self, question: &str, correct_answer: &str) -> Self {
        self.question_text = question.to_string();
        self.correct_answer = correct_answer.to_string();
        self
    }

    pub fn with_total_tokens(mut self, total: u64) -> Self {
        let usage = self.token_usage.get_or_insert_with(TokenUsage::default);
        usage.total = Some(total);
        self
    }

    pub fn total_tokens(&self) -> Option<u64> {
        self.token_usage.and_then(|u| u.total)
    }
}

/// Summary statistics for one dataset file under one run configuration.
///
/// `accuracy_mean` and `accuracy_std` are on a 0–1 scale and are carried
/// through exactly as the evaluation tool reported them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatasetResult {
    pub dataset_path: String,
    pub file_name: String,
    pub accuracy_mean: f64,
    pub accuracy_std: f64,
    pub run_accuracies: Vec<f64>,
}

impl DatasetResult {
    /// Last path component of `file_name`.
    pub fn display_name(&self) -> &str {
        self.file_name
            .rsplit('/')
            .next()
            .unwrap_or(self.file_name.as_str())
    }

    pub fn accuracy_percent(&self) -> f64 {
        self.accuracy_mean * 100.0
    }

    pub fn std_percent(&self) -> f64 {
        self.accuracy_std * 100.0
    }

    pub fn repetition_count(&self) -> usize {
        self.run_accuracies.len()
    }

    /// Mean of the per-repetition accuracies, if any were recorded.
    pub fn run_mean(&self) -> Option<f64> {
        if self.run_accuracies.is_empty() {
            return None;
        }
        Some(self.run_accuracies.iter().sum::<f64>() / self.run_accuracies.len() as f64)
    }
}

/// All results recorded for one dataset path.
///
/// An entry with no results means the evaluation ran for this dataset but
/// produced nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatasetEntry {
    pub dataset_path: String,
    /// Percentage reported by the evaluation tool, 0 when absent.
    pub average_accuracy: f64,
    pub results: Vec<DatasetResult>,
}

/// Top-level structured evaluation result.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub timestamp: String,
    pub duration_seconds: f64,
    /// Opaque configuration tree as written by the evaluation tool.
    pub config: Value,
    /// Dataset entries in document order.
    pub dataset_results: Vec<DatasetEntry>,
}

impl RunSummary {
    /// `config.model.name`, when present.
    pub fn model_name(&self) -> Option<&str> {
        self.config.pointer("/model/name").and_then(Value::as_str)
    }

    /// `config.evaluation.repeat_runs`, defaulting to 1.
    pub fn repeat_runs(&self) -> u64 {
        self.config
            .pointer("/evaluation/repeat_runs")
            .and_then(Value::as_u64)
            .unwrap_or(1)
    }

    /// Every dataset result, flattened in dataset order.
    pub fn results(&self) -> impl Iterator<Item = &DatasetResult> {
        self.dataset_results.iter().flat_map(|d| d.results.iter())
    }

    pub fn has_results(&self) -> bool {
        self.results().next().is_some()
    }

    pub fn dataset(&self, path: &str) -> Option<&DatasetEntry> {
        self.dataset_results.iter().find(|d| d.dataset_path == path)
    }
}
