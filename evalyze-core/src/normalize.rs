//! Normalizer: resolves a decoded document into one of the known result shapes.
//!
//! The shape is decided once here. Downstream code works with typed
//! [`RunSummary`] and [`OutcomeRecord`] values and never re-inspects raw JSON.

use serde_json::{Map, Value};

use crate::types::{DatasetEntry, DatasetResult, OutcomeRecord, QuestionId, RunSummary, TokenUsage};

const DATASET_RESULTS_KEY: &str = "dataset_results";

/// Outcome of normalizing one decoded document.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// A structured summary of one evaluation campaign.
    RunSummary(RunSummary),
    /// Per-item outcomes from one evaluation execution.
    RecordStream(Vec<OutcomeRecord>),
    /// Neither known shape; returned untouched for the caller to reject.
    Unrecognized(Value),
}

impl Normalized {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RunSummary(_) => "run_summary",
            Self::RecordStream(_) => "record_stream",
            Self::Unrecognized(_) => "unrecognized",
        }
    }
}

/// Normalize a decoded document. Never fails: unknown shapes come back as
/// [`Normalized::Unrecognized`].
pub fn normalize(parsed: Value) -> Normalized {
    if let Some(map) = parsed.as_object() {
        if let Some(summary) = run_summary_from(map) {
            return Normalized::RunSummary(summary);
        }
        return Normalized::Unrecognized(parsed);
    }

    match parsed {
        Value::Array(items) => records_from(items),
        other => Normalized::Unrecognized(other),
    }
}

fn run_summary_from(map: &Map<String, Value>) -> Option<RunSummary> {
    let datasets = map.get(DATASET_RESULTS_KEY)?.as_object()?;

    let dataset_results = datasets
        .iter()
        .map(|(path, info)| dataset_entry_from(path, info))
        .collect();

    Some(RunSummary {
        timestamp: map.get("timestamp").map(text_of).unwrap_or_default(),
        duration_seconds: number_of(map.get("duration_seconds")),
        config: map
            .get("config")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new())),
        dataset_results,
    })
}

fn dataset_entry_from(path: &str, info: &Value) -> DatasetEntry {
    let results = info
        .get("results")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|result| DatasetResult {
                    dataset_path: path.to_string(),
                    file_name: result.get("file").map(text_of).unwrap_or_default(),
                    accuracy_mean: number_of(result.get("accuracy_mean")),
                    accuracy_std: number_of(result.get("accuracy_std")),
                    run_accuracies: result
                        .pointer("/individual_runs/accuracies")
                        .and_then(Value::as_array)
                        .map(|runs| runs.iter().filter_map(Value::as_f64).collect())
                        .unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default();

    DatasetEntry {
        dataset_path: path.to_string(),
        average_accuracy: number_of(info.get("average_accuracy")),
        results,
    }
}

fn records_from(items: Vec<Value>) -> Normalized {
    if !items.iter().all(Value::is_object) {
        return Normalized::Unrecognized(Value::Array(items));
    }
    let records = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(record_from(map)),
            _ => None,
        })
        .collect();
    Normalized::RecordStream(records)
}

/// Build a record from one item, keeping unknown fields in `extra`.
pub fn record_from(mut map: Map<String, Value>) -> OutcomeRecord {
    let question_id = map
        .remove("question_id")
        .map(|v| QuestionId::from(&v))
        .unwrap_or_default();
    let question_text = map.remove("question").map(|v| text_of(&v)).unwrap_or_default();
    let correct_answer = map
        .remove("correct_answer")
        .map(|v| text_of(&v))
        .unwrap_or_default();

    let model_output = map.remove("model_output").filter(|v| !v.is_null());
    let llm_output = map.remove("llm_output").filter(|v| !v.is_null());
    let model_output = model_output
        .or(llm_output)
        .map(|v| text_of(&v))
        .unwrap_or_default();

    let predicted_answer = map
        .remove("predicted_answer")
        .filter(|v| !v.is_null())
        .map(|v| text_of(&v));
    let is_correct = map.remove("is_correct").is_some_and(|v| truthy(&v));

    let usage = TokenUsage {
        prompt: map.remove("usage_prompt_tokens").and_then(|v| count_of(&v)),
        completion: map.remove("usage_completion_tokens").and_then(|v| count_of(&v)),
        total: map.remove("usage_total_tokens").and_then(|v| count_of(&v)),
    };

    // assigned by the aggregator only
    map.remove("source_run");

    OutcomeRecord {
        question_id,
        question_text,
        correct_answer,
        model_output,
        predicted_answer,
        is_correct,
        token_usage: (!usage.is_empty()).then_some(usage),
        source_run: None,
        extra: map,
    }
}

/// Boolean interpretation of a loosely typed correctness flag.
///
/// Any non-empty string is true, including `"false"` and `"0"`.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn number_of(value: Option<&Value>) -> f64 {
    value.and_then(Value::as_f64).unwrap_or(0.0)
}

fn count_of(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f.round() as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
