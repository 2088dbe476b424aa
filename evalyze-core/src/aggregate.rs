//! Multi-run aggregation.
//!
//! Merges record streams from repeated runs of the same question set into
//! per-run-tagged raw records and per-question cross-run statistics.
//!
//! Records are grouped by `question_id`, so runs may visit questions in any
//! order or skip some. Ids must mean the same question in every file; this is
//! a precondition of the input, not something aggregation can verify.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::types::{OutcomeRecord, QuestionId};

/// One run's records together with the file they came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStream {
    pub file_name: String,
    pub records: Vec<OutcomeRecord>,
}

impl RunStream {
    pub fn new(file_name: impl Into<String>, records: Vec<OutcomeRecord>) -> Self {
        Self {
            file_name: file_name.into(),
            records,
        }
    }
}

/// Accuracy on a 0–100 scale; 0 when nothing was evaluated.
pub fn accuracy_percent(correct: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    correct as f64 / total as f64 * 100.0
}

/// Headline numbers for a single record stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StreamSummary {
    pub total: usize,
    pub correct: usize,
    pub accuracy: f64,
}

impl StreamSummary {
    pub fn of(records: &[OutcomeRecord]) -> Self {
        let total = records.len();
        let correct = records.iter().filter(|r| r.is_correct).count();
        Self {
            total,
            correct,
            accuracy: accuracy_percent(correct, total),
        }
    }

    pub fn incorrect(&self) -> usize {
        self.total - self.correct
    }
}

/// Cross-run statistics for one logical question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedQuestion {
    pub question_id: QuestionId,
    /// Taken from the first record seen with this id.
    pub question_text: String,
    pub correct_answer: String,
    pub run_count: usize,
    pub correct_count: usize,
    /// `correct_count / run_count * 100`.
    pub run_accuracy: f64,
    /// Contributing records in encounter order, each tagged with its run.
    pub member_records: Vec<OutcomeRecord>,
}

impl AggregatedQuestion {
    fn from_members(member_records: Vec<OutcomeRecord>) -> Option<Self> {
        let first = member_records.first()?;
        let run_count = member_records.len();
        let correct_count = member_records.iter().filter(|r| r.is_correct).count();
        Some(Self {
            question_id: first.question_id.clone(),
            question_text: first.question_text.clone(),
            correct_answer: first.correct_answer.clone(),
            run_count,
            correct_count,
            run_accuracy: accuracy_percent(correct_count, run_count),
            member_records,
        })
    }

    /// Mean total tokens across runs, reported only when the first run
    /// recorded a total. Runs without a total count as zero.
    pub fn average_total_tokens(&self) -> Option<f64> {
        self.member_records.first()?.total_tokens()?;
        let sum: u64 = self
            .member_records
            .iter()
            .map(|r| r.total_tokens().unwrap_or(0))
            .sum();
        Some(sum as f64 / self.member_records.len() as f64)
    }
}

/// Unified view over several runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregationResult {
    /// File order, then in-file order.
    pub individual_records: Vec<OutcomeRecord>,
    /// First-seen `question_id` order.
    pub aggregated_questions: Vec<AggregatedQuestion>,
    pub total_questions: usize,
    pub total_runs: usize,
    /// Correct share of `individual_records`, 0–100.
    pub overall_accuracy: f64,
    pub total_evaluations: usize,
    pub source_file_names: Vec<String>,
    /// Records whose id already appeared earlier in the same run.
    pub duplicate_ids_within_runs: usize,
}

impl AggregationResult {
    pub fn correct_evaluations(&self) -> usize {
        self.individual_records.iter().filter(|r| r.is_correct).count()
    }
}

/// Aggregate the given runs, in order. Run `r` tags its records with
/// `source_run = r`.
pub fn aggregate(streams: &[RunStream]) -> AggregationResult {
    let mut individual_records = Vec::with_capacity(streams.iter().map(|s| s.records.len()).sum());
    let mut duplicate_ids_within_runs = 0;

    for (run_index, stream) in streams.iter().enumerate() {
        let mut seen: HashSet<&QuestionId> = HashSet::with_capacity(stream.records.len());
        let mut duplicates = 0;
        for record in &stream.records {
            if !seen.insert(&record.question_id) {
                duplicates += 1;
            }
            let mut tagged = record.clone();
            tagged.source_run = Some(run_index);
            individual_records.push(tagged);
        }
        if duplicates > 0 {
            tracing::warn!(
                file = %stream.file_name,
                run = run_index,
                duplicates,
                "Run contains repeated question ids; they are merged into one question"
            );
        }
        duplicate_ids_within_runs += duplicates;
    }

    let mut group_index: HashMap<&QuestionId, usize> = HashMap::new();
    let mut groups: Vec<Vec<OutcomeRecord>> = Vec::new();
    for record in &individual_records {
        match group_index.get(&record.question_id) {
            Some(&index) => groups[index].push(record.clone()),
            None => {
                group_index.insert(&record.question_id, groups.len());
                groups.push(vec![record.clone()]);
            }
        }
    }

    let aggregated_questions: Vec<AggregatedQuestion> = groups
        .into_iter()
        .filter_map(AggregatedQuestion::from_members)
        .collect();

    let total_evaluations = individual_records.len();
    let correct = individual_records.iter().filter(|r| r.is_correct).count();
    let result = AggregationResult {
        total_questions: aggregated_questions.len(),
        total_runs: streams.len(),
        overall_accuracy: accuracy_percent(correct, total_evaluations),
        total_evaluations,
        source_file_names: streams.iter().map(|s| s.file_name.clone()).collect(),
        duplicate_ids_within_runs,
        individual_records,
        aggregated_questions,
    };

    tracing::info!(
        runs = result.total_runs,
        evaluations = result.total_evaluations,
        questions = result.total_questions,
        accuracy = result.overall_accuracy,
        "Aggregated runs"
    );
    result
}
