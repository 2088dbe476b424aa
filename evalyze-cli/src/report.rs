//! Text and JSON rendering of analysis results.

use evalyze_core::aggregate::{AggregatedQuestion, AggregationResult, StreamSummary};
use evalyze_core::query::{QueryPage, ScoreRange};
use evalyze_core::session::FileFailure;
use evalyze_core::types::{OutcomeRecord, RunSummary};
use serde::Serialize;

const RULE: &str = "----------------------------------------";

/// Header for a structured run summary, followed by one block per dataset file.
pub fn render_summary(summary: &RunSummary) -> String {
    let mut text = String::new();
    text.push_str("Run summary\n");
    text.push_str(&format!("  Timestamp:    {}\n", display_or_na(&summary.timestamp)));
    text.push_str(&format!(
        "  Model:        {}\n",
        summary.model_name().unwrap_or("N/A")
    ));
    text.push_str(&format!("  Duration:     {:.1}s\n", summary.duration_seconds));
    text.push_str(&format!("  Repeat runs:  {}\n", summary.repeat_runs()));
    text.push_str(RULE);
    text.push('\n');

    if !summary.has_results() {
        text.push_str("The file loaded, but it contains no evaluation results.\n");
        for entry in &summary.dataset_results {
            text.push_str(&format!(
                "  {}  results: {}  average accuracy: {:.2}%\n",
                entry.dataset_path,
                entry.results.len(),
                entry.average_accuracy
            ));
        }
        text.push_str("The evaluation may have been interrupted or may not have finished.\n");
        return text;
    }

    for result in summary.results() {
        text.push_str(&format!("{}  ({})\n", result.display_name(), result.file_name));
        text.push_str(&format!(
            "  Mean accuracy: {:.2}% (±{:.2}%)\n",
            result.accuracy_percent(),
            result.std_percent()
        ));
        if result.repetition_count() > 0 {
            let runs: Vec<String> = result
                .run_accuracies
                .iter()
                .map(|a| format!("{:.2}%", a * 100.0))
                .collect();
            text.push_str(&format!(
                "  Runs ({}): {}\n",
                result.repetition_count(),
                runs.join(", ")
            ));
        }
        if let Some(mean) = result.run_mean() {
            text.push_str(&format!("  Run mean:      {:.2}%\n", mean * 100.0));
        }
    }
    text
}

/// Header metrics for a single record stream.
pub fn render_stream_header(file_name: &str, summary: &StreamSummary) -> String {
    format!(
        "Loaded {file_name}\n  Questions: {}  Correct: {}  Accuracy: {:.2}%\n{RULE}\n",
        summary.total, summary.correct, summary.accuracy
    )
}

/// Header metrics for several aggregated runs.
pub fn render_aggregation_header(result: &AggregationResult) -> String {
    let mut text = format!("Aggregated {} result files\n", result.source_file_names.len());
    text.push_str(&format!(
        "  Questions: {}  Runs: {}  Evaluations: {}  Overall accuracy: {:.2}%\n",
        result.total_questions, result.total_runs, result.total_evaluations, result.overall_accuracy
    ));
    for (index, name) in result.source_file_names.iter().enumerate() {
        text.push_str(&format!("  {}. {}\n", index + 1, name));
    }
    if result.duplicate_ids_within_runs > 0 {
        text.push_str(&format!(
            "  Note: {} records repeat a question id within their own run\n",
            result.duplicate_ids_within_runs
        ));
    }
    text.push_str(RULE);
    text.push('\n');
    text
}

/// Filter status line plus the page position line.
fn render_page_status<T>(page: &QueryPage<'_, T>, range: ScoreRange) -> String {
    let mut text = if page.is_filtered() {
        format!(
            "Score range {}-{}%: showing {}/{} results ({} correct, {} incorrect)\n",
            range.low(),
            range.high(),
            page.total_count,
            page.unfiltered_count,
            page.summary.correct,
            page.summary.incorrect
        )
    } else {
        format!(
            "{} results ({} correct, {} incorrect)\n",
            page.total_count, page.summary.correct, page.summary.incorrect
        )
    };
    text.push_str(&format!(
        "Page {} of {} ({} total)\n",
        page.page, page.total_pages, page.total_count
    ));
    text
}

/// One page of aggregated questions.
pub fn render_question_page(page: &QueryPage<'_, AggregatedQuestion>, range: ScoreRange) -> String {
    let mut text = render_page_status(page, range);
    if page.items.is_empty() {
        text.push_str("No questions to show.\n");
        return text;
    }

    for (offset, question) in page.items.iter().enumerate() {
        text.push_str(&format!(
            "\n#{} Question {}: {}/{} runs correct ({:.1}%)\n",
            page.first_position() + offset,
            question.question_id,
            question.correct_count,
            question.run_count,
            question.run_accuracy
        ));
        text.push_str(&format!("  Question: {}\n", display_or_na(&question.question_text)));
        text.push_str(&format!(
            "  Correct answer: {}\n",
            display_or_na(&question.correct_answer)
        ));
        if let Some(tokens) = question.average_total_tokens() {
            text.push_str(&format!("  Average total tokens: {tokens:.0}\n"));
        }
        for record in &question.member_records {
            let run = record.source_run.map_or(0, |r| r + 1);
            text.push_str(&format!(
                "  Run {run} [{}]: {}\n",
                verdict(record.is_correct),
                display_or_na(&record.model_output)
            ));
            if let Some(predicted) = &record.predicted_answer {
                text.push_str(&format!("    Parsed answer: {predicted}\n"));
            }
        }
    }
    text
}

/// One page of individual records, from a single stream or from all runs.
pub fn render_record_page(page: &QueryPage<'_, OutcomeRecord>, range: ScoreRange) -> String {
    let mut text = render_page_status(page, range);
    if page.items.is_empty() {
        text.push_str("No questions to show.\n");
        return text;
    }

    for (offset, record) in page.items.iter().enumerate() {
        let run = record
            .source_run
            .map(|r| format!(" (run {})", r + 1))
            .unwrap_or_default();
        text.push_str(&format!(
            "\n#{} Question {}{run} [{}]\n",
            page.first_position() + offset,
            record.question_id,
            verdict(record.is_correct)
        ));
        text.push_str(&format!("  Question: {}\n", display_or_na(&record.question_text)));
        text.push_str(&format!(
            "  Correct answer: {}\n",
            display_or_na(&record.correct_answer)
        ));
        text.push_str(&format!("  Model output: {}\n", display_or_na(&record.model_output)));
        if let Some(predicted) = &record.predicted_answer {
            text.push_str(&format!("  Parsed answer: {predicted}\n"));
        }
        if let Some(usage) = &record.token_usage {
            let counts: Vec<String> = [
                ("total", usage.total),
                ("prompt", usage.prompt),
                ("completion", usage.completion),
            ]
            .into_iter()
            .filter_map(|(label, count)| count.map(|c| format!("{label} {c}")))
            .collect();
            text.push_str(&format!("  Tokens: {}\n", counts.join(", ")));
        }
    }
    text
}

/// One line per file that could not be used.
pub fn render_failures(failures: &[FileFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("Skipped {}: {}\n", f.file_name, f.error))
        .collect()
}

/// Machine-readable view of a multi-run analysis.
#[derive(Debug, Serialize)]
pub struct MultiRunView<'a> {
    pub source_file_names: &'a [String],
    pub total_runs: usize,
    pub total_questions: usize,
    pub total_evaluations: usize,
    pub overall_accuracy: f64,
    pub questions: QueryPage<'a, AggregatedQuestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub individual: Option<QueryPage<'a, OutcomeRecord>>,
}

impl<'a> MultiRunView<'a> {
    pub fn new(
        result: &'a AggregationResult,
        questions: QueryPage<'a, AggregatedQuestion>,
        individual: Option<QueryPage<'a, OutcomeRecord>>,
    ) -> Self {
        Self {
            source_file_names: &result.source_file_names,
            total_runs: result.total_runs,
            total_questions: result.total_questions,
            total_evaluations: result.total_evaluations,
            overall_accuracy: result.overall_accuracy,
            questions,
            individual,
        }
    }
}

/// Machine-readable view of a single record stream.
#[derive(Debug, Serialize)]
pub struct SingleRunView<'a> {
    pub file_name: &'a str,
    pub summary: StreamSummary,
    pub records: QueryPage<'a, OutcomeRecord>,
}

fn verdict(is_correct: bool) -> &'static str {
    if is_correct { "correct" } else { "incorrect" }
}

fn display_or_na(text: &str) -> &str {
    if text.is_empty() { "N/A" } else { text }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evalyze_core::aggregate::{RunStream, aggregate};
    use evalyze_core::error::AnalyzerError;
    use evalyze_core::normalize::{Normalized, normalize};
    use evalyze_core::query::{QueryParams, query};
    use serde_json::json;

    fn sample_result() -> AggregationResult {
        aggregate(&[
            RunStream::new(
                "run0.jsonl",
                vec![
                    OutcomeRecord::new(1, true)
                        .with_question("2+2?", "4")
                        .with_total_tokens(30),
                    OutcomeRecord::new(2, false).with_question("3+3?", "6"),
                ],
            ),
            RunStream::new(
                "run1.jsonl",
                vec![
                    OutcomeRecord::new(1, false).with_total_tokens(50),
                    OutcomeRecord::new(2, false),
                ],
            ),
        ])
    }

    #[test]
    fn test_render_summary_lists_datasets() {
        let Normalized::RunSummary(summary) = normalize(json!({
            "timestamp": "20250827_1010",
            "duration_seconds": 12.34,
            "config": {"model": {"name": "gpt-4o-mini"}},
            "dataset_results": {
                "datasets/mmlu": {"results": [{
                    "file": "datasets/mmlu/law.jsonl",
                    "accuracy_mean": 0.625,
                    "accuracy_std": 0.05,
                    "individual_runs": {"accuracies": [0.6, 0.65]}
                }]}
            }
        })) else {
            panic!("expected run summary");
        };
        let text = render_summary(&summary);
        assert!(text.contains("Model:        gpt-4o-mini"));
        assert!(text.contains("Duration:     12.3s"));
        assert!(text.contains("Repeat runs:  1"));
        assert!(text.contains("law.jsonl  (datasets/mmlu/law.jsonl)"));
        assert!(text.contains("Mean accuracy: 62.50% (±5.00%)"));
        assert!(text.contains("Runs (2): 60.00%, 65.00%"));
    }

    #[test]
    fn test_render_summary_without_results() {
        let Normalized::RunSummary(summary) = normalize(json!({
            "dataset_results": {"datasets/mmlu": {"results": [], "average_accuracy": 0}}
        })) else {
            panic!("expected run summary");
        };
        let text = render_summary(&summary);
        assert!(text.contains("Timestamp:    N/A"));
        assert!(text.contains("no evaluation results"));
        assert!(text.contains("datasets/mmlu  results: 0"));
    }

    #[test]
    fn test_render_aggregation_header() {
        let text = render_aggregation_header(&sample_result());
        assert!(text.contains("Aggregated 2 result files"));
        assert!(text.contains("Questions: 2  Runs: 2  Evaluations: 4  Overall accuracy: 25.00%"));
        assert!(text.contains("  1. run0.jsonl\n  2. run1.jsonl\n"));
        assert!(!text.contains("Note:"));
    }

    #[test]
    fn test_render_question_page() {
        let result = sample_result();
        let params = QueryParams::default();
        let page = query(&result.aggregated_questions, &params).unwrap();
        let text = render_question_page(&page, params.score_range);

        assert!(text.starts_with("2 results (1 correct, 3 incorrect)\nPage 1 of 1 (2 total)\n"));
        assert!(text.contains("#1 Question 1: 1/2 runs correct (50.0%)"));
        assert!(text.contains("Average total tokens: 40"));
        assert!(text.contains("Run 2 [incorrect]: N/A"));
        assert!(text.contains("#2 Question 2: 0/2 runs correct (0.0%)"));
    }

    #[test]
    fn test_render_record_page_filtered() {
        let result = sample_result();
        let params = QueryParams {
            score_range: ScoreRange::new(100.0, 100.0).unwrap(),
            ..QueryParams::default()
        };
        let page = query(&result.individual_records, &params).unwrap();
        let text = render_record_page(&page, params.score_range);

        assert!(text.starts_with("Score range 100-100%: showing 1/4 results (1 correct, 0 incorrect)"));
        assert!(text.contains("#1 Question 1 (run 1) [correct]"));
        assert!(text.contains("Correct answer: 4"));
        assert!(text.contains("Tokens: total 30"));
    }

    #[test]
    fn test_render_empty_page() {
        let records: Vec<OutcomeRecord> = Vec::new();
        let params = QueryParams::default();
        let page = query(&records, &params).unwrap();
        assert!(render_record_page(&page, params.score_range).contains("No questions to show."));
    }

    #[test]
    fn test_render_failures() {
        let failures = vec![FileFailure {
            file_name: "notes.txt".into(),
            error: AnalyzerError::Extension {
                file_name: "notes.txt".into(),
            },
        }];
        let text = render_failures(&failures);
        assert!(text.starts_with("Skipped notes.txt: "));
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_multi_run_view_serializes() {
        let result = sample_result();
        let questions = query(&result.aggregated_questions, &QueryParams::default()).unwrap();
        let view = MultiRunView::new(&result, questions, None);
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["total_runs"], json!(2));
        assert_eq!(value["questions"]["total_count"], json!(2));
        assert_eq!(value["questions"]["items"][0]["question_id"], json!(1));
        assert!(value.get("individual").is_none());
    }
}
