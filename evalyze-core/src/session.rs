//! Analysis session: runs one batch of uploaded artifacts through the pipeline.
//!
//! A single artifact is parsed and normalized on its own. Several artifacts
//! are treated as repeated runs: each record file is parsed in upload order
//! and the survivors are aggregated. A failure in one file is reported
//! against that file and never stops the rest of the batch.

use serde::Serialize;

use crate::aggregate::{AggregationResult, RunStream, aggregate};
use crate::error::{AnalyzerError, Result};
use crate::normalize::{Normalized, normalize};
use crate::parser::{Artifact, ArtifactFormat, parse};
use crate::types::{OutcomeRecord, RunSummary};

/// What one batch of artifacts turned into.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Analysis {
    /// One structured run summary.
    Summary(RunSummary),
    /// One record stream; aggregation is skipped.
    SingleRun {
        file_name: String,
        records: Vec<OutcomeRecord>,
    },
    /// Several record streams aggregated as repeated runs.
    MultiRun(AggregationResult),
}

/// A file that could not contribute to the analysis.
#[derive(Debug)]
pub struct FileFailure {
    pub file_name: String,
    pub error: AnalyzerError,
}

impl FileFailure {
    fn new(file_name: &str, error: AnalyzerError) -> Self {
        tracing::debug!(file = file_name, error = %error, "Skipping result file");
        Self {
            file_name: file_name.to_string(),
            error,
        }
    }
}

/// Outcome of analyzing a batch: the analysis, if anything was usable, and
/// every per-file failure in upload order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub analysis: Option<Analysis>,
    pub failures: Vec<FileFailure>,
}

impl BatchReport {
    /// The analysis, or `NoUsableArtifacts` when every file failed.
    pub fn into_analysis(self) -> Result<(Analysis, Vec<FileFailure>)> {
        match self.analysis {
            Some(analysis) => Ok((analysis, self.failures)),
            None => Err(AnalyzerError::NoUsableArtifacts {
                failed: self.failures.len(),
            }),
        }
    }
}

/// Analyze a batch of artifacts, in upload order.
pub fn analyze(artifacts: &[Artifact]) -> BatchReport {
    match artifacts {
        [] => BatchReport::default(),
        [single] => analyze_single(single),
        many => analyze_batch(many),
    }
}

fn analyze_single(artifact: &Artifact) -> BatchReport {
    let file_name = artifact.file_name.as_str();
    let normalized = match parse(artifact) {
        Ok(parsed) => normalize(parsed.document),
        Err(e) => {
            return BatchReport {
                analysis: None,
                failures: vec![FileFailure::new(file_name, e)],
            };
        }
    };

    tracing::debug!(file = file_name, kind = normalized.kind(), "Normalized result file");
    match normalized {
        Normalized::RunSummary(summary) => BatchReport {
            analysis: Some(Analysis::Summary(summary)),
            failures: Vec::new(),
        },
        Normalized::RecordStream(records) => BatchReport {
            analysis: Some(Analysis::SingleRun {
                file_name: file_name.to_string(),
                records,
            }),
            failures: Vec::new(),
        },
        Normalized::Unrecognized(_) => BatchReport {
            analysis: None,
            failures: vec![FileFailure::new(
                file_name,
                AnalyzerError::SchemaMismatch {
                    file_name: file_name.to_string(),
                },
            )],
        },
    }
}

fn analyze_batch(artifacts: &[Artifact]) -> BatchReport {
    let mut streams = Vec::with_capacity(artifacts.len());
    let mut failures = Vec::new();

    for artifact in artifacts {
        match load_run_stream(artifact) {
            Ok(stream) => streams.push(stream),
            Err(e) => failures.push(FileFailure::new(&artifact.file_name, e)),
        }
    }

    let analysis = (!streams.is_empty()).then(|| Analysis::MultiRun(aggregate(&streams)));
    BatchReport { analysis, failures }
}

/// Load one artifact of a multi-file batch as a run's record stream.
pub fn load_run_stream(artifact: &Artifact) -> Result<RunStream> {
    let file_name = artifact.file_name.clone();
    if artifact.format()? == ArtifactFormat::Structured {
        return Err(AnalyzerError::StructuredInBatch { file_name });
    }

    match normalize(parse(artifact)?.document) {
        Normalized::RecordStream(records) if records.is_empty() => {
            Err(AnalyzerError::EmptyArtifact { file_name })
        }
        Normalized::RecordStream(records) => Ok(RunStream::new(file_name, records)),
        _ => Err(AnalyzerError::SchemaMismatch { file_name }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::QuestionId;

    fn jsonl(name: &str, lines: &[&str]) -> Artifact {
        Artifact::new(name, lines.join("\n"))
    }

    #[test]
    fn test_analyze_empty_batch() {
        let report = analyze(&[]);
        assert!(report.analysis.is_none());
        assert!(report.failures.is_empty());
        assert!(matches!(
            report.into_analysis(),
            Err(AnalyzerError::NoUsableArtifacts { failed: 0 })
        ));
    }

    #[test]
    fn test_analyze_single_summary() {
        let artifact = Artifact::new(
            "results_1.json",
            r#"{"timestamp": "t", "config": {}, "dataset_results": {"d": {"results": [{"file": "d/a.jsonl", "accuracy_mean": 0.5}]}}}"#,
        );
        let (analysis, failures) = analyze(&[artifact]).into_analysis().unwrap();
        assert!(failures.is_empty());
        let Analysis::Summary(summary) = analysis else {
            panic!("expected summary");
        };
        assert_eq!(summary.results().count(), 1);
    }

    #[test]
    fn test_analyze_single_record_stream_skips_aggregation() {
        let artifact = jsonl(
            "run0.jsonl",
            &[
                r#"{"question_id": 1, "is_correct": true}"#,
                r#"{"question_id": 2, "is_correct": false}"#,
            ],
        );
        let (analysis, _) = analyze(&[artifact]).into_analysis().unwrap();
        let Analysis::SingleRun { file_name, records } = analysis else {
            panic!("expected single run");
        };
        assert_eq!(file_name, "run0.jsonl");
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.source_run.is_none()));
    }

    #[test]
    fn test_analyze_single_unrecognized() {
        let report = analyze(&[Artifact::new("other.json", r#"{"hello": "world"}"#)]);
        assert!(report.analysis.is_none());
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0].error,
            AnalyzerError::SchemaMismatch { .. }
        ));
    }

    #[test]
    fn test_analyze_batch_continues_past_failures() {
        let artifacts = vec![
            jsonl("run0.jsonl", &[r#"{"question_id": 1, "is_correct": true}"#]),
            Artifact::new("summary.json", "{}"),
            jsonl("broken.jsonl", &[r#"{"question_id": 1"#]),
            Artifact::new("notes.txt", "hello"),
            Artifact::new("empty.jsonl", "\n\n"),
            jsonl("run1.jsonl", &[r#"{"question_id": 1, "is_correct": false}"#]),
        ];
        let report = analyze(&artifacts);

        let failed: Vec<&str> = report
            .failures
            .iter()
            .map(|f| f.file_name.as_str())
            .collect();
        assert_eq!(failed, vec!["summary.json", "broken.jsonl", "notes.txt", "empty.jsonl"]);
        assert!(matches!(
            report.failures[0].error,
            AnalyzerError::StructuredInBatch { .. }
        ));
        assert!(matches!(report.failures[1].error, AnalyzerError::Format { .. }));
        assert!(matches!(report.failures[2].error, AnalyzerError::Extension { .. }));
        assert!(matches!(
            report.failures[3].error,
            AnalyzerError::EmptyArtifact { .. }
        ));

        let Some(Analysis::MultiRun(result)) = report.analysis else {
            panic!("expected aggregated runs");
        };
        assert_eq!(result.source_file_names, vec!["run0.jsonl", "run1.jsonl"]);
        assert_eq!(result.total_runs, 2);
        assert_eq!(result.aggregated_questions.len(), 1);
        assert_eq!(result.aggregated_questions[0].question_id, QuestionId::Number(1));
        assert!((result.overall_accuracy - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_analyze_batch_all_failed() {
        let report = analyze(&[
            Artifact::new("a.json", "{}"),
            Artifact::new("b.jsonl", "not json"),
        ]);
        assert!(matches!(
            report.into_analysis(),
            Err(AnalyzerError::NoUsableArtifacts { failed: 2 })
        ));
    }
}
