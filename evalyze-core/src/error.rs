//! Error types for the Evalyze core library.
//!
//! Uses `thiserror` for the public error taxonomy: per-file ingestion
//! failures (extension, format, schema, size), batch-level failures, and
//! query contract violations.

/// Top-level error type for the Evalyze core library.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("Unsupported file type for '{file_name}': expected .json or .jsonl")]
    Extension { file_name: String },

    #[error("Failed to parse '{file_name}': {message}")]
    Format { file_name: String, message: String },

    #[error("Unrecognized result format in '{file_name}'")]
    SchemaMismatch { file_name: String },

    #[error("'{file_name}' contains no records")]
    EmptyArtifact { file_name: String },

    #[error("'{file_name}' is a run summary; multi-file analysis only accepts .jsonl record files")]
    StructuredInBatch { file_name: String },

    #[error("'{file_name}' is {size_bytes} bytes, over the {limit_bytes} byte limit")]
    FileTooLarge {
        file_name: String,
        size_bytes: u64,
        limit_bytes: u64,
    },

    #[error("No usable result files ({failed} failed)")]
    NoUsableArtifacts { failed: usize },

    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalyzerError {
    pub fn format(file_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Format {
            file_name: file_name.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// The file this error is about, when it is a per-file failure.
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Self::Extension { file_name }
            | Self::Format { file_name, .. }
            | Self::SchemaMismatch { file_name }
            | Self::EmptyArtifact { file_name }
            | Self::StructuredInBatch { file_name }
            | Self::FileTooLarge { file_name, .. } => Some(file_name),
            _ => None,
        }
    }
}

/// Caller contract violations detected by the query engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    #[error("Invalid score range {low}..={high}: bounds must satisfy 0 <= low <= high <= 100")]
    InvalidScoreRange { low: f64, high: f64 },

    #[error("Page size must be greater than zero")]
    InvalidPageSize,

    #[error("Page {page} is out of range (1..={total_pages})")]
    PageOutOfRange { page: usize, total_pages: usize },
}

/// A type alias for results using the top-level `AnalyzerError`.
pub type Result<T> = std::result::Result<T, AnalyzerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_format() {
        let err = AnalyzerError::format("run1.jsonl", "line 3: expected value");
        assert_eq!(
            err.to_string(),
            "Failed to parse 'run1.jsonl': line 3: expected value"
        );
    }

    #[test]
    fn test_error_display_query() {
        let err = AnalyzerError::from(QueryError::PageOutOfRange {
            page: 4,
            total_pages: 3,
        });
        assert_eq!(
            err.to_string(),
            "Query error: Page 4 is out of range (1..=3)"
        );
    }

    #[test]
    fn test_file_name_for_per_file_errors() {
        let err = AnalyzerError::Extension {
            file_name: "notes.txt".into(),
        };
        assert_eq!(err.file_name(), Some("notes.txt"));
        assert_eq!(
            AnalyzerError::NoUsableArtifacts { failed: 2 }.file_name(),
            None
        );
    }
}
