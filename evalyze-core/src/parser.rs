//! Record parser: decodes one uploaded artifact into a JSON document.
//!
//! Structured files hold a single JSON document. Line-delimited files hold
//! one JSON document per non-blank line and decode to a JSON array.

use serde::Serialize;
use serde_json::Value;
use std::path::Path;

use crate::config::LimitsConfig;
use crate::error::{AnalyzerError, Result};

/// Declared encoding of an artifact, derived from its file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactFormat {
    /// `.json`: one document, usually a run summary.
    Structured,
    /// `.jsonl`: one item record per line.
    LineDelimited,
}

impl ArtifactFormat {
    pub fn from_file_name(file_name: &str) -> Result<Self> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        if extension.eq_ignore_ascii_case("json") {
            Ok(Self::Structured)
        } else if extension.eq_ignore_ascii_case("jsonl") {
            Ok(Self::LineDelimited)
        } else {
            Err(AnalyzerError::Extension {
                file_name: file_name.to_string(),
            })
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Structured => "json",
            Self::LineDelimited => "jsonl",
        }
    }
}

/// Raw uploaded file: its name and undecoded bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl Artifact {
    pub fn new(file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }

    /// Read an artifact from disk, refusing files over the configured size.
    pub fn read(path: &Path, limits: &LimitsConfig) -> Result<Self> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let size_bytes = std::fs::metadata(path)?.len();
        let limit_bytes = limits.max_file_size_bytes();
        if size_bytes > limit_bytes {
            return Err(AnalyzerError::FileTooLarge {
                file_name,
                size_bytes,
                limit_bytes,
            });
        }

        let content = std::fs::read(path)?;
        Ok(Self { file_name, content })
    }

    pub fn format(&self) -> Result<ArtifactFormat> {
        ArtifactFormat::from_file_name(&self.file_name)
    }
}

/// A decoded artifact, not yet interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedArtifact {
    pub file_name: String,
    pub format: ArtifactFormat,
    pub document: Value,
}

/// Decode an artifact using the format implied by its file name.
pub fn parse(artifact: &Artifact) -> Result<ParsedArtifact> {
    let format = artifact.format()?;
    let document = parse_content(&artifact.file_name, &artifact.content, format)?;
    Ok(ParsedArtifact {
        file_name: artifact.file_name.clone(),
        format,
        document,
    })
}

/// Decode raw content with an explicit format hint.
pub fn parse_content(file_name: &str, content: &[u8], format: ArtifactFormat) -> Result<Value> {
    let text = std::str::from_utf8(content)
        .map_err(|e| AnalyzerError::format(file_name, format!("invalid UTF-8: {e}")))?;

    let document = match format {
        ArtifactFormat::Structured => parse_structured(file_name, text)?,
        ArtifactFormat::LineDelimited => parse_line_delimited(file_name, text)?,
    };

    tracing::debug!(
        file = file_name,
        format = format.extension(),
        records = document.as_array().map(Vec::len),
        "Parsed artifact"
    );
    Ok(document)
}

fn parse_structured(file_name: &str, text: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(|e| AnalyzerError::format(file_name, e.to_string()))
}

/// Any undecodable line rejects the whole file: a partial stream cannot be
/// told apart from a truncated one.
fn parse_line_delimited(file_name: &str, text: &str) -> Result<Value> {
    let mut items = Vec::new();
    for (index, line) in text.split('\n').enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let item: Value = serde_json::from_str(line).map_err(|e| {
            AnalyzerError::format(file_name, format!("line {}: {e}", index + 1))
        })?;
        items.push(item);
    }
    Ok(Value::Array(items))
}
