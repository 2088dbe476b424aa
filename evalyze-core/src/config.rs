//! Configuration system for Evalyze.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment.
//! Configuration is loaded from `~/.config/evalyze/config.toml` and/or
//! `.evalyze/config.toml` in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AnalyzerError, Result};
use crate::query::{QueryParams, ScoreRange, SortKey};

/// Page sizes offered to reviewers.
pub const PAGE_SIZE_CHOICES: [usize; 4] = [10, 20, 50, 100];

/// Top-level configuration for an analysis session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Default filter, sort and pagination settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub sort: SortKey,
    #[serde(default)]
    pub score_low: f64,
    #[serde(default = "default_score_high")]
    pub score_high: f64,
    /// Also list every per-run record when several runs are aggregated.
    #[serde(default)]
    pub show_individual: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            sort: SortKey::default(),
            score_low: 0.0,
            score_high: default_score_high(),
            show_individual: false,
        }
    }
}

impl DisplayConfig {
    pub fn score_range(&self) -> Result<ScoreRange> {
        Ok(ScoreRange::new(self.score_low, self.score_high)?)
    }

    /// Query parameters for the given page using these display settings.
    pub fn query_params(&self, page: usize) -> Result<QueryParams> {
        Ok(QueryParams {
            score_range: self.score_range()?,
            sort: self.sort,
            page_size: self.page_size,
            page,
        })
    }
}

fn default_page_size() -> usize {
    20
}

fn default_score_high() -> f64 {
    100.0
}

/// Resource limits applied while reading artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: default_max_file_size_mb(),
        }
    }
}

impl LimitsConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

fn default_max_file_size_mb() -> u64 {
    200
}

impl AnalyzerConfig {
    /// Check settings that would otherwise surface later as query errors.
    pub fn validate(&self) -> Result<()> {
        if self.display.page_size == 0 {
            return Err(AnalyzerError::config("display.page_size must be greater than zero"));
        }
        self.display
            .score_range()
            .map_err(|e| AnalyzerError::config(format!("display score range: {e}")))?;
        if self.limits.max_file_size_mb == 0 {
            return Err(AnalyzerError::config(
                "limits.max_file_size_mb must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("dev", "evalyze", "evalyze")
}

/// Path of the workspace-level config file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".evalyze").join("config.toml")
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `EVALYZE_`)
/// 2. Explicit config file (passed as argument)
/// 3. Workspace-local config (`.evalyze/config.toml`)
/// 4. User config (`~/.config/evalyze/config.toml`)
/// 5. Built-in defaults
pub fn load_config(workspace: Option<&Path>, config_file: Option<&Path>) -> Result<AnalyzerConfig> {
    let mut figment = Figment::from(Serialized::defaults(AnalyzerConfig::default()));

    if let Some(dirs) = project_dirs() {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = config_file {
        if !path.exists() {
            return Err(AnalyzerError::config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        figment = figment.merge(Toml::file(path));
    }

    // EVALYZE_DISPLAY__PAGE_SIZE, EVALYZE_LIMITS__MAX_FILE_SIZE_MB, etc.
    figment = figment.merge(Env::prefixed("EVALYZE_").split("__"));

    let config: AnalyzerConfig = figment
        .extract()
        .map_err(|e| AnalyzerError::config(e.to_string()))?;
    config.validate()?;
    tracing::debug!(
        page_size = config.display.page_size,
        sort = ?config.display.sort,
        "Loaded configuration"
    );
    Ok(config)
}

/// Check whether any Evalyze configuration file exists (user-level or workspace-level).
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if let Some(dirs) = project_dirs() {
        if dirs.config_dir().join("config.toml").exists() {
            return true;
        }
    }
    workspace.is_some_and(|ws| workspace_config_path(ws).exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.display.page_size, 20);
        assert_eq!(config.display.sort, SortKey::ById);
        assert!(config.display.score_range().unwrap().is_full());
        assert!(!config.display.show_individual);
        assert_eq!(config.limits.max_file_size_mb, 200);
        assert_eq!(config.limits.max_file_size_bytes(), 200 * 1024 * 1024);
        assert!(PAGE_SIZE_CHOICES.contains(&config.display.page_size));
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut config = AnalyzerConfig::default();
        config.display.sort = SortKey::ByScoreDesc;
        config.display.score_low = 25.0;
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: AnalyzerConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized, config);
    }

    #[test]
    fn test_validate_rejects_zero_page_size() {
        let mut config = AnalyzerConfig::default();
        config.display.page_size = 0;
        assert!(matches!(config.validate(), Err(AnalyzerError::Config { .. })));
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let mut config = AnalyzerConfig::default();
        config.display.score_low = 80.0;
        config.display.score_high = 20.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_config_from_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(".evalyze");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(
            config_dir.join("config.toml"),
            r#"
[display]
page_size = 50
sort = "by_score_asc"
score_low = 0.0
score_high = 60.0

[limits]
max_file_size_mb = 10
"#,
        )
        .unwrap();

        let config = load_config(Some(dir.path()), None).unwrap();
        assert_eq!(config.display.page_size, 50);
        assert_eq!(config.display.sort, SortKey::ByScoreAsc);
        assert!((config.display.score_high - 60.0).abs() < f64::EPSILON);
        assert_eq!(config.limits.max_file_size_mb, 10);
    }

    #[test]
    fn test_load_config_explicit_file_overrides_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("review.toml");
        std::fs::write(&explicit, "[display]\npage_size = 10\n").unwrap();

        let config = load_config(None, Some(&explicit)).unwrap();
        assert_eq!(config.display.page_size, 10);
        assert_eq!(config.display.sort, SortKey::ById);
    }

    #[test]
    fn test_load_config_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(load_config(None, Some(&missing)).is_err());
    }

    #[test]
    fn test_config_exists_in_workspace() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!workspace_config_path(dir.path()).exists());
        std::fs::create_dir_all(dir.path().join(".evalyze")).unwrap();
        std::fs::write(workspace_config_path(dir.path()), "").unwrap();
        assert!(config_exists(Some(dir.path())));
    }
}
