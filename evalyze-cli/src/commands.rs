//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use std::path::Path;

/// Handle a CLI subcommand.
pub fn handle_command(
    command: Commands,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    match command {
        Commands::Config { action } => handle_config(action, workspace, config_file),
    }
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = evalyze_core::config::workspace_config_path(workspace);
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let default_config = evalyze_core::AnalyzerConfig::default();
            let toml_str = toml::to_string_pretty(&default_config)?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = evalyze_core::load_config(Some(workspace), config_file)
                .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
            println!("{}", render_config(&config, workspace, config_file)?);
            Ok(())
        }
    }
}

/// Effective configuration as TOML, noting when no file contributed to it.
fn render_config(
    config: &evalyze_core::AnalyzerConfig,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<String> {
    let mut text = String::new();
    if config_file.is_none() && !evalyze_core::config::config_exists(Some(workspace)) {
        text.push_str("# No configuration file found; showing built-in defaults.\n");
        text.push_str("# Run `evalyze config init` to create one.\n\n");
    }
    text.push_str(&toml::to_string_pretty(config)?);
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_init_creates_file() {
        let dir = TempDir::new().unwrap();
        let workspace = dir.path();

        let command = Commands::Config {
            action: ConfigAction::Init,
        };
        handle_command(command, workspace, None).unwrap();

        let config_path = workspace.join(".evalyze").join("config.toml");
        assert!(config_path.exists());

        let content = std::fs::read_to_string(&config_path).unwrap();
        let parsed: evalyze_core::AnalyzerConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed, evalyze_core::AnalyzerConfig::default());
    }

    #[test]
    fn test_config_init_idempotent() {
        let dir = TempDir::new().unwrap();
        let workspace = dir.path();
        let config_path = workspace.join(".evalyze").join("config.toml");

        let command = Commands::Config {
            action: ConfigAction::Init,
        };
        handle_command(command, workspace, None).unwrap();
        std::fs::write(&config_path, "[display]\npage_size = 50\n").unwrap();

        let command = Commands::Config {
            action: ConfigAction::Init,
        };
        handle_command(command, workspace, None).unwrap();

        let content = std::fs::read_to_string(&config_path).unwrap();
        assert_eq!(content, "[display]\npage_size = 50\n");
    }

    #[test]
    fn test_config_show_without_file() {
        let dir = TempDir::new().unwrap();
        let command = Commands::Config {
            action: ConfigAction::Show,
        };
        assert!(handle_command(command, dir.path(), None).is_ok());
    }

    #[test]
    fn test_render_config_notes_missing_file() {
        let dir = TempDir::new().unwrap();
        let config = evalyze_core::AnalyzerConfig::default();

        let text = render_config(&config, dir.path(), None).unwrap();
        let has_user_config = evalyze_core::config::config_exists(None);
        assert_eq!(text.starts_with("# No configuration file found"), !has_user_config);
        assert!(text.contains("page_size = 20"));

        let command = Commands::Config {
            action: ConfigAction::Init,
        };
        handle_command(command, dir.path(), None).unwrap();
        let text = render_config(&config, dir.path(), None).unwrap();
        assert!(!text.starts_with("# No configuration file found"));
    }

    #[test]
    fn test_config_show_missing_explicit_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        let command = Commands::Config {
            action: ConfigAction::Show,
        };
        assert!(handle_command(command, dir.path(), Some(&missing)).is_err());
    }
}
