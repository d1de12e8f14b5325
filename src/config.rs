//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.usarec.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".usarec.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Study settings.
    #[serde(default)]
    pub study: StudyConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory holding the dataset files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            verbose: false,
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

/// One task participants can be asked to perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    /// Short name recorded in the task dataset (e.g. "Task 1").
    pub name: String,
    /// Human readable title.
    pub title: String,
    /// Instructions shown before the task starts.
    #[serde(default)]
    pub description: String,
}

impl TaskDefinition {
    /// The `name: title` label shown when selecting a task.
    pub fn label(&self) -> String {
        format!("{}: {}", self.name, self.title)
    }
}

/// Study settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyConfig {
    /// Study title used in the introduction and report.
    #[serde(default = "default_title")]
    pub title: String,

    /// Task catalog.
    #[serde(default = "default_tasks")]
    pub tasks: Vec<TaskDefinition>,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            tasks: default_tasks(),
        }
    }
}

fn default_title() -> String {
    "Usability Testing Tool".to_string()
}

fn default_tasks() -> Vec<TaskDefinition> {
    vec![
        TaskDefinition {
            name: "Task 1".to_string(),
            title: "Example 1".to_string(),
            description: "Press Enter to start the task timer, then again when done."
                .to_string(),
        },
        TaskDefinition {
            name: "Task 2".to_string(),
            title: "Do Homework".to_string(),
            description: "Records how long it takes to do homework.".to_string(),
        },
        TaskDefinition {
            name: "Task 3".to_string(),
            title: "Break Time".to_string(),
            description: "Records how long the participant takes breaks.".to_string(),
        },
    ]
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Default output format.
    #[serde(default)]
    pub format: ReportFormat,

    /// Default output file. The report goes to stdout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// Include the raw rows of each dataset.
    #[serde(default = "default_true")]
    pub include_rows: bool,

    /// Width of the text bar charts.
    #[serde(default = "default_chart_width")]
    pub chart_width: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: ReportFormat::default(),
            output: None,
            include_rows: true,
            chart_width: default_chart_width(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_chart_width() -> usize {
    30
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments (and `USAREC_DATA_DIR`) take precedence over config file settings.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref data_dir) = args.data_dir {
            self.general.data_dir = data_dir.clone();
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.data_dir, PathBuf::from("data"));
        assert_eq!(config.study.tasks.len(), 3);
        assert_eq!(config.study.tasks[1].label(), "Task 2: Do Homework");
        assert_eq!(config.report.format, ReportFormat::Markdown);
        assert!(config.report.include_rows);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
data_dir = "/srv/study"
verbose = true

[study]
title = "Checkout Redesign"

[[study.tasks]]
name = "Task A"
title = "Find a product"

[report]
format = "json"
output = "report.json"
include_rows = false
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.data_dir, PathBuf::from("/srv/study"));
        assert!(config.general.verbose);
        assert_eq!(config.study.title, "Checkout Redesign");
        assert_eq!(config.study.tasks.len(), 1);
        assert_eq!(config.study.tasks[0].description, "");
        assert_eq!(config.report.format, ReportFormat::Json);
        assert_eq!(config.report.output, Some(PathBuf::from("report.json")));
        assert!(!config.report.include_rows);
        assert_eq!(config.report.chart_width, 30);
    }

    fn args(argv: &[&str]) -> crate::cli::Args {
        use clap::Parser;
        crate::cli::Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_merge_data_dir_override() {
        let mut config: Config = toml::from_str("[general]\ndata_dir = \"/srv/study\"\n").unwrap();
        config.merge_with_args(&args(&["usarec", "tasks"]));
        assert_eq!(config.general.data_dir, PathBuf::from("/srv/study"));

        config.merge_with_args(&args(&["usarec", "tasks", "--data-dir", "/tmp/override"]));
        assert_eq!(config.general.data_dir, PathBuf::from("/tmp/override"));
    }

    #[test]
    fn test_merge_verbose() {
        let mut config: Config = toml::from_str("[general]\nverbose = true\n").unwrap();
        config.merge_with_args(&args(&["usarec", "tasks"]));
        assert!(config.general.verbose);

        let mut config = Config::default();
        config.merge_with_args(&args(&["usarec", "tasks", "-v"]));
        assert!(config.general.verbose);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[study]"));
        assert!(toml_str.contains("[[study.tasks]]"));
        assert!(toml_str.contains("[report]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.study.tasks, Config::default().study.tasks);
    }
}
