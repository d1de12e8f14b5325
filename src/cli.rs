//! Command-line interface argument parsing.
//!
//! Each questionnaire of the study is a subcommand. Parsing only checks
//! shapes; content validation happens in the `forms` module so that a
//! rejected submission is reported the same way however it was entered.

use crate::config::{GeneralConfig, ReportFormat};
use crate::models::TaskOutcome;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// usarec - usability study recorder
///
/// Record consent, demographics, task results and exit questionnaires to
/// CSV datasets, then render an aggregated report.
///
/// Examples:
///   usarec consent --agree
///   usarec demographics --name "Ada Lovelace" --age 36 --occupation Analyst --familiarity familiar
///   usarec task --task "Task 1" --success yes --timed
///   usarec exit --satisfaction 4 --difficulty 2 --feedback "Search was easy"
///   usarec report --format json --output report.json
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .usarec.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the dataset files (created if missing)
    #[arg(long, value_name = "DIR", env = "USAREC_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Study steps and utilities.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show the study introduction
    Intro,

    /// Show the consent agreement and record consent
    Consent {
        /// Agree to the consent terms above
        #[arg(long)]
        agree: bool,
    },

    /// Fill out the demographic questionnaire
    Demographics {
        /// Full name (first and last)
        #[arg(long)]
        name: Option<String>,

        /// Age (18 - 60)
        #[arg(long)]
        age: Option<u32>,

        /// Occupation
        #[arg(long)]
        occupation: Option<String>,

        /// Familiarity: not-familiar, somewhat-familiar or familiar
        #[arg(long)]
        familiarity: Option<String>,
    },

    /// List the tasks in the study catalog
    Tasks,

    /// Record the result of a task
    Task {
        /// Task name or label from the catalog (e.g. "Task 1")
        #[arg(short, long, value_name = "NAME")]
        task: Option<String>,

        /// Was the task completed successfully?
        #[arg(short, long, value_name = "OUTCOME")]
        success: SuccessArg,

        /// Observer notes
        #[arg(short, long, default_value = "")]
        notes: String,

        /// Time the task interactively; the timer stops when Enter is pressed
        ///
        /// Without this flag the task is saved with an empty duration.
        #[arg(long)]
        timed: bool,
    },

    /// Answer the exit questionnaire
    Exit {
        /// Overall satisfaction, 1 (very dissatisfied) to 5 (very satisfied)
        #[arg(long, value_name = "1-5")]
        satisfaction: u8,

        /// Overall difficulty, 1 (very easy) to 5 (very difficult)
        #[arg(long, value_name = "1-5")]
        difficulty: u8,

        /// Additional comments or feedback
        #[arg(short, long, default_value = "")]
        feedback: String,
    },

    /// Render the aggregated report
    Report {
        /// Output format (markdown, json)
        #[arg(long, value_name = "FORMAT")]
        format: Option<ReportFormat>,

        /// Output file path (stdout when omitted)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Generate a default .usarec.toml configuration file
    InitConfig,
}

/// Task outcome as typed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SuccessArg {
    Yes,
    No,
    Partial,
}

impl From<SuccessArg> for TaskOutcome {
    fn from(arg: SuccessArg) -> Self {
        match arg {
            SuccessArg::Yes => TaskOutcome::Yes,
            SuccessArg::No => TaskOutcome::No,
            SuccessArg::Partial => TaskOutcome::Partial,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref dir) = self.data_dir {
            if dir.as_os_str().is_empty() {
                return Err("Data directory must not be empty".to_string());
            }
            if dir.exists() && !dir.is_dir() {
                return Err(format!(
                    "Data directory path is not a directory: {}",
                    dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `--quiet` wins over `verbose = true` in the config file.
    pub fn log_level(&self, general: &GeneralConfig) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || general.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_parse_task() {
        let args = parse(&[
            "usarec", "task", "--task", "Task 2", "--success", "partial", "--timed",
        ]);
        match args.command {
            Command::Task {
                task,
                success,
                notes,
                timed,
            } => {
                assert_eq!(task.as_deref(), Some("Task 2"));
                assert_eq!(TaskOutcome::from(success), TaskOutcome::Partial);
                assert_eq!(notes, "");
                assert!(timed);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_global_options_after_subcommand() {
        let args = parse(&["usarec", "report", "--format", "json", "--data-dir", "/tmp/study"]);
        assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/study")));
        assert!(matches!(
            args.command,
            Command::Report {
                format: Some(ReportFormat::Json),
                output: None
            }
        ));
    }

    #[test]
    fn test_exit_requires_ratings() {
        assert!(Args::try_parse_from(["usarec", "exit", "--satisfaction", "3"]).is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = parse(&["usarec", "intro"]);
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let general = GeneralConfig::default();
        let mut args = parse(&["usarec", "tasks"]);
        assert_eq!(args.log_level(&general), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(&general), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(&general), tracing::Level::ERROR);
    }

    #[test]
    fn test_log_level_from_config() {
        let general = GeneralConfig {
            verbose: true,
            ..GeneralConfig::default()
        };
        let args = parse(&["usarec", "report"]);
        assert_eq!(args.log_level(&general), tracing::Level::DEBUG);

        let quiet = parse(&["usarec", "report", "--quiet"]);
        assert_eq!(quiet.log_level(&general), tracing::Level::ERROR);
    }
}
