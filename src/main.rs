//! usarec - usability study recorder
//!
//! A CLI tool that records usability-study responses (consent,
//! demographics, task results, exit questionnaire) to CSV datasets
//! and renders an aggregated report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, storage, report writing)
//!   2 - Submission rejected by validation

mod analysis;
mod cli;
mod config;
mod error;
mod forms;
mod models;
mod report;
mod session;
mod store;

use anyhow::{Context, Result};
use cli::{Args, Command};
use config::{Config, ReportFormat, StudyConfig, TaskDefinition, CONFIG_FILE_NAME};
use error::SubmitError;
use forms::{ConsentForm, DemographicForm, ExitForm, TaskForm};
use indicatif::{ProgressBar, ProgressStyle};
use report::{RenderOptions, UsabilityReport};
use session::TaskSession;
use std::path::{Path, PathBuf};
use std::time::Duration;
use store::RecordStore;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if matches!(args.command, Command::InitConfig) {
        return handle_init_config();
    }

    // Load configuration before logging so `verbose` in the file applies
    let (mut config, source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(args.log_level(&config.general));

    debug!("usarec v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    log_config_source(&source);

    match run(args, config) {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle init-config: generate a default .usarec.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE_NAME);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize the data directory, task catalog and report.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// `USAREC_LOG` overrides the level with a full filter directive. Logs go to
/// stderr so a report printed to stdout stays clean.
fn init_logging(level: tracing::Level) {
    let filter = EnvFilter::try_from_env("USAREC_LOG")
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Dispatch a subcommand. Returns the process exit code.
fn run(args: Args, config: Config) -> Result<i32> {
    match args.command.clone() {
        Command::Intro => {
            print_intro(&config.study);
            Ok(0)
        }
        Command::Consent { agree } => {
            print_consent_agreement();
            let store = open_store(&config)?;
            finish(
                forms::submit(&store, &ConsentForm { agreed: agree }),
                |_| println!("✅ Consent submitted."),
            )
        }
        Command::Demographics {
            name,
            age,
            occupation,
            familiarity,
        } => {
            let form = DemographicForm {
                name,
                age,
                occupation,
                familiarity,
            };
            let store = open_store(&config)?;
            finish(forms::submit(&store, &form), |_| {
                println!("✅ Demographic questionnaire submitted.")
            })
        }
        Command::Tasks => {
            print_task_catalog(&config.study.tasks);
            Ok(0)
        }
        Command::Task {
            task,
            success,
            notes,
            timed,
        } => {
            let form = TaskForm {
                task,
                success: success.into(),
                notes,
            };
            handle_task(&config, &form, timed, args.quiet)
        }
        Command::Exit {
            satisfaction,
            difficulty,
            feedback,
        } => {
            let form = ExitForm {
                satisfaction,
                difficulty,
                open_feedback: feedback,
            };
            let store = open_store(&config)?;
            finish(forms::submit(&store, &form), |record| {
                println!(
                    "   Satisfaction: {} ({})",
                    record.satisfaction,
                    record.satisfaction.satisfaction_label()
                );
                println!(
                    "   Difficulty: {} ({})",
                    record.difficulty,
                    record.difficulty.difficulty_label()
                );
                println!("✅ Exit questionnaire data saved.");
            })
        }
        Command::Report { format, output } => {
            let format = format.unwrap_or(config.report.format);
            let output = output.or_else(|| config.report.output.clone());
            handle_report(&config, format, output.as_deref())
        }
        Command::InitConfig => {
            handle_init_config()?;
            Ok(0)
        }
    }
}

/// Report the outcome of a submission and map it to an exit code.
fn finish<R>(result: Result<R, SubmitError>, on_success: impl FnOnce(&R)) -> Result<i32> {
    match result {
        Ok(record) => {
            on_success(&record);
            Ok(0)
        }
        Err(e) => {
            if let SubmitError::Storage(ref storage) = e {
                error!("Storage failure: {}", storage);
            }
            eprintln!("❌ {}", e);
            Ok(e.exit_code())
        }
    }
}

/// Validate the task form, optionally time it, and save the result.
fn handle_task(config: &Config, form: &TaskForm, timed: bool, quiet: bool) -> Result<i32> {
    let draft = match form.validate(&config.study.tasks) {
        Ok(draft) => draft,
        Err(e) => return finish::<()>(Err(e.into()), |_| {}),
    };

    if let Some(definition) = forms::find_task(&config.study.tasks, &draft.task_name) {
        println!("📋 {}", definition.label());
        if !definition.description.is_empty() {
            println!("   {}", definition.description);
        }
    }

    let store = open_store(config)?;
    let mut session = TaskSession::new();

    if timed {
        run_timer(&mut session, &draft.task_name, quiet)?;
    }
    debug!(
        "Saving {} with timer {:?} ({:?})",
        draft.task_name,
        session.status(),
        session.last_duration()
    );

    finish(
        session.save(&draft, &store).map_err(SubmitError::from),
        |_| println!("✅ Task results saved."),
    )
}

/// Run the task timer until the observer presses Enter.
fn run_timer(session: &mut TaskSession, task_name: &str, quiet: bool) -> Result<()> {
    println!("⏱️  Task timer started. Complete the task, then press Enter to stop.");
    session.start();
    info!("Timer started for {}", task_name);

    let spinner = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
        );
        pb.set_message(format!("{} in progress", task_name));
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    };

    let mut line = String::new();
    let read = std::io::stdin().read_line(&mut line);
    let elapsed = session.stop();
    spinner.finish_and_clear();
    read.context("Failed to read from stdin")?;

    if let Some(duration) = elapsed {
        println!(
            "   Task duration recorded: {:.2} seconds",
            duration.as_secs_f64()
        );
    }
    Ok(())
}

/// Aggregate all datasets and write or print the report.
fn handle_report(config: &Config, format: ReportFormat, output: Option<&Path>) -> Result<i32> {
    let store = open_store(config)?;
    let report = UsabilityReport::build(&store, &config.study.title);

    if report.is_empty() {
        info!("No study data recorded yet in {}", store.root().display());
    }

    let content = match format {
        ReportFormat::Json => report::generate_json_report(&report)?,
        ReportFormat::Markdown => {
            report::generate_markdown_report(&report, RenderOptions::from(&config.report))
        }
    };

    match output {
        Some(path) => {
            std::fs::write(path, &content)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!("📊 Report saved to: {}", path.display());
        }
        None => print!("{}", content),
    }

    Ok(0)
}

fn open_store(config: &Config) -> Result<RecordStore> {
    let dir: &PathBuf = &config.general.data_dir;
    debug!("Using data directory: {}", dir.display());
    RecordStore::open(dir).context("Storage is unavailable")
}

/// Where the active configuration came from.
enum ConfigSource {
    Explicit(PathBuf),
    DefaultFile,
    Builtin,
    Fallback(anyhow::Error),
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is set up, so the outcome is returned and logged later.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::Explicit(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigSource::DefaultFile)),
        Ok(None) => Ok((Config::default(), ConfigSource::Builtin)),
        Err(e) => Ok((Config::default(), ConfigSource::Fallback(e))),
    }
}

fn log_config_source(source: &ConfigSource) {
    match source {
        ConfigSource::Explicit(path) => info!("Loaded config from: {}", path.display()),
        ConfigSource::DefaultFile => debug!("Loaded default config from {}", CONFIG_FILE_NAME),
        ConfigSource::Builtin => debug!("No config file found, using defaults"),
        ConfigSource::Fallback(e) => warn!("Failed to load config: {:#}", e),
    }
}

fn print_intro(study: &StudyConfig) {
    println!("# {}\n", study.title);
    println!("Welcome to the usability study.\n");
    println!("In this study, you will:");
    println!("  1. Provide consent for data collection.      (usarec consent --agree)");
    println!("  2. Fill out a short demographic questionnaire. (usarec demographics ...)");
    println!("  3. Perform one or more tasks.                 (usarec task ...)");
    println!("  4. Answer an exit questionnaire.              (usarec exit ...)");
    println!("  5. View a summary report.                     (usarec report)");
}

fn print_consent_agreement() {
    println!("Consent Agreement:\n");
    println!("By participating, you agree to allow your responses and feedback");
    println!("during the questionnaire to be recorded and used for research purposes only.");
    println!("No personal information will be shared with the public.\n");
    println!("  - I acknowledge my data will be used for research purposes.");
    println!("  - I acknowledge my information will not be shared with the public.\n");
}

fn print_task_catalog(tasks: &[TaskDefinition]) {
    if tasks.is_empty() {
        println!("No tasks configured. Add [[study.tasks]] entries to {}.", CONFIG_FILE_NAME);
        return;
    }

    println!("Available tasks:\n");
    for task in tasks {
        println!("  📋 {}", task.label());
        if !task.description.is_empty() {
            println!("     {}", task.description);
        }
    }
}
