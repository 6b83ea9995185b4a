// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};

use linguabatch::app_config::{self, Config, TranslationProvider};
use linguabatch::app_controller::Controller;
use linguabatch::database::models::JobRecord;
use linguabatch::jobs::{GlossaryGenerationOptions, RunSummary, TranslateFileOptions};
use linguabatch::language_utils;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Ollama,
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
    #[value(name = "lmstudio")]
    LMStudio,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
            CliTranslationProvider::LMStudio => TranslationProvider::LMStudio,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import a plain-text file, one segment per paragraph
    Import(ImportArgs),

    /// Translate the remaining segments of a file
    Translate(TranslateArgs),

    /// Generate new glossary terms for a language pair
    Glossary(GlossaryArgs),

    /// Show the state of a job
    Status {
        #[arg(value_name = "JOB_ID")]
        job_id: String,
    },

    /// Ask a job to stop at its next batch boundary
    Stop {
        #[arg(value_name = "JOB_ID")]
        job_id: String,

        /// Also clear the file's translating flag (for runners that died)
        #[arg(long)]
        release: bool,
    },

    /// List recent jobs
    Jobs {
        /// Only jobs of this user
        #[arg(short, long)]
        user: Option<String>,

        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Show the notifications of a user
    Notifications {
        #[arg(short, long, default_value = "local")]
        user: String,

        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// Mark the listed notifications as read
        #[arg(long)]
        mark_read: bool,
    },

    /// Show database statistics
    Stats,

    /// Generate shell completions for linguabatch
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct ImportArgs {
    /// Plain-text file to import
    #[arg(value_name = "PATH")]
    path: PathBuf,

    /// Display name of the file (defaults to the file name)
    #[arg(short, long)]
    name: Option<String>,

    /// Source language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Comma separated target language codes (e.g., 'fr,de')
    #[arg(short, long)]
    target_languages: Option<String>,

    #[arg(short, long, default_value = "local")]
    user: String,
}

#[derive(Args, Debug)]
struct TranslateArgs {
    #[arg(value_name = "FILE_ID")]
    file_id: String,

    /// Target language code (defaults to the file's first target language)
    #[arg(short, long)]
    target_language: Option<String>,

    /// Translate at most this many segments
    #[arg(short, long)]
    limit: Option<usize>,

    #[arg(short, long, default_value = "local")]
    user: String,

    /// Wait without a progress bar
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Args, Debug)]
struct GlossaryArgs {
    /// Source language code
    #[arg(short, long)]
    source: Option<String>,

    /// Target language code
    #[arg(short, long)]
    target: Option<String>,

    /// Number of terms to request
    #[arg(short = 'n', long, default_value_t = 50)]
    count: usize,

    /// Subject domain, e.g. 'legal' or 'medical'
    #[arg(short, long)]
    domain: Option<String>,

    #[arg(short, long, default_value = "local")]
    user: String,

    /// Wait without a progress bar
    #[arg(short, long)]
    quiet: bool,
}

/// linguabatch - bulk AI translation jobs
///
/// Imports plain-text files as segments and translates them, or generates
/// glossary terms, with cancellable background jobs.
#[derive(Parser, Debug)]
#[command(name = "linguabatch")]
#[command(version)]
#[command(about = "Cancellable bulk AI translation and glossary generation")]
#[command(long_about = "linguabatch runs bulk translation and glossary generation jobs against an AI provider.

EXAMPLES:
    linguabatch import notes.txt -s en -t fr,de      # Import a text file
    linguabatch translate <FILE_ID>                  # Translate all remaining segments
    linguabatch translate <FILE_ID> -t de -l 20      # Translate 20 segments into German
    linguabatch glossary -s en -t fr -n 100 -d legal # Generate 100 legal terms
    linguabatch stop <JOB_ID>                        # Stop a job at its next batch
    linguabatch completions bash > linguabatch.bash  # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.

SUPPORTED PROVIDERS:
    ollama    - Local Ollama server (default: llama3.2:3b)
    openai    - OpenAI API (requires API key)
    anthropic - Anthropic Claude API (requires API key)
    lmstudio  - LM Studio local server (OpenAI-compatible on http://localhost:1234/v1)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Translation provider to use
    #[arg(short, long, global = true, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// API key for the provider
    #[arg(long, global = true, env = "LINGUABATCH_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The filter is kept at trace; the effective level is set through max_level
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "linguabatch", &mut std::io::stdout());
        return Ok(());
    }

    if let Some(level) = &cli.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let config = load_config(&cli)?;
    if cli.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    // Only commands that call the provider need a complete provider configuration
    if matches!(cli.command, Commands::Translate(_) | Commands::Glossary(_)) {
        config.validate().context("Configuration validation failed")?;
    }

    let controller = Controller::with_config(config)?;
    run_command(&controller, cli.command).await
}

/// Load the config file and apply command line overrides
fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    let mut config = Config::load_or_create(Path::new(&cli.config_path))?;

    if let Some(provider) = &cli.provider {
        config.translation.provider = provider.clone().into();
    }
    if let Some(model) = &cli.model {
        config.translation.active_provider_config_mut().model = model.clone();
    }
    if let Some(api_key) = &cli.api_key {
        config.translation.active_provider_config_mut().api_key = api_key.clone();
    }
    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }
    Ok(config)
}

async fn run_command(controller: &Controller, command: Commands) -> Result<()> {
    match command {
        Commands::Import(args) => {
            let targets = args
                .target_languages
                .as_deref()
                .map(language_utils::parse_language_list)
                .transpose()?;
            let summary = controller
                .import_file(
                    &args.path,
                    args.name.as_deref(),
                    args.source_language.as_deref(),
                    targets,
                    &args.user,
                )
                .await?;
            println!("{}", summary.file.id);
            info!(
                "{} segments into {}",
                summary.segment_count,
                summary.file.target_languages.join(", ")
            );
        }
        Commands::Translate(args) => {
            let mut options = TranslateFileOptions::default();
            if let Some(language) = args.target_language {
                options = options.with_target_language(language);
            }
            if let Some(limit) = args.limit {
                options = options.with_limit(limit);
            }
            let summary = controller
                .translate_file(&args.user, &args.file_id, options, !args.quiet)
                .await?;
            print_summary(&summary);
        }
        Commands::Glossary(args) => {
            let config = controller.config();
            let source = args.source.unwrap_or_else(|| config.source_language.clone());
            let target = match args.target {
                Some(target) => target,
                None => config
                    .default_target_languages
                    .first()
                    .cloned()
                    .context("No target language given or configured")?,
            };
            let options = GlossaryGenerationOptions::new(&source, &target, args.count).with_domain(args.domain);
            let summary = controller.generate_glossary(&args.user, options, !args.quiet).await?;
            print_summary(&summary);
        }
        Commands::Status { job_id } => {
            let job = controller.job_status(&job_id).await?;
            print_job(&job);
            if let Some(detail) = &job.error_detail {
                println!("  error: {}", detail);
            }
        }
        Commands::Stop { job_id, release } => {
            if controller.stop_job(&job_id, release).await? {
                println!("Stop requested for job {}", job_id);
            } else {
                warn!("Job {} has already finished", job_id);
            }
        }
        Commands::Jobs { user, limit } => {
            let jobs = controller.list_jobs(user.as_deref(), limit).await?;
            if jobs.is_empty() {
                info!("No jobs found");
            }
            for job in &jobs {
                print_job(job);
            }
        }
        Commands::Notifications { user, limit, mark_read } => {
            let notifications = controller.notifications(&user, limit, mark_read).await?;
            if notifications.is_empty() {
                info!("No notifications for {}", user);
            }
            for notification in &notifications {
                let marker = if notification.is_read { " " } else { "*" };
                println!(
                    "{} {} [{}] {}: {}",
                    marker, notification.created_at, notification.kind, notification.title, notification.message
                );
                if let Some(link) = &notification.link {
                    println!("    {}", link);
                }
            }
        }
        Commands::Stats => {
            println!("{}", controller.stats()?);
        }
        Commands::Completions { .. } => {}
    }
    Ok(())
}

fn print_job(job: &JobRecord) {
    let progress = match (job.target_count, job.completion_percentage()) {
        (Some(total), Some(percent)) => format!("{}/{} ({:.0}%)", job.progress, total, percent),
        _ => job.progress.to_string(),
    };
    println!(
        "{}  {:<10}  {:<30}  progress {}  updated {}  {}",
        job.id, job.status.to_string(), job.scope.to_string(), progress, job.updated_count, job.updated_at
    );
}

fn print_summary(summary: &RunSummary) {
    println!(
        "Job {} {}: {} processed, {} updated",
        summary.job_id, summary.status, summary.processed, summary.updated
    );
    if let Some(detail) = &summary.error_detail {
        println!("  error: {}", detail);
    }
}
