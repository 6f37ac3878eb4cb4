//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use blockdocs_core::{
    BatchReport, BatchSummary, FileOutcome, OutcomeKind, Overrides, ProgressReporter, Settings,
};
use blockdocs_lbc::LbcClient;
use blockdocs_ledger::Ledger;
use blockdocs_markdown::load_catalog;
use blockdocs_media::MediaUploader;
use blockdocs_shared::{AppConfig, init_config, load_config, load_config_from};
use blockdocs_summarizer::Summarizer;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// blockdocs: publish and maintain a blockchain docs site.
#[derive(Parser)]
#[command(
    name = "blockdocs",
    version,
    about = "Summarize, publish, cross-link, and annotate markdown articles.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.blockdocs/blockdocs.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Publication ledger file (overrides the config).
    #[arg(long, global = true)]
    pub ledger: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Publish a markdown file, or every markdown file under a directory.
    Publish {
        /// File or directory to publish.
        path: PathBuf,

        /// Republish files already recorded in the ledger.
        #[arg(long)]
        force: bool,
    },

    /// Push local content to already-published articles.
    Update {
        /// Single file to update.
        file: Option<PathBuf>,

        /// Update every article recorded in the ledger.
        #[arg(long)]
        all: bool,
    },

    /// Link catalog terms in markdown files.
    Terms {
        /// File or directory to annotate.
        path: PathBuf,

        /// Term catalog (markdown list of `[term](url)` links).
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Report changes without writing files.
        #[arg(long)]
        dry_run: bool,
    },

    /// Remove catalog term links from markdown files.
    Unlink {
        /// File or directory to clean.
        path: PathBuf,

        /// Term catalog (markdown list of `[term](url)` links).
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Report changes without writing files.
        #[arg(long)]
        dry_run: bool,
    },

    /// Point links between local articles at their published URLs.
    Relink {
        /// File or directory to rewrite.
        #[arg(default_value = "docs")]
        path: PathBuf,

        /// Report changes without writing files.
        #[arg(long)]
        dry_run: bool,
    },

    /// Upload images or videos (URLs or local files) to object storage.
    Upload {
        /// Source URLs or file paths.
        #[arg(required = true)]
        sources: Vec<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "blockdocs=info",
        1 => "blockdocs=debug",
        _ => "blockdocs=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let Cli {
        config,
        ledger,
        command,
        ..
    } = cli;
    let config_path = config.as_deref();

    match command {
        Command::Publish { path, force } => {
            let settings = settings(config_path, ledger, None)?;
            cmd_publish(&settings, &path, force).await
        }
        Command::Update { file, all } => {
            let settings = settings(config_path, ledger, None)?;
            cmd_update(&settings, file.as_deref(), all).await
        }
        Command::Terms {
            path,
            catalog,
            dry_run,
        } => {
            let settings = settings(config_path, ledger, catalog)?;
            cmd_terms(&settings, &path, dry_run)
        }
        Command::Unlink {
            path,
            catalog,
            dry_run,
        } => {
            let settings = settings(config_path, ledger, catalog)?;
            cmd_unlink(&settings, &path, dry_run)
        }
        Command::Relink { path, dry_run } => {
            let settings = settings(config_path, ledger, None)?;
            cmd_relink(&settings, &path, dry_run)
        }
        Command::Upload { sources } => {
            let settings = settings(config_path, ledger, None)?;
            cmd_upload(&settings, &sources).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn load_app_config(config_path: Option<&Path>) -> Result<AppConfig> {
    Ok(match config_path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    })
}

fn settings(config_path: Option<&Path>, ledger: Option<PathBuf>, catalog: Option<PathBuf>) -> Result<Settings> {
    let config = load_app_config(config_path)?;
    Ok(Settings::resolve(config, Overrides { ledger, catalog }))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_publish(settings: &Settings, path: &Path, force: bool) -> Result<()> {
    let files = blockdocs_core::collect_markdown_files(path)?;
    if files.is_empty() {
        warn!(path = %path.display(), "no markdown files found");
        return Ok(());
    }

    let summarizer = Summarizer::new(settings.summarizer_options()?)?;
    let lbc = LbcClient::new(settings.lbc_options()?)?;
    let mut ledger = Ledger::open(&settings.ledger_path);
    let publish = settings.publish_settings(force);

    info!(files = files.len(), model = summarizer.model(), force, "publishing");
    let reporter = CliProgress::new();
    let report =
        blockdocs_core::publish_batch(&files, &summarizer, &lbc, &mut ledger, &publish, &reporter).await;

    print_report("Publish", &report, false);
    Ok(())
}

async fn cmd_update(settings: &Settings, file: Option<&Path>, all: bool) -> Result<()> {
    let ledger = Ledger::open(&settings.ledger_path);
    let cwd = std::env::current_dir()?;
    let targets = blockdocs_core::update_targets(file, all, &ledger, &cwd)?;

    let lbc = LbcClient::new(settings.lbc_options()?)?;
    info!(targets = targets.len(), ledger = ledger.len(), "updating");

    let reporter = CliProgress::new();
    let report = blockdocs_core::update_batch(&targets, &lbc, &ledger, &reporter).await;

    print_report("Update", &report, false);
    Ok(())
}

fn cmd_terms(settings: &Settings, path: &Path, dry_run: bool) -> Result<()> {
    let files = blockdocs_core::collect_markdown_files(path)?;
    let dict = load_catalog(&settings.catalog_path)?;
    if dict.is_empty() {
        return Err(eyre!("no terms found in {}", settings.catalog_path.display()));
    }
    info!(terms = dict.len(), files = files.len(), "linking terms");

    let reporter = CliProgress::new();
    let report = blockdocs_core::annotate_files(
        &files,
        &dict,
        &settings.annotate_options(),
        dry_run,
        &reporter,
    );

    print_report("Terms", &report, dry_run);
    Ok(())
}

fn cmd_unlink(settings: &Settings, path: &Path, dry_run: bool) -> Result<()> {
    let files = blockdocs_core::collect_markdown_files(path)?;
    let dict = load_catalog(&settings.catalog_path)?;
    info!(terms = dict.len(), files = files.len(), "removing term links");

    let reporter = CliProgress::new();
    let report = blockdocs_core::unlink_files(&files, &dict, dry_run, &reporter);

    print_report("Unlink", &report, dry_run);
    Ok(())
}

fn cmd_relink(settings: &Settings, path: &Path, dry_run: bool) -> Result<()> {
    let files = blockdocs_core::collect_markdown_files(path)?;
    let ledger = Ledger::open(&settings.ledger_path);
    if ledger.is_empty() {
        warn!(ledger = %settings.ledger_path.display(), "ledger is empty, nothing to link to");
    }
    info!(articles = ledger.len(), files = files.len(), "relinking");

    let reporter = CliProgress::new();
    let report = blockdocs_core::relink_files(&files, &ledger, settings.site_url(), dry_run, &reporter);

    print_report("Relink", &report, dry_run);
    Ok(())
}

async fn cmd_upload(settings: &Settings, sources: &[String]) -> Result<()> {
    let uploader = MediaUploader::new(settings.media_options()?)?;

    let reporter = CliProgress::new();
    let report = blockdocs_core::upload_sources(sources, &uploader, &reporter).await;

    for (source, outcome) in &report.outcomes {
        if let FileOutcome::Uploaded { url } = outcome {
            println!("{source} -> {url}");
        }
    }
    print_summary("Upload", &report.summary, false);
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = load_app_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_report(label: &str, report: &BatchReport, dry_run: bool) {
    if report.outcomes.is_empty() {
        println!("{label}: nothing to do");
        return;
    }
    print_summary(label, &report.summary, dry_run);
}

fn print_summary(label: &str, summary: &BatchSummary, dry_run: bool) {
    println!();
    println!("  {label} complete{}", if dry_run { " (dry run)" } else { "" });
    println!("  Succeeded: {}", summary.succeeded);
    println!("  Skipped:   {}", summary.skipped);
    println!("  Failed:    {}", summary.failed);
    if summary.changes > 0 {
        println!("  Changes:   {}", summary.changes);
    }
    println!("  Total:     {}", summary.total());
    if dry_run && summary.changes > 0 {
        println!();
        println!("  Run without --dry-run to apply changes.");
    }
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn item_started(&self, item: &str, current: usize, total: usize) {
        self.spinner.set_message(format!("[{current}/{total}] {item}"));
    }

    fn item_finished(&self, item: &str, outcome: &FileOutcome) {
        let mark = match outcome.kind() {
            OutcomeKind::Succeeded => "✓",
            OutcomeKind::Skipped => "○",
            OutcomeKind::Failed => "✗",
        };
        self.spinner.println(format!("{mark} {item}: {outcome}"));
    }

    fn done(&self, _summary: &BatchSummary) {
        self.spinner.finish_and_clear();
    }
}
