//! Command-line interface for screenmap.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{self, Config};
use crate::engine::{Engine, EngineError};
use crate::model::ScreenRef;
use crate::provider::{
    CaptureProvider, GitHubProvider, HttpCaptureProvider, LocalTreeProvider, TreeProvider,
};
use crate::report::{self, Format};
use crate::store::{FileStore, RecordStore};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Branch label used for local directory scans.
const LOCAL_BRANCH: &str = "local";

/// Map a repository's screens, routes and code flows.
///
/// Screenmap detects the framework a repository is built with, discovers
/// its screens and routes, extracts the code flows each screen reaches and
/// keeps per-screen screenshots up to date across commits.
#[derive(Parser)]
#[command(name = "screenmap")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Output format: pretty or json
    #[arg(short, long, global = true, default_value = "pretty")]
    pub format: String,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a GitHub repository branch
    Analyze(AnalyzeArgs),
    /// Analyze a local directory
    Scan(ScanArgs),
    /// Capture screenshots for an analysis
    Capture(CaptureArgs),
    /// Print a stored analysis
    Show(ShowArgs),
}

#[derive(Parser)]
pub struct AnalyzeArgs {
    /// Repository as owner/name
    pub repo: String,

    /// Branch to analyze
    #[arg(short, long, default_value = "main")]
    pub branch: String,

    /// Access token for private repositories
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(Parser)]
pub struct ScanArgs {
    /// Directory to scan
    pub path: PathBuf,
}

#[derive(Parser)]
pub struct CaptureArgs {
    /// Analysis id returned by analyze or scan
    pub analysis_id: String,

    /// Base url of the running application
    #[arg(long)]
    pub base_url: String,

    /// Screen ids to capture (default: every screen)
    #[arg(long = "screen")]
    pub screens: Vec<String>,

    /// Capture even when the screenshot is up to date
    #[arg(long)]
    pub force: bool,

    /// Screenshot service endpoint (overrides capture.endpoint)
    #[arg(long, env = "SCREENMAP_CAPTURE_ENDPOINT")]
    pub endpoint: Option<String>,
}

#[derive(Parser)]
pub struct ShowArgs {
    /// Analysis id
    pub analysis_id: String,
}

/// Install the tracing subscriber on stderr.
fn init_tracing(verbose: bool) {
    let filter = log_filter(EnvFilter::try_from_default_env().ok(), verbose);
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init();
}

/// RUST_LOG wins when set; otherwise `--verbose` picks the level.
fn log_filter(from_env: Option<EnvFilter>, verbose: bool) -> EnvFilter {
    from_env.unwrap_or_else(|| EnvFilter::new(if verbose { "debug" } else { "warn" }))
}

/// Load the config from `--config`, or discover one in `dir`.
fn load_config(explicit: Option<&Path>, dir: &Path) -> anyhow::Result<Config> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => Config::discover(dir),
    };
    let config = match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            Config::parse_file(&path)
                .map_err(|e| anyhow::anyhow!("error parsing config {}: {}", path.display(), e))?
        }
        None => Config::default(),
    };
    config::validate(&config).map_err(|e| anyhow::anyhow!("invalid config: {}", e))?;
    Ok(config)
}

fn open_store(config: &Config) -> anyhow::Result<Arc<dyn RecordStore>> {
    let store = match &config.store.dir {
        Some(dir) => FileStore::new(dir),
        None => FileStore::default_location()?,
    };
    tracing::debug!(dir = %store.dir().display(), "using record store");
    Ok(Arc::new(store))
}

fn capture_provider(config: &Config, endpoint: Option<&str>) -> anyhow::Result<Option<Arc<dyn CaptureProvider>>> {
    match endpoint.or(config.capture.endpoint.as_deref()) {
        Some(endpoint) => Ok(Some(Arc::new(HttpCaptureProvider::new(endpoint)?))),
        None => Ok(None),
    }
}

fn spinner(format: Format, message: String) -> Option<ProgressBar> {
    if format != Format::Pretty {
        return None;
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("  {spinner} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    Some(bar)
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread().enable_all().build()?)
}

/// Print an engine error and return the error exit code.
fn report_engine_error(e: &EngineError) -> i32 {
    eprintln!("Error: {}", e);
    if let EngineError::Authorization(_) = e {
        eprintln!("Pass --token or set GITHUB_TOKEN for private repositories");
    }
    EXIT_ERROR
}

/// Run the parsed command line and return the process exit code.
pub fn run(cli: Cli) -> anyhow::Result<i32> {
    init_tracing(cli.global.verbose);

    let Some(format) = Format::parse(&cli.global.format) else {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty' or 'json'",
            cli.global.format
        );
        return Ok(EXIT_ERROR);
    };

    match &cli.command {
        Commands::Analyze(args) => run_analyze(&cli.global, format, args),
        Commands::Scan(args) => run_scan(&cli.global, format, args),
        Commands::Capture(args) => run_capture(&cli.global, format, args),
        Commands::Show(args) => run_show(&cli.global, format, args),
    }
}

pub fn run_analyze(global: &GlobalArgs, format: Format, args: &AnalyzeArgs) -> anyhow::Result<i32> {
    let config = load_config(global.config.as_deref(), Path::new("."))?;
    let trees: Arc<dyn TreeProvider> = Arc::new(GitHubProvider::new(
        &config.fetch.github_api,
        &config.fetch.github_raw,
    )?);
    let store = open_store(&config)?;
    let engine = Engine::new(trees, store, None, config)?;

    let bar = spinner(format, format!("analyzing {}@{}", args.repo, args.branch));
    let result = runtime()?.block_on(engine.analyze(&args.repo, &args.branch, args.token.as_deref()));
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    match result {
        Ok(result) => {
            match format {
                Format::Json => report::write_json(&result)?,
                Format::Pretty => {
                    report::write_analysis_pretty(&format!("{}@{}", args.repo, args.branch), &result)
                }
            }
            Ok(EXIT_SUCCESS)
        }
        Err(e) => Ok(report_engine_error(&e)),
    }
}

pub fn run_scan(global: &GlobalArgs, format: Format, args: &ScanArgs) -> anyhow::Result<i32> {
    let root = match args.path.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };
    if !root.is_dir() {
        eprintln!("Error: {} is not a directory", root.display());
        return Ok(EXIT_ERROR);
    }

    let config = load_config(global.config.as_deref(), &root)?;
    let trees: Arc<dyn TreeProvider> = Arc::new(LocalTreeProvider::new(&root));
    let store = open_store(&config)?;
    let engine = Engine::new(trees, store, None, config)?;

    let repo = root.to_string_lossy().to_string();
    let bar = spinner(format, format!("scanning {}", root.display()));
    let result = runtime()?.block_on(engine.analyze(&repo, LOCAL_BRANCH, None));
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    match result {
        Ok(result) => {
            match format {
                Format::Json => report::write_json(&result)?,
                Format::Pretty => report::write_analysis_pretty(&repo, &result),
            }
            Ok(EXIT_SUCCESS)
        }
        Err(e) => Ok(report_engine_error(&e)),
    }
}

pub fn run_capture(global: &GlobalArgs, format: Format, args: &CaptureArgs) -> anyhow::Result<i32> {
    let config = load_config(global.config.as_deref(), Path::new("."))?;
    let capture = capture_provider(&config, args.endpoint.as_deref())?;
    if capture.is_none() {
        eprintln!("Error: no screenshot service configured (set capture.endpoint or --endpoint)");
        return Ok(EXIT_ERROR);
    }
    // Captures never list trees; the provider only satisfies the engine.
    let trees: Arc<dyn TreeProvider> = Arc::new(LocalTreeProvider::new("."));
    let store = open_store(&config)?;
    let engine = Engine::new(trees, store, capture, config)?;

    let rt = runtime()?;
    let record = match rt.block_on(engine.get_analysis(&args.analysis_id)) {
        Ok(record) => record,
        Err(e) => return Ok(report_engine_error(&e)),
    };
    let screens: Vec<ScreenRef> = if args.screens.is_empty() {
        record.screens.iter().map(ScreenRef::from).collect()
    } else {
        let mut refs = Vec::new();
        for id in &args.screens {
            match record.screen(id) {
                Some(screen) => refs.push(ScreenRef::from(screen)),
                None => {
                    eprintln!("Error: analysis {} has no screen {}", args.analysis_id, id);
                    return Ok(EXIT_ERROR);
                }
            }
        }
        refs
    };

    let bar = spinner(format, format!("capturing {} screens", screens.len()));
    let response = rt.block_on(engine.capture_screenshots(
        &args.analysis_id,
        &args.base_url,
        &screens,
        args.force,
    ));
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    match response {
        Ok(response) => {
            match format {
                Format::Json => report::write_json(&response)?,
                Format::Pretty => report::write_capture_pretty(&response),
            }
            if response.failed() > 0 {
                Ok(EXIT_FAILED)
            } else {
                Ok(EXIT_SUCCESS)
            }
        }
        Err(e) => Ok(report_engine_error(&e)),
    }
}

pub fn run_show(global: &GlobalArgs, format: Format, args: &ShowArgs) -> anyhow::Result<i32> {
    let config = load_config(global.config.as_deref(), Path::new("."))?;
    let trees: Arc<dyn TreeProvider> = Arc::new(LocalTreeProvider::new("."));
    let store = open_store(&config)?;
    let engine = Engine::new(trees, store, None, config)?;

    match runtime()?.block_on(engine.get_analysis(&args.analysis_id)) {
        Ok(record) => {
            match format {
                Format::Json => report::write_json(&record)?,
                Format::Pretty => report::write_record_pretty(&record),
            }
            Ok(EXIT_SUCCESS)
        }
        Err(e) => Ok(report_engine_error(&e)),
    }
}
