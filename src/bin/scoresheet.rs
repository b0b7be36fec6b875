//! CLI binary for scoresheet-extract.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig`, runs the batch, and writes CSV or JSON.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use scoresheet_extract::{
    to_csv, to_json, write_csv_file, write_json_file, BatchOutput, ColumnSpec, CsvOptions, ExtractionConfig,
    ExtractionProgressCallback, Extractor, FileOutcome, ProgressCallback, SourceImage,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live progress bar plus one log line per file.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start time of the file currently in flight.
    started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Mutex::new(None),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        self.started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        self.bar.set_length(total_files as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracting scores from {total_files} files…"))
        ));
    }

    fn on_file_start(&self, _index: usize, _total: usize, status: &str) {
        if let Ok(mut started) = self.started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(status.to_string());
    }

    fn on_file_complete(&self, index: usize, total: usize, record_count: usize) {
        let secs = self.elapsed_secs();
        self.bar.println(format!(
            "  {} File {:>3}/{:<3}  {:<12}  {}",
            green("✓"),
            index + 1,
            total,
            dim(&format!("{record_count:>4} records")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, index: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs();

        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            let mut s: String = error.chars().take(79).collect();
            s.push('\u{2026}');
            s
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} File {:>3}/{:<3}  {}  {}",
            red("✗"),
            index + 1,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_files: usize, succeeded_files: usize) {
        let failed = total_files.saturating_sub(succeeded_files);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} files extracted successfully",
                green("✔"),
                bold(&succeeded_files.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} files extracted  ({} failed)",
                if failed == total_files {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&succeeded_files.to_string()),
                total_files,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract names and scores, CSV to stdout
  scoresheet scan1.jpg scan2.png

  # Extra columns, written to a file
  scoresheet --column "Student ID" --column Class *.jpg -o scores.csv

  # JSON outcomes (one entry per input file)
  scoresheet --json sheet.jpg > outcomes.json

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY    API key for the model endpoint (required)
  GEMINI_ENDPOINT   Override the API base URL
  GEMINI_MODEL      Override the model (default gemini-2.5-flash)

A .env file in the working directory is loaded automatically.
"#;

/// Extract student names and scores from score-sheet images.
#[derive(Parser, Debug)]
#[command(
    name = "scoresheet",
    version,
    about = "Extract student names and scores from score-sheet images using a vision LLM",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image files (JPEG or PNG).
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Extra column to extract; repeat for more (e.g. --column "Student ID").
    #[arg(long = "column", value_name = "LABEL")]
    columns: Vec<String>,

    /// Write CSV to this file instead of stdout.
    #[arg(short, long, env = "SCORESHEET_OUTPUT")]
    output: Option<PathBuf>,

    /// Output JSON outcomes instead of CSV.
    #[arg(long, env = "SCORESHEET_JSON")]
    json: bool,

    /// Omit the UTF-8 byte-order mark from CSV output.
    #[arg(long)]
    no_bom: bool,

    /// Model API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model API base URL.
    #[arg(long, env = "GEMINI_ENDPOINT")]
    endpoint: Option<String>,

    /// Model identifier.
    #[arg(long, env = "GEMINI_MODEL")]
    model: Option<String>,

    /// Path to a text file replacing the built-in extraction instructions.
    #[arg(long, env = "SCORESHEET_INSTRUCTIONS")]
    instructions: Option<PathBuf>,

    /// Total attempts per file on HTTP 429/5xx.
    #[arg(long, env = "SCORESHEET_MAX_ATTEMPTS", default_value_t = 3)]
    max_attempts: u32,

    /// Per-attempt request timeout in seconds.
    #[arg(long, env = "SCORESHEET_TIMEOUT", default_value_t = 60)]
    timeout: u64,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "SCORESHEET_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Disable progress bar.
    #[arg(long, env = "SCORESHEET_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SCORESHEET_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SCORESHEET_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Populate GEMINI_* from .env before clap reads the environment.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;
    let columns = ColumnSpec::new(&cli.columns).context("Invalid --column value")?;
    let extractor = Extractor::new(&config).context("Failed to initialise extractor")?;

    // ── Ctrl-C cancels remaining files ───────────────────────────────────
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted; remaining files will be marked cancelled");
                cancel.cancel();
            }
        });
    }

    // ── Run extraction ───────────────────────────────────────────────────
    let images: Vec<_> = cli
        .images
        .iter()
        .map(SourceImage::from_path)
        .collect();
    let output = extractor
        .extract_batch_with_cancel(&images, &columns, &cancel)
        .await;

    write_output(&cli, &output, &columns).await?;

    if !cli.quiet {
        print_summary(&output, show_progress);
    }

    if output.stats.total_files > 0 && output.stats.succeeded_files == 0 {
        anyhow::bail!("All {} files failed", output.stats.total_files);
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .max_attempts(cli.max_attempts)
        .request_timeout_secs(cli.timeout)
        .temperature(cli.temperature);

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(ref endpoint) = cli.endpoint {
        builder = builder.endpoint(endpoint.clone());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref path) = cli.instructions {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read instructions from {:?}", path))?;
        builder = builder.system_prompt(text);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn write_output(cli: &Cli, output: &BatchOutput, columns: &ColumnSpec) -> Result<()> {
    if cli.json {
        return match cli.output {
            Some(ref path) => write_json_file(path, &output.outcomes)
                .await
                .context("Failed to write JSON"),
            None => write_stdout(&to_json(&output.outcomes)?),
        };
    }

    let options = CsvOptions {
        byte_order_mark: !cli.no_bom,
        ..CsvOptions::default()
    };

    match cli.output {
        Some(ref path) => write_csv_file(path, &output.outcomes, columns, &options)
            .await
            .context("Failed to write CSV"),
        None => write_stdout(&to_csv(&output.outcomes, columns, &options)),
    }
}

fn write_stdout(text: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(text.as_bytes())
        .and_then(|_| handle.flush())
        .context("Failed to write to stdout")
}

fn print_summary(output: &BatchOutput, show_progress: bool) {
    let stats = &output.stats;
    if !show_progress {
        eprintln!(
            "Extracted {} records from {}/{} files in {}ms",
            stats.total_records, stats.succeeded_files, stats.total_files, stats.duration_ms
        );
        for outcome in &output.outcomes {
            if let FileOutcome::Failure {
                source_file_name,
                error_kind,
                message,
            } = outcome
            {
                eprintln!("  {source_file_name}: {error_kind}: {message}");
            }
        }
    } else {
        eprintln!(
            "   {} records in {}ms",
            dim(&stats.total_records.to_string()),
            stats.duration_ms,
        );
    }
}
