//! CLI binary for svgstamp.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `GenerationConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use svgstamp::{
    generate, GenerationConfig, GenerationOutput, GenerationProgressCallback, PageSize,
    PlaceholderTable, ProgressCallback, Stage,
};
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar advanced per stage plus a log line
/// for each finished or failed stage.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Wall-clock start of the stage currently running.
    stage_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(Stage::ALL.len() as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:24.green/238}] {pos}/{len}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        bar.set_style(style);
        bar.set_prefix("Generating");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            stage_started: Mutex::new(None),
        })
    }

    fn elapsed(&self) -> String {
        let ms = self
            .stage_started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);
        dim(&format!("{:.2}s", ms as f64 / 1000.0))
    }

    /// Clear the bar after a fatal error, which ends the run before
    /// `on_generation_complete` is reached.
    fn abandon(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

impl GenerationProgressCallback for CliProgressCallback {
    fn on_generation_start(&self, total_stages: usize) {
        self.bar.set_length(total_stages as u64);
    }

    fn on_stage_start(&self, stage: Stage) {
        if let Ok(mut t) = self.stage_started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_message(stage.to_string());
    }

    fn on_stage_complete(&self, stage: Stage, detail: &str) {
        self.bar.println(format!(
            "  {} {:<14} {}  {}",
            green("✓"),
            stage.as_str(),
            dim(detail),
            self.elapsed(),
        ));
        self.bar.inc(1);
    }

    fn on_stage_error(&self, stage: Stage, error: &str) {
        // Keep the bar tidy; the full message is logged and summarised later.
        let first_line = error.lines().next().unwrap_or(error);
        let msg = if first_line.chars().count() > 80 {
            let cut: String = first_line.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            first_line.to_string()
        };

        self.bar.println(format!(
            "  {} {:<14} {}  {}",
            red("✗"),
            stage.as_str(),
            red(&msg),
            self.elapsed(),
        ));
        self.bar.inc(1);
    }

    /// The summary printed by `main` follows, so only the bar is cleared.
    fn on_generation_complete(&self, _failed_stages: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Fill the default template with the built-in sample values
  svgstamp

  # Your own template, photo and values
  svgstamp flyer.svg --image photo.jpg --set '$title=Estate Sale' --set '$date=Sat 9am'

  # Values from a JSON object (keys are the literal tokens, order is kept)
  svgstamp flyer.svg --image https://example.com/photo.jpg --placeholders values.json

  # Custom output paths and page
  svgstamp card.svg --image card.png --out-svg out/card.svg --out-png out/card.png \
      --out-pdf out/card.pdf --page-size letter --scale 2

  # Machine-readable summary
  svgstamp card.svg --image card.png --json > result.json

PLACEHOLDERS:
  Each token is replaced at its first occurrence inside every <text> element.
  A --placeholders file is a flat JSON object of string values:
    { "$title": "Estate Sale", "$date": "Saturday 9am" }
  --set values are applied on top of the file, in command-line order.
  Without either option the built-in sample table is used.

ENVIRONMENT VARIABLES:
  SVGSTAMP_IMAGE                 Image URL or path
  SVGSTAMP_PLACEHOLDERS          JSON placeholder file
  SVGSTAMP_REGION_ID             Id of the element replaced by the image
  SVGSTAMP_OUT_SVG               Filled SVG output path
  SVGSTAMP_OUT_PNG               PNG output path
  SVGSTAMP_OUT_PDF               PDF output path
  SVGSTAMP_PAGE_SIZE             PDF page size (a4, letter, WxH in points)
  SVGSTAMP_SCALE                 Pixels per SVG unit when rasterising
  SVGSTAMP_KEEP_TEXT_ANCHORING   Keep text-anchor / dominant-baseline
  SVGSTAMP_TITLE                 Title stored in the PDF metadata
  SVGSTAMP_DOWNLOAD_TIMEOUT      Image download timeout in seconds
  SVGSTAMP_JSON                  Print the result as JSON
  SVGSTAMP_NO_PROGRESS           Disable the progress bar
  SVGSTAMP_VERBOSE / _QUIET      Log verbosity
  RUST_LOG                       Log filter (overrides -v / -q)
"#;

/// Fill SVG templates with text and an image; export SVG, PNG and PDF.
#[derive(Parser, Debug)]
#[command(
    name = "svgstamp",
    version,
    about = "Fill SVG templates with text and an image; export SVG, PNG and PDF",
    long_about = "Fill an SVG template: replace $placeholder tokens in its text, swap a marked \
rectangle for an embedded photo, and write the result as SVG, PNG and a single-page PDF with \
the rendering scaled to fit and centred.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// SVG template path. Default: auctionit.svg.
    template: Option<PathBuf>,

    /// Image to embed: HTTP/HTTPS URL or local file path.
    #[arg(long, env = "SVGSTAMP_IMAGE")]
    image: Option<String>,

    /// Placeholder assignment TOKEN=VALUE (repeatable).
    #[arg(long = "set", value_name = "TOKEN=VALUE")]
    set: Vec<String>,

    /// JSON file with a placeholder object.
    #[arg(long, env = "SVGSTAMP_PLACEHOLDERS", value_name = "FILE.json")]
    placeholders: Option<PathBuf>,

    /// Id of the element replaced by the image.
    #[arg(long, env = "SVGSTAMP_REGION_ID")]
    region_id: Option<String>,

    /// Filled SVG output path.
    #[arg(long, env = "SVGSTAMP_OUT_SVG")]
    out_svg: Option<PathBuf>,

    /// PNG output path.
    #[arg(long, env = "SVGSTAMP_OUT_PNG")]
    out_png: Option<PathBuf>,

    /// PDF output path.
    #[arg(long, env = "SVGSTAMP_OUT_PDF")]
    out_pdf: Option<PathBuf>,

    /// PDF page size: a4, letter, or WIDTHxHEIGHT in points.
    #[arg(long, env = "SVGSTAMP_PAGE_SIZE", default_value = "a4")]
    page_size: PageSize,

    /// Pixels per SVG unit when rasterising (0.1–16).
    #[arg(long, env = "SVGSTAMP_SCALE", default_value_t = 1.0)]
    scale: f32,

    /// Keep text-anchor / dominant-baseline on <text> elements.
    #[arg(long, env = "SVGSTAMP_KEEP_TEXT_ANCHORING")]
    keep_text_anchoring: bool,

    /// Title stored in the PDF metadata.
    #[arg(long, env = "SVGSTAMP_TITLE")]
    title: Option<String>,

    /// Image download timeout in seconds.
    #[arg(long, env = "SVGSTAMP_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print the GenerationOutput as JSON on stdout.
    #[arg(long, env = "SVGSTAMP_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "SVGSTAMP_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SVGSTAMP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SVGSTAMP_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; -v always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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
    let progress = show_progress.then(CliProgressCallback::new);
    let progress_cb = progress
        .clone()
        .map(|cb| cb as Arc<dyn GenerationProgressCallback>);

    let config = build_config(&cli, progress_cb).await?;

    // ── Run generation ───────────────────────────────────────────────────
    let output = match generate(&config).await {
        Ok(output) => output,
        Err(e) => {
            if let Some(ref cb) = progress {
                cb.abandon();
            }
            return Err(e).context("Generation failed");
        }
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&output);
    }

    Ok(())
}

/// Map CLI args to `GenerationConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<GenerationConfig> {
    let mut builder = GenerationConfig::builder()
        .page_size(cli.page_size)
        .raster_scale(cli.scale)
        .strip_text_anchoring(!cli.keep_text_anchoring)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref path) = cli.template {
        builder = builder.template_path(path);
    }
    if let Some(ref image) = cli.image {
        builder = builder.image_source(image);
    }
    if let Some(table) = load_placeholders(cli).await? {
        builder = builder.placeholders(table);
    }
    if let Some(ref id) = cli.region_id {
        builder = builder.region_id(id);
    }
    if let Some(ref p) = cli.out_svg {
        builder = builder.svg_output(p);
    }
    if let Some(ref p) = cli.out_png {
        builder = builder.png_output(p);
    }
    if let Some(ref p) = cli.out_pdf {
        builder = builder.pdf_output(p);
    }
    if let Some(ref title) = cli.title {
        builder = builder.pdf_title(title);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// `--placeholders` file first, then `--set` on top. `None` keeps the
/// built-in sample table.
async fn load_placeholders(cli: &Cli) -> Result<Option<PlaceholderTable>> {
    if cli.placeholders.is_none() && cli.set.is_empty() {
        return Ok(None);
    }

    let mut table = match cli.placeholders {
        Some(ref path) => {
            let json = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read placeholders from {:?}", path))?;
            PlaceholderTable::from_json_str(&json)
                .with_context(|| format!("Invalid placeholder file {:?}", path))?
        }
        None => PlaceholderTable::new(),
    };

    for assignment in &cli.set {
        let (token, value) = PlaceholderTable::parse_assignment(assignment)
            .with_context(|| format!("Invalid --set '{assignment}'"))?;
        table.insert(token, value);
    }

    Ok(Some(table))
}

fn print_summary(output: &GenerationOutput) {
    let mark = if output.stage_errors.is_empty() {
        green("✔")
    } else {
        cyan("⚠")
    };
    eprintln!(
        "{}  {} substitution(s), image {}  {}ms",
        mark,
        output.substitutions,
        if output.image_inserted() {
            "inserted"
        } else {
            "not inserted (region not found)"
        },
        output.stats.total_duration_ms,
    );

    eprintln!("   SVG  {}", bold(&output.svg_path.display().to_string()));
    if let Some(ref p) = output.png_path {
        let size = output
            .raster_size
            .map(|(w, h)| format!("{w}x{h} px"))
            .unwrap_or_default();
        eprintln!("   PNG  {}  {}", bold(&p.display().to_string()), dim(&size));
    }
    if let Some(ref p) = output.pdf_path {
        eprintln!("   PDF  {}", bold(&p.display().to_string()));
    }
    for err in &output.stage_errors {
        eprintln!("   {} {}", red("✗"), err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn help_lists_every_env_variable() {
        let cmd = Cli::command();
        for arg in cmd.get_arguments() {
            let Some(env) = arg.get_env() else { continue };
            let env = env.to_string_lossy();
            let listed = AFTER_HELP.contains(env.as_ref())
                || env
                    .strip_prefix("SVGSTAMP_")
                    .is_some_and(|rest| AFTER_HELP.contains(&format!("_{rest}")));
            assert!(listed, "{env} missing from help text");
        }
    }

    #[test]
    fn set_overrides_placeholder_file_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("values.json");
        std::fs::write(&file, r#"{"$a": "1", "$b": "2"}"#).unwrap();
        let cli = Cli::parse_from([
            "svgstamp",
            "--placeholders",
            file.to_str().unwrap(),
            "--set",
            "$b=two",
            "--set",
            "$c=3",
        ]);

        let table = tokio::runtime::Runtime::new()
            .unwrap()
            .block_on(load_placeholders(&cli))
            .unwrap()
            .unwrap();

        let entries: Vec<_> = table.iter().collect();
        assert_eq!(entries, vec![("$a", "1"), ("$b", "two"), ("$c", "3")]);
    }

    #[test]
    fn no_placeholder_options_keep_sample_table() {
        let cli = Cli::parse_from(["svgstamp"]);
        let table = tokio::runtime::Runtime::new()
            .unwrap()
            .block_on(load_placeholders(&cli))
            .unwrap();
        assert!(table.is_none());
    }
}
