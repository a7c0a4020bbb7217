//! CLI binary for nbpublish.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `PublishConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use nbpublish::{
    publish, ConverterCommand, ProgressCallback, PublishConfig, PublishProgressCallback,
    PublishReport, ReferenceSyntax,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: a spinner while the converter runs, one log line per
/// copied image.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl PublishProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, notebook: &Path) {
        self.bar.set_prefix("Converting");
        self.bar.set_message(notebook.display().to_string());
    }

    fn on_conversion_complete(&self, markdown: &Path, markdown_len: usize) {
        self.bar.println(format!(
            "  {} {}  {}",
            green("✓"),
            markdown.display(),
            dim(&format!("{markdown_len} chars")),
        ));
    }

    fn on_relocation_start(&self, total_images: usize) {
        self.bar.set_prefix("Relocating");
        self.bar.set_message(format!("{total_images} image(s)"));
    }

    fn on_image_copied(&self, index: usize, total: usize, destination: &Path) {
        self.bar.println(format!(
            "  {} Image {:>3}/{:<3}  {}",
            green("✓"),
            index,
            total,
            dim(&destination.display().to_string()),
        ));
    }

    fn on_draft_written(&self, _draft: &Path) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Publish a notebook to a blog checked out next to it
  nbpublish --ipynb gradients.ipynb --bloghome ../my-blog

  # Republish without re-running nbconvert
  nbpublish --ipynb gradients.ipynb --bloghome ../my-blog --no-convert

  # Hugo-style layout
  nbpublish --ipynb post.ipynb --bloghome ~/site \
      --drafts-dir content/drafts --assets-dir static/img --asset-url-prefix /img

  # Machine-readable report
  nbpublish --ipynb post.ipynb --bloghome ~/site --json

LAYOUT:
  Draft:   <bloghome>/<drafts-dir>/<notebook name>.md
  Images:  <bloghome>/<assets-dir>/<notebook name>/<file>
  Links:   <asset-url-prefix>/<notebook name>/<file>

ENVIRONMENT VARIABLES:
  NBPUBLISH_DRAFTS_DIR        Override --drafts-dir
  NBPUBLISH_ASSETS_DIR        Override --assets-dir
  NBPUBLISH_ASSET_URL_PREFIX  Override --asset-url-prefix
  NBPUBLISH_CONVERTER         Override --converter
  RUST_LOG                    Log filter (e.g. nbpublish=debug)
"#;

/// Publish a Jupyter notebook as a markdown blog draft.
#[derive(Parser, Debug)]
#[command(
    name = "nbpublish",
    version,
    about = "Publish a Jupyter notebook as a markdown blog draft",
    long_about = "Convert a Jupyter notebook to markdown, copy every image it references into \
the blog's asset directory, rewrite the references, and write the result as a draft post.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Notebook to publish.
    #[arg(long, value_name = "PATH")]
    ipynb: PathBuf,

    /// Root of the blog's working tree.
    #[arg(long, value_name = "PATH")]
    bloghome: PathBuf,

    /// Drafts directory, relative to the blog home.
    #[arg(long, env = "NBPUBLISH_DRAFTS_DIR", default_value = nbpublish::config::DEFAULT_DRAFTS_DIR)]
    drafts_dir: PathBuf,

    /// Image asset directory, relative to the blog home.
    #[arg(long, env = "NBPUBLISH_ASSETS_DIR", default_value = nbpublish::config::DEFAULT_ASSETS_DIR)]
    assets_dir: PathBuf,

    /// URL the asset directory is served under.
    #[arg(long, env = "NBPUBLISH_ASSET_URL_PREFIX", default_value = nbpublish::config::DEFAULT_ASSET_URL_PREFIX)]
    asset_url_prefix: String,

    /// Converter command; the notebook path is appended.
    #[arg(long, env = "NBPUBLISH_CONVERTER", default_value = "jupyter nbconvert --to markdown")]
    converter: String,

    /// Image reference syntaxes to relocate.
    #[arg(long, value_enum, default_value = "all")]
    syntax: SyntaxArg,

    /// Reuse the existing markdown next to the notebook instead of converting.
    #[arg(long)]
    no_convert: bool,

    /// Print a JSON report instead of the markdown path.
    #[arg(long)]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum SyntaxArg {
    Markdown,
    Html,
    All,
}

impl From<SyntaxArg> for Vec<ReferenceSyntax> {
    fn from(v: SyntaxArg) -> Self {
        match v {
            SyntaxArg::Markdown => vec![ReferenceSyntax::Markdown],
            SyntaxArg::Html => vec![ReferenceSyntax::Html],
            SyntaxArg::All => ReferenceSyntax::all(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers what INFO logs would say; keep them out of its way.
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
    let cli_progress = show_progress.then(CliProgressCallback::new);
    let progress_cb: Option<ProgressCallback> = cli_progress
        .clone()
        .map(|cb| cb as Arc<dyn PublishProgressCallback>);

    let config = build_config(&cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let result = publish(&config).await;
    // Clear the spinner before anyhow prints an error below it.
    if let Some(ref cb) = cli_progress {
        cb.bar.finish_and_clear();
    }
    let report = result.context("Publishing failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else {
        println!("{}", report.markdown_path.display());
        if !cli.quiet {
            print_summary(&report);
        }
    }

    Ok(())
}

/// Map CLI args to `PublishConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PublishConfig> {
    let converter: ConverterCommand = cli
        .converter
        .parse()
        .context("Invalid --converter")?;

    let mut builder = PublishConfig::builder()
        .notebook(&cli.ipynb)
        .blog_home(&cli.bloghome)
        .drafts_dir(&cli.drafts_dir)
        .assets_dir(&cli.assets_dir)
        .asset_url_prefix(cli.asset_url_prefix.as_str())
        .converter(converter)
        .run_converter(!cli.no_convert)
        .syntaxes(cli.syntax.clone().into());

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(report: &PublishReport) {
    eprintln!(
        "{}  {}  {}",
        green("✔"),
        bold(&report.draft_path.display().to_string()),
        dim(&format!("{}ms", report.stats.total_duration_ms)),
    );
    if !report.images.is_empty() {
        eprintln!(
            "   {} image(s) → {}",
            report.images.len(),
            dim(&report.asset_dir.display().to_string()),
        );
    }
}
