//! CLI binary for gapexam.
//!
//! Maps flags onto `AnalysisConfig`, runs one session over the given PDFs
//! and writes the exam paper, answer key, and analysis report.

use anyhow::{Context, Result};
use clap::Parser;
use gapexam::{
    render_analysis, render_exam, render_json, write_atomic, AnalysisConfig, AnalysisResult,
    ExamView, GapExamError, GradeLevel, Session, SessionObserver, ShapePolicy, SourceDocument,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

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

// ── Terminal progress ────────────────────────────────────────────────────────

/// Spinner that follows the session lifecycle.
struct SpinnerObserver {
    bar: ProgressBar,
}

impl SpinnerObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl SessionObserver for SpinnerObserver {
    fn on_started(&self, documents: usize) {
        self.bar.set_prefix("Reading");
        self.bar.set_message(format!("{documents} documents"));
    }

    fn on_document_processed(&self, index: usize, total: usize, pages: usize) {
        self.bar.println(format!(
            "  {} Document {index}/{total}  {}",
            green("✓"),
            dim(&format!("{pages} pages"))
        ));
    }

    fn on_analyzing(&self, images: usize) {
        self.bar.set_prefix("Analysing");
        self.bar
            .set_message(format!("{images} page images sent, waiting for the model…"));
    }

    fn on_succeeded(&self, result: &AnalysisResult) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} missing knowledge points, {} questions generated",
            green("✔"),
            bold(&result.analysis.missing_points.len().to_string()),
            result.exam.sections.questions().count()
        );
    }

    fn on_failed(&self, _error: &GapExamError) {
        self.bar.finish_and_clear();
        eprintln!("{} Analysis failed", red("✘"));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Three worksheets, grade 5 first term, exam to stdout
  gapexam week1.pdf week2.pdf week3.pdf --grade p5-1

  # Write student paper, answer key and report
  gapexam hw.pdf --grade j1-2 -o exam.md --answers key.md --analysis report.md

  # Whole result as JSON
  gapexam hw.pdf --grade p3-1 --json > result.json

  # Use another provider through edgequake-llm
  gapexam hw.pdf --grade p4-2 --provider openai --model gpt-4.1

GRADES:
  p1-1 … p6-2   primary school year 1–6, term 1 or 2
  j1-1 … j3-2   junior middle school year 1–3 (g7-1 … g9-2 also accepted)
  Run `gapexam --list-grades` for the full list.

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY   Google Gemini API key (default backend)
  RUST_LOG         Log filter, e.g. RUST_LOG=gapexam=debug
"#;

/// Find curriculum gaps in math exercises and generate a targeted exam paper.
#[derive(Parser, Debug)]
#[command(
    name = "gapexam",
    version,
    about = "Find curriculum gaps in math exercises and generate a targeted exam paper",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF files or HTTP/HTTPS URLs of completed exercises.
    #[arg(required_unless_present = "list_grades")]
    inputs: Vec<String>,

    /// Grade code, e.g. p5-1 (primary 5, first term) or j2-2.
    #[arg(short, long, default_value = "p5-1")]
    grade: GradeLevel,

    /// Write the student exam paper (or the JSON with --json) here instead
    /// of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write the exam with answers and explanations.
    #[arg(long, value_name = "PATH")]
    answers: Option<PathBuf>,

    /// Also write the coverage analysis report.
    #[arg(long, value_name = "PATH")]
    analysis: Option<PathBuf>,

    /// Emit the whole result as JSON instead of the exam paper.
    #[arg(long)]
    json: bool,

    /// Model backend: gemini (default), or any edgequake-llm provider.
    #[arg(long)]
    provider: Option<String>,

    /// Model ID. Default for gemini: gemini-3-pro-preview.
    #[arg(long)]
    model: Option<String>,

    /// Model call timeout in seconds.
    #[arg(long, default_value_t = 300)]
    timeout: u64,

    /// Download timeout in seconds for URL inputs.
    #[arg(long, default_value_t = 120)]
    download_timeout: u64,

    /// Maximum page images across all documents.
    #[arg(long, default_value_t = gapexam::config::IMAGE_LIMIT_TOTAL, conflicts_with = "no_image_limit")]
    image_limit: usize,

    /// Send every rendered page (still at most 5 per document).
    #[arg(long)]
    no_image_limit: bool,

    /// Fail when the generated exam does not have the 5/5/6 layout.
    #[arg(long)]
    strict_shape: bool,

    /// Directory containing libpdfium.
    #[arg(long, value_name = "DIR")]
    pdfium_lib: Option<PathBuf>,

    /// List grade codes and exit.
    #[arg(long)]
    list_grades: bool,

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

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.list_grades {
        for grade in GradeLevel::all() {
            println!("{:<6} {}", grade.code(), grade.label());
        }
        return Ok(());
    }

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers what INFO logs would say; keep stderr clean.
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

    let config = build_config(&cli)?;

    let mut documents = Vec::with_capacity(cli.inputs.len());
    for input in &cli.inputs {
        let doc = SourceDocument::resolve(input, cli.download_timeout)
            .await
            .with_context(|| format!("Cannot load '{input}'"))?;
        documents.push(doc);
    }

    let mut session = Session::new(&config).context("Failed to start session")?;
    if show_progress {
        session = session.with_observer(SpinnerObserver::new());
    }
    session.select_documents(documents)?;
    session.set_grade(cli.grade);

    if !cli.quiet {
        eprintln!(
            "{} {} documents, grade {}",
            bold("◆"),
            session.document_count(),
            cli.grade
        );
    }

    let result = match session.run().await {
        Ok(result) => result,
        Err(e) => {
            if let Some(raw) = e.raw_response() {
                tracing::debug!("Raw model response:\n{}", raw);
            }
            let message = session.error().unwrap_or_else(|| e.to_string());
            anyhow::bail!(message);
        }
    };

    write_outputs(&cli, &result).await?;
    Ok(())
}

/// Map CLI args to `AnalysisConfig`.
fn build_config(cli: &Cli) -> Result<AnalysisConfig> {
    let mut builder = AnalysisConfig::builder()
        .request_timeout_secs(cli.timeout)
        .image_limit_total((!cli.no_image_limit).then_some(cli.image_limit))
        .shape_policy(if cli.strict_shape {
            ShapePolicy::Reject
        } else {
            ShapePolicy::Warn
        });

    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref dir) = cli.pdfium_lib {
        builder = builder.pdfium_library_dir(dir);
    }

    builder.build().context("Invalid configuration")
}

/// The document that goes to `-o` or stdout: the JSON result with `--json`,
/// otherwise the student exam paper.
fn primary_output(cli: &Cli, result: &AnalysisResult) -> Result<(&'static str, String)> {
    if cli.json {
        let mut json = render_json(result)?;
        json.push('\n');
        Ok(("result", json))
    } else {
        Ok(("exam", render_exam(&result.exam, ExamView::Print)))
    }
}

async fn write_outputs(cli: &Cli, result: &AnalysisResult) -> Result<()> {
    let grade = cli.grade.label();

    let (label, primary) = primary_output(cli, result)?;
    match cli.output {
        Some(ref path) => {
            write_atomic(path, &primary).await?;
            if !cli.quiet {
                eprintln!("{} {label} → {}", green("✔"), bold(&path.display().to_string()));
            }
        }
        None => {
            io::stdout()
                .lock()
                .write_all(primary.as_bytes())
                .context("Failed to write to stdout")?;
        }
    }

    if let Some(ref path) = cli.answers {
        write_atomic(path, &render_exam(&result.exam, ExamView::WithAnswers)).await?;
        if !cli.quiet {
            eprintln!("{} answer key → {}", green("✔"), bold(&path.display().to_string()));
        }
    }

    if let Some(ref path) = cli.analysis {
        write_atomic(path, &render_analysis(&result.analysis, &grade)).await?;
        if !cli.quiet {
            eprintln!("{} analysis → {}", green("✔"), bold(&path.display().to_string()));
        }
    }

    Ok(())
}
