//! lectern CLI
//!
//! Commands:
//!   analyze - Extract knowledge from a PDF page by page and write summaries
//!   render  - Convert a summary markdown file to PDF
//!   narrate - Convert a summary markdown file to MP3
//!   status  - Show previous results, checkpoint and suggested settings for a PDF
//!   config  - Show or initialise the configuration file

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use lectern::pipeline::{ProgressReceivers, Reporter, CHANNEL_CAPACITY};
use lectern::render::markdown_file_to_pdf;
use lectern::source;
use lectern::speech::{narrate, OpenAISpeech};
use lectern::store::summaries::{companion_path, quick_summary};
use lectern::worker::{self, spawn_analysis, AnalysisRequest, WorkerHandle, WorkerResult, STOP_GRACE};
use lectern::{suggest_settings, BookLayout, BookStores, Config};
use std::path::{Path, PathBuf};
use tokio::time::Instant;

#[derive(Parser)]
#[command(name = "lectern")]
#[command(about = "Study notes from PDFs, one page at a time")]
#[command(version)]
struct Cli {
    /// Directory holding pdfs/, knowledge_bases/, summaries/ and progress/
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a PDF (resumes automatically if a checkpoint exists)
    Analyze {
        /// PDF to analyze (defaults to the configured PDF)
        pdf: Option<PathBuf>,

        /// Pages in the first batch; 0 processes the whole book at once
        #[arg(long)]
        test_pages: Option<i64>,

        /// Pages between interval summaries; 0 disables them
        #[arg(long)]
        interval: Option<i64>,
    },

    /// Render a summary markdown file to PDF
    Render {
        /// Markdown file
        markdown: PathBuf,
    },

    /// Narrate a summary markdown file to MP3
    Narrate {
        /// Markdown file
        markdown: PathBuf,
    },

    /// Show previous results and suggested settings for a PDF
    Status {
        /// PDF name or path
        pdf: PathBuf,
    },

    /// Show the configuration, or write the defaults with --init
    Config {
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("lectern=warn")).init();

    let cli = Cli::parse();
    let mut config = Config::load_or_default()?;
    if let Some(base_dir) = cli.base_dir {
        config.base_dir = base_dir;
    }

    match cli.command {
        Commands::Analyze {
            pdf,
            test_pages,
            interval,
        } => {
            let request = AnalysisRequest {
                pdf: pdf.unwrap_or_else(|| PathBuf::from(&config.default_pdf)),
                test_pages: test_pages.unwrap_or(config.test_pages),
                interval: interval.unwrap_or(config.interval),
            };
            println!("Analyzing: {}", request.pdf.display().to_string().cyan());

            let (reporter, receivers) = Reporter::channel(CHANNEL_CAPACITY);
            let handle = spawn_analysis(config, request, reporter)?;
            match drive(handle, receivers).await {
                WorkerResult::Completed(Some(path)) => {
                    println!("\n{} Final analysis saved to {}", "✓".green(), path.display());
                    print_quick_summary(&path);
                }
                WorkerResult::Completed(None) => {
                    println!("\n{} Analysis complete (no knowledge extracted)", "✓".green());
                }
                WorkerResult::Stopped => {
                    println!("\n{} Stopped. Run the same command again to resume.", "⚠".yellow());
                }
                WorkerResult::Terminated => {
                    println!(
                        "\n{} Terminated. Progress up to the last completed page is saved.",
                        "⚠".yellow()
                    );
                }
                WorkerResult::Failed(message) => bail!("Analysis failed: {}", message),
            }
        }

        Commands::Render { markdown } => {
            let output = markdown_file_to_pdf(&markdown)?;
            println!("{} PDF saved to {}", "✓".green(), output.display());
        }

        Commands::Narrate { markdown } => {
            let (reporter, receivers) = Reporter::channel(CHANNEL_CAPACITY);
            let handle = worker::spawn(move |_| async move {
                let speech = OpenAISpeech::from_env(&config.api_base, &config.speech_model, &config.voice)?;
                let output = narrate(&markdown, &speech, &reporter).await?;
                Ok::<_, anyhow::Error>(WorkerResult::Completed(Some(output)))
            })?;
            match drive(handle, receivers).await {
                WorkerResult::Completed(Some(path)) => {
                    println!("{} Audio saved to {}", "✓".green(), path.display());
                }
                WorkerResult::Failed(message) => bail!("Narration failed: {}", message),
                _ => println!("{} Narration interrupted", "⚠".yellow()),
            }
        }

        Commands::Status { pdf } => show_status(&config, &pdf)?,

        Commands::Config { init } => {
            let path = Config::path()?;
            if init {
                if path.exists() {
                    println!("Config already exists at {}", path.display());
                } else {
                    let written = Config::default().save()?;
                    println!("{} Wrote default config to {}", "✓".green(), written.display());
                }
            } else {
                println!("{}\n", path.display().to_string().dimmed());
                print!("{}", toml::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}

/// Show progress and logs from a worker until it finishes.
///
/// The first Ctrl-C asks for a cooperative stop; if the worker has not
/// finished within the grace period it is killed.
async fn drive(handle: WorkerHandle, mut receivers: ProgressReceivers) -> WorkerResult {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let cancel = handle.cancel_token();
    let killer = handle.killer();
    let join = handle.join();
    tokio::pin!(join);

    let grace = tokio::time::sleep(STOP_GRACE);
    tokio::pin!(grace);
    let mut stopping = false;
    let mut killed = false;

    loop {
        tokio::select! {
            result = &mut join => {
                while let Ok(line) = receivers.logs.try_recv() {
                    bar.println(style_line(&line));
                }
                bar.finish_and_clear();
                return result;
            }
            Some(percent) = receivers.progress.recv() => bar.set_position(u64::from(percent)),
            Some(line) = receivers.logs.recv() => bar.println(style_line(&line)),
            _ = tokio::signal::ctrl_c(), if !stopping => {
                stopping = true;
                cancel.cancel();
                grace.as_mut().reset(Instant::now() + STOP_GRACE);
                bar.println("Stopping after the current page...".yellow().to_string());
            }
            _ = &mut grace, if stopping && !killed => {
                killed = true;
                killer.kill();
                bar.println("Worker did not stop in time, terminating".red().to_string());
            }
        }
    }
}

fn style_line(line: &str) -> String {
    if line.starts_with("Error") {
        line.red().to_string()
    } else if line.starts_with("Skipping") {
        line.dimmed().to_string()
    } else if line.starts_with("Found") || line.starts_with("Saved") {
        line.green().to_string()
    } else {
        line.to_string()
    }
}

fn print_quick_summary(summary_path: &Path) {
    let Ok(markdown) = std::fs::read_to_string(summary_path) else {
        return;
    };
    let lines = quick_summary(&markdown);
    if lines.is_empty() {
        return;
    }
    println!("\n{}", "5-Minute Summary".bold());
    for line in lines {
        println!("  {}", line);
    }
}

fn show_status(config: &Config, pdf: &Path) -> Result<()> {
    let layout = BookLayout::new(&config.base_dir, pdf);
    let stores = BookStores::new(layout);
    println!("{}\n", stores.layout.pdf_name().bold());

    match stores.summaries.latest_final()? {
        Some(path) => {
            println!("Previous analysis: {}", path.display());
            for (label, ext) in [("PDF version", "pdf"), ("Audio version", "mp3")] {
                let companion = companion_path(&path, ext);
                if companion.exists() {
                    println!("  {}: {}", label, companion.display());
                } else {
                    println!("  {}: {}", label, "not created yet".dimmed());
                }
            }
            print_quick_summary(&path);
        }
        None => println!("Previous analysis: {}", "none".dimmed()),
    }

    match stores.checkpoints.load()? {
        Some(checkpoint) => println!(
            "\nCheckpoint: resumes at page {} ({} knowledge points, {} summaries, saved {})",
            checkpoint.resume_page() + 1,
            checkpoint.knowledge_base.len(),
            checkpoint.previous_analyses.len(),
            checkpoint.timestamp.format("%Y-%m-%d %H:%M:%S")
        ),
        None => println!("\nCheckpoint: {}", "none".dimmed()),
    }

    let pdf_path = if pdf.exists() {
        pdf.to_path_buf()
    } else {
        stores.layout.pdf_path()
    };
    if pdf_path.exists() {
        let total = source::page_count(&pdf_path)?;
        let test = suggest_settings(total, true);
        let full = suggest_settings(total, false);
        println!("\nPages: {}", total);
        println!(
            "Suggested (test mode): --test-pages {} --interval {}",
            test.test_pages.unwrap_or(0),
            test.interval
        );
        println!("Suggested (full run):  --test-pages 0 --interval {}", full.interval);
    }

    Ok(())
}
