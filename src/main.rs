//! Audiogram Digitizer - command line front end
//!
//! Extracts one or more audiogram images and prints the results as JSON on
//! stdout. Logs go to stderr.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::unbounded;
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use audiogram_digitizer::config::{self, PipelineConfig};
use audiogram_digitizer::{ExtractionResult, Extractor};

/// Audiogram Digitizer - structured hearing data from chart images
#[derive(Parser, Debug)]
#[command(name = "audiogram-digitizer")]
#[command(about = "Converts audiogram photos, scans and screenshots into structured measurements")]
struct Args {
    /// Image files to extract
    files: Vec<PathBuf>,

    /// Configuration file (defaults to the user config file when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Confidence below which a result is marked for review
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Pretty-print one JSON document instead of JSON lines
    #[arg(long)]
    pretty: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    print_default_config: bool,

    /// Worker threads (0 = one per CPU)
    #[arg(short, long, default_value = "0")]
    jobs: usize,
}

/// One line of output
#[derive(Debug, Serialize)]
struct FileOutcome {
    file: String,
    #[serde(flatten)]
    result: Option<ExtractionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    needs_review: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl FileOutcome {
    fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if args.print_default_config {
        print!("{}", toml::to_string_pretty(&PipelineConfig::default())?);
        return Ok(ExitCode::SUCCESS);
    }

    if args.files.is_empty() {
        anyhow::bail!("No input files given");
    }

    let config = load_or_default_config(args.config.as_deref())?;
    let threshold = args.threshold.unwrap_or(config.scoring.review_threshold);
    let extractor = Extractor::with_config(config);

    let outcomes = run_batch(&extractor, &args.files, args.jobs, threshold);
    let failures = outcomes.iter().filter(|o| o.is_error()).count();

    if args.pretty {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
    } else {
        for outcome in &outcomes {
            println!("{}", serde_json::to_string(outcome)?);
        }
    }

    info!("Processed {} files, {} failed", outcomes.len(), failures);

    Ok(if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Load the explicit config file, else the user config file, else defaults
fn load_or_default_config(path: Option<&Path>) -> Result<PipelineConfig> {
    if let Some(path) = path {
        let config = config::load_config(path)
            .with_context(|| format!("Could not load configuration {:?}", path))?;
        info!("Loaded configuration from {:?}", path);
        return Ok(config);
    }

    if let Ok(config_path) = config::default_config_path() {
        if config_path.exists() {
            match config::load_config(&config_path) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", config_path);
                    return Ok(config);
                }
                Err(e) => error!("Ignoring unreadable configuration: {:#}", e),
            }
        }
    }

    info!("Using default configuration");
    Ok(PipelineConfig::default())
}

/// Extract every file on a pool of worker threads, returning outcomes in
/// input order
fn run_batch(extractor: &Extractor, files: &[PathBuf], jobs: usize, threshold: f64) -> Vec<FileOutcome> {
    let workers = if jobs == 0 {
        std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    } else {
        jobs
    }
    .min(files.len())
    .max(1);

    let (job_tx, job_rx) = unbounded::<(usize, &PathBuf)>();
    let (result_tx, result_rx) = unbounded::<(usize, FileOutcome)>();

    for job in files.iter().enumerate() {
        // Receiver is alive until the scope below ends
        let _ = job_tx.send(job);
    }
    drop(job_tx);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                for (index, path) in job_rx.iter() {
                    let _ = result_tx.send((index, process_file(extractor, path, threshold)));
                }
            });
        }
    });
    drop(result_tx);

    let mut outcomes: Vec<Option<FileOutcome>> = files.iter().map(|_| None).collect();
    for (index, outcome) in result_rx.iter() {
        outcomes[index] = Some(outcome);
    }
    outcomes.into_iter().flatten().collect()
}

fn process_file(extractor: &Extractor, path: &Path, threshold: f64) -> FileOutcome {
    let file = path.display().to_string();
    match extractor.extract_file(path) {
        Ok(result) => FileOutcome {
            file,
            needs_review: Some(result.needs_review(threshold)),
            result: Some(result),
            error: None,
        },
        Err(e) => {
            error!("{}: {}", file, e);
            FileOutcome {
                file,
                result: None,
                needs_review: None,
                error: Some(e.to_string()),
            }
        }
    }
}
