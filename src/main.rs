//! # seedoxide
//!
//! Rebuilds the password candidates a weak, time-seeded generator could have
//! produced for a wallet created in a known date range. Every second of the
//! range (shifted by each requested timezone offset) seeds each emulated
//! PRNG, a few candidates are drawn per seed, and the deduplicated list is
//! written out for hashcat or John the Ripper.
//!
//! A companion `scan` command pulls plausible creation timestamps out of a
//! wallet file to help choose the date range.
//!
//! ## Usage
//!
//! ```sh
//! cargo build --release
//! ./target/release/seedoxide scan wallet.dat
//! ./target/release/seedoxide estimate --start-date 01.12.2008 --end-date 03.02.2009 \
//!     --timezone-offset 0,5.5,-5,-8
//! ./target/release/seedoxide generate --start-date 01.12.2008 --end-date 03.02.2009 \
//!     --charset alnum_special --length 10,11,12 --timezone-offset 0,5.5,-5,-8 --verbose
//! ```
//!
//! Settings can also come from a TOML file (`--config`); flags override it.
//! Press Ctrl-C to stop dispatching work: batches in flight finish and the
//! candidates gathered so far are still written.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use seedoxide::config::{PasswordLimit, RawConfig};
use seedoxide::output::write_wordlist;
use seedoxide::scan::{distinct_timestamps, format_utc, scan_files, suggested_dates};
use seedoxide::{generate, AlgorithmTag, CancelToken, GeneratorConfig, SelectionMode};
use std::path::PathBuf;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a candidate wordlist.
    Generate(GenerateArgs),
    /// Print the size of the task space without generating anything.
    Estimate(GenerateArgs),
    /// Extract plausible creation timestamps from wallet files.
    Scan(ScanArgs),
}

#[derive(Args, Debug, Clone)]
struct GenerateArgs {
    /// TOML configuration file.
    #[arg(short, long, env = "SEEDOXIDE_CONFIG")]
    config: Option<PathBuf>,

    /// First day of the range (DD.MM.YYYY), inclusive.
    #[arg(short, long)]
    start_date: Option<String>,

    /// Day after the range (DD.MM.YYYY), exclusive.
    #[arg(short, long)]
    end_date: Option<String>,

    /// Generators to emulate (comma separated).
    #[arg(short, long = "algorithm", value_enum, value_delimiter = ',')]
    algorithms: Option<Vec<AlgorithmTag>>,

    /// Maximum number of passwords to write, or "unbounded".
    #[arg(short, long)]
    num_passwords: Option<PasswordLimit>,

    /// digits, letters, special, alnum or alnum_special.
    #[arg(short = 'C', long)]
    charset: Option<String>,

    /// Password lengths (comma separated).
    #[arg(short, long = "length", value_delimiter = ',')]
    lengths: Option<Vec<usize>>,

    /// Timezone offsets in hours (comma separated, fractions allowed).
    #[arg(
        short = 'z',
        long = "timezone-offset",
        value_delimiter = ',',
        allow_hyphen_values = true
    )]
    timezone_offsets: Option<Vec<f64>>,

    /// Worker threads (default: all available cores).
    #[arg(short = 'j', long, env = "SEEDOXIDE_THREADS")]
    threads: Option<usize>,

    /// Timestamps handed to a worker at a time.
    #[arg(long)]
    batch_size: Option<usize>,

    /// Candidates drawn per task.
    #[arg(long)]
    samples_per_task: Option<usize>,

    /// How characters are derived from the seed stream.
    #[arg(long, value_enum)]
    selection: Option<SelectionMode>,

    /// Refuse to run when the task space is larger than this.
    #[arg(long)]
    max_tasks: Option<u64>,

    /// Only hold the `--num-passwords` earliest candidates while running.
    #[arg(long)]
    low_memory: bool,

    /// Interpret dates at UTC midnight instead of local midnight.
    #[arg(long)]
    utc: bool,

    /// Output file (default: passwords_<start>_to_<end>.txt).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for the default output file name.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Print the estimate and exit.
    #[arg(long)]
    dry_run: bool,

    /// Disable the progress bar.
    #[arg(long)]
    no_progress: bool,
}

impl GenerateArgs {
    fn overrides(&self) -> RawConfig {
        RawConfig {
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            algorithms: self.algorithms.clone(),
            num_passwords: self.num_passwords,
            charset: self.charset.clone(),
            lengths: self.lengths.clone(),
            timezone_offsets: self.timezone_offsets.clone(),
            threads: self.threads,
            batch_size: self.batch_size,
            samples_per_task: self.samples_per_task,
            selection: self.selection,
            max_tasks: self.max_tasks,
            low_memory: self.low_memory.then_some(true),
            utc: self.utc.then_some(true),
            output: self.output.clone(),
            output_dir: self.output_dir.clone(),
        }
    }

    fn load(&self) -> Result<GeneratorConfig> {
        let base = match &self.config {
            Some(path) => RawConfig::from_toml_file(path)?,
            None => RawConfig::default(),
        };
        let config = base.merge(self.overrides()).build().context("Invalid configuration")?;
        Ok(config)
    }
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Wallet files to scan.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn log_config(config: &GeneratorConfig) {
    info!(
        "Range {} to {} ({} to {}), timezone offsets {:?}",
        config.start_date,
        config.end_date,
        config.window.start(),
        config.window.end(),
        config.timezone_offsets
    );
    info!(
        "Algorithms {:?}, lengths {:?}, charset {}, {} samples per task, {:?} selection",
        config.algorithms.iter().map(|a| a.name()).collect::<Vec<_>>(),
        config.lengths,
        config.charset,
        config.samples_per_task,
        config.selection
    );
    if config.window.is_empty() {
        info!("Date range is empty, nothing to generate");
    }
}

async fn run_generate(args: GenerateArgs) -> Result<()> {
    let config = args.load()?;
    log_config(&config);

    let estimate = config.estimate();
    info!("Task space: {}", estimate);
    if args.dry_run {
        println!("{}", estimate);
        return Ok(());
    }

    let pb = if args.no_progress {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(config.task_space().len())
    };
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )?
        .progress_chars("#>-"),
    );
    pb.set_message("tasks");

    let cancel = CancelToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, waiting for batches in flight");
                cancel.cancel();
            }
        })
    };

    let generation = {
        let config = config.clone();
        let pb = pb.clone();
        tokio::task::spawn_blocking(move || generate(&config, cancel, |n| pb.inc(n)))
            .await
            .context("Generation task panicked")??
    };
    interrupt.abort();
    pb.finish_with_message(if generation.report.cancelled { "cancelled" } else { "done" });

    if generation.report.cancelled {
        warn!("Writing partial results, {} tasks were skipped", generation.report.skipped);
    }

    let written = write_wordlist(&config.output, &generation.results)?;
    info!("Wrote {} passwords to {:?}", written, config.output);

    println!("\nGeneration complete.");
    println!(
        "Tasks: {} succeeded, {} failed, {} skipped",
        generation.report.succeeded, generation.report.failed, generation.report.skipped
    );
    if let Some(distinct) = generation.distinct {
        println!("Distinct candidates: {}", distinct);
    }
    println!("Passwords saved to {}", config.output.display());
    Ok(())
}

fn run_estimate(args: GenerateArgs) -> Result<()> {
    let config = args.load()?;
    log_config(&config);
    println!("{}", config.estimate());
    Ok(())
}

async fn run_scan(args: ScanArgs) -> Result<()> {
    info!("Scanning {} files", args.files.len());
    let scans = scan_files(args.files).await;

    for scan in &scans {
        match &scan.timestamps {
            Ok(found) => println!("{}: {} timestamps", scan.path.display(), found.len()),
            Err(e) => println!("{}: FAILED ({:#})", scan.path.display(), e),
        }
    }

    let timestamps = distinct_timestamps(&scans);
    if timestamps.is_empty() {
        println!("No timestamps found.");
        return Ok(());
    }
    for ts in &timestamps {
        println!("Possible creation time: {} -> {}", ts, format_utc(*ts));
    }
    if let Some((start, end)) = suggested_dates(&timestamps) {
        println!("\nSuggested range: --start-date {} --end-date {} --utc", start, end);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }
    info!("Starting seedoxide {}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Generate(args) => run_generate(args).await,
        Command::Estimate(args) => run_estimate(args),
        Command::Scan(args) => run_scan(args).await,
    }
}
