//! VFB6 unpacker CLI application.
//!
//! Decodes ELB VFB6 TDC raw word files to CSV.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, LevelFilter};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::time::Instant;
use vfb6_core::{input, output, DecoderConfig, TimeInterpolation, Vfb6Decoder};

/// ELB VFB6 TDC raw file unpacker.
///
/// Reads a flat file of little-endian 32-bit words belonging to one VFB6
/// module, decodes it into events and writes calibrated hit times as CSV.
#[derive(Parser, Debug)]
#[command(name = "vfb6")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input raw word file path
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output CSV file for decoded hits
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// TOML configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Trigger window in TDC clocks (overrides the config file)
    #[arg(short, long)]
    window: Option<u32>,

    /// Keep events without finalized hits
    #[arg(long)]
    keep_empty: bool,

    /// First word of the module block
    #[arg(long, default_value_t = 0)]
    start: usize,

    /// One past the last word of the module block (default: end of file)
    #[arg(long)]
    end: Option<usize>,

    /// Fine time interpolation: none, linear or random
    #[arg(short, long)]
    interpolation: Option<TimeInterpolation>,

    /// Seed for random interpolation
    #[arg(long)]
    seed: Option<u64>,

    /// Output file for the per-channel calibration tables (optional)
    #[arg(long, value_name = "PATH")]
    calibration: Option<PathBuf>,

    /// Output file for event summaries (optional)
    #[arg(short, long, value_name = "PATH")]
    events: Option<PathBuf>,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn load_config(args: &Args) -> Result<DecoderConfig> {
    let mut config = match &args.config {
        Some(path) => DecoderConfig::from_file(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => DecoderConfig::default(),
    };

    if let Some(window) = args.window {
        config.window_size_clocks = window;
    }
    if args.keep_empty {
        config.return_events_with_no_hits = true;
    }
    if let Some(interpolation) = args.interpolation {
        config.interpolation = interpolation;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = load_config(&args)?;
    debug!("Using {:?}", config);

    // Setup progress bar
    let progress = if args.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .context("Invalid progress template")?,
        );
        pb.set_message("Reading...");
        pb
    };

    let start_time = Instant::now();

    progress.set_message(format!(
        "Reading {:?}...",
        args.input.file_name().unwrap_or_default()
    ));
    let words = input::read_words(&args.input).context("Failed to read VFB6 word file")?;
    let end = args.end.unwrap_or(words.len());
    info!("Read {} words, parsing [{}, {})", words.len(), args.start, end);

    let mut decoder = match args.seed {
        Some(seed) => Vfb6Decoder::with_uniform_source(config, StdRng::seed_from_u64(seed)),
        None => Vfb6Decoder::with_config(config),
    };

    progress.set_message("Decoding...");
    let events = decoder.parse_range(&words, args.start, end);
    decoder.calibration_tables();
    let records = decoder.hit_records(&events);

    let decode_duration = start_time.elapsed();

    if !args.quiet {
        progress.set_message(format!(
            "Decoded {} events, {} hits in {:.2}s",
            events.len(),
            records.len(),
            decode_duration.as_secs_f64()
        ));
    }

    progress.set_message(format!(
        "Writing to {:?}...",
        args.output.file_name().unwrap_or_default()
    ));
    output::write_hits_csv(&args.output, &records).context("Failed to write hit CSV")?;

    if let Some(path) = &args.events {
        output::write_events_csv(path, &events).context("Failed to write event CSV")?;
    }

    if let Some(path) = &args.calibration {
        output::write_calibration_csv(path, decoder.cached_calibration())
            .context("Failed to write calibration CSV")?;
    }

    let total_duration = start_time.elapsed();

    progress.finish_with_message(format!(
        "Done! Decoded {} hits in {:.2}s",
        records.len(),
        total_duration.as_secs_f64()
    ));

    if !args.quiet {
        // Print summary
        eprintln!();
        eprintln!("Summary:");
        eprintln!("  Input:        {:?}", args.input);
        eprintln!("  Output:       {:?}", args.output);
        eprintln!("  Words:        {}", words.len());
        eprintln!("  Kept events:  {}", events.len());
        eprintln!("  Duration:     {:.3}s", total_duration.as_secs_f64());
        eprintln!("Counters:");
        output::write_counters(std::io::stderr(), decoder.counters())
            .context("Failed to print counters")?;
    }

    Ok(())
}
