use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;
use std::path::PathBuf;

use stamp_matcher_core::discovery::load_assets;
use stamp_matcher_core::logging::init_logger;
use stamp_matcher_core::{
    classify, Config, Fingerprinter, LogLevel, MatchSummary, Matcher, QueryResult, ReportMode,
    ScoreScaling,
};

#[derive(Parser)]
#[command(name = "stamp-matcher")]
#[command(about = "Match photographs against reference stamp artwork")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank every query image against every reference image
    Match {
        /// Reference files or directories (SVG or raster)
        #[arg(short, long = "reference", required = true, num_args = 1..)]
        references: Vec<PathBuf>,

        /// Query files or directories (photographs)
        #[arg(short, long = "query", required = true, num_args = 1..)]
        queries: Vec<PathBuf>,

        /// Match threshold in [0, 1]
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Report only candidates above the threshold
        #[arg(long)]
        matches_only: bool,

        /// Canvas size for rasterizing vector references
        #[arg(long)]
        canvas: Option<u32>,

        /// Fingerprint grid size
        #[arg(long)]
        grid: Option<u32>,

        /// Affine score scaling as GAIN,OFFSET,FLOOR
        #[arg(long, value_parser = parse_affine)]
        affine: Option<ScoreScaling>,

        /// Abort the batch after this many seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write logs to rotating files in this directory
        #[arg(long)]
        log_dir: Option<PathBuf>,

        /// Verbosity level
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,
    },

    /// Print the kind and fingerprint of each file
    Fingerprint {
        /// Files or directories to fingerprint
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Generate default configuration file
    GenerateConfig {
        /// Path to save configuration file
        #[arg(default_value = "stamp-matcher.json")]
        path: PathBuf,
    },
}

#[derive(Serialize)]
struct MatchResponse {
    success: bool,
    message: String,
    summary: MatchSummary,
    results: Vec<QueryResult>,
}

fn parse_affine(value: &str) -> Result<ScoreScaling, String> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid number: {}", e))?;

    match parts.as_slice() {
        [gain, offset, floor] => Ok(ScoreScaling::Affine {
            gain: *gain,
            offset: *offset,
            floor: *floor,
        }),
        _ => Err("expected GAIN,OFFSET,FLOOR".to_string()),
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(config_path) => Config::from_file(&config_path)
            .with_context(|| format!("loading {}", config_path.display())),
        None => Ok(Config::default()),
    }
}

fn init_logging(log_dir: Option<PathBuf>, level: LogLevel) -> anyhow::Result<()> {
    match log_dir {
        Some(dir) => {
            init_logger(&dir.to_string_lossy(), level.to_level_filter())?;
        }
        None => {
            env_logger::Builder::from_default_env()
                .filter_level(level.to_level_filter())
                .init();
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    match cli.command {
        Commands::Match {
            references,
            queries,
            threshold,
            matches_only,
            canvas,
            grid,
            affine,
            timeout,
            pretty,
            config,
            log_dir,
            verbose,
        } => {
            let mut config = load_config(config)?;

            // Override config with command line arguments
            if let Some(threshold) = threshold {
                config.threshold = threshold;
            }
            if matches_only {
                config.report_mode = ReportMode::MatchesOnly;
            }
            if let Some(canvas) = canvas {
                config.canvas_size = canvas;
            }
            if let Some(grid) = grid {
                config.grid_size = grid;
            }
            if let Some(scaling) = affine {
                config.score_scaling = scaling;
            }
            if timeout.is_some() {
                config.timeout_secs = timeout;
            }

            // Set log level based on verbosity
            config.log_level = match verbose {
                0 => config.log_level,
                1 => LogLevel::Debug,
                _ => LogLevel::Trace,
            };
            init_logging(log_dir, config.log_level)?;

            let matcher = Matcher::new(config)?;
            let references = load_assets(&references)?;
            let queries = load_assets(&queries)?;

            info!("Starting matching...");
            let reference_count = references.len();
            let query_count = queries.len();
            let results = matcher.match_all_with_timeout(references, queries)?;
            info!("Matching complete");

            let response = MatchResponse {
                success: true,
                message: format!(
                    "Processed {} queries against {} references",
                    query_count, reference_count
                ),
                summary: MatchSummary::from_results(&results, reference_count),
                results,
            };

            let output = if pretty {
                serde_json::to_string_pretty(&response)?
            } else {
                serde_json::to_string(&response)?
            };
            println!("{}", output);
            Ok(())
        }

        Commands::Fingerprint { paths, config } => {
            env_logger::init();

            let config = load_config(config)?;
            config.validate()?;
            let fingerprinter = Fingerprinter::from_config(&config);

            for asset in load_assets(&paths)? {
                let kind = classify(&asset.name, &asset.raw_bytes);
                let fingerprint = fingerprinter.fingerprint(&asset);
                println!(
                    "{}\t{:?}\t{:?}\t{}",
                    asset.name,
                    kind,
                    fingerprint.method(),
                    fingerprint
                );
            }
            Ok(())
        }

        Commands::GenerateConfig { path } => {
            let config = Config::default();
            config.save_to_file(&path)?;
            println!("Configuration file generated at: {}", path.display());
            Ok(())
        }
    }
}
