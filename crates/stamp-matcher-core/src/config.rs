use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// How a fingerprint is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FingerprintMethod {
    /// Mean-threshold hash over a small luminance grid
    PerceptualHash,

    /// 128-bit digest of the raw bytes
    ContentHash,

    /// Vector produced by an installed embedding model
    LearnedEmbedding,
}

/// Which candidates a query result reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportMode {
    /// Every reference, matched or not
    All,

    /// Only candidates above the threshold
    MatchesOnly,
}

/// Mapping from raw Hamming similarity to the reported score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ScoreScaling {
    /// Report the fraction of agreeing bits unchanged
    Raw,

    /// `max(floor, gain * s + offset)`, clamped to [0, 1]
    Affine { gain: f64, offset: f64, floor: f64 },
}

impl ScoreScaling {
    pub fn apply(&self, raw: f64) -> f64 {
        match *self {
            ScoreScaling::Raw => raw,
            ScoreScaling::Affine {
                gain,
                offset,
                floor,
            } => floor.max(gain * raw + offset).clamp(0.0, 1.0),
        }
    }
}

/// Log level for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Configuration for a matching request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// A candidate matches when its score is strictly above this value
    pub threshold: f64,

    /// Transform applied to comparable similarity scores
    pub score_scaling: ScoreScaling,

    /// Edge length of the canvas vector graphics are rasterized onto
    pub canvas_size: u32,

    /// Edge length of the luminance grid (fingerprint has grid² bits)
    pub grid_size: u32,

    /// Fingerprint backend
    pub method: FingerprintMethod,

    /// All candidates or matches only
    pub report_mode: ReportMode,

    /// Optional request-level timeout in seconds
    pub timeout_secs: Option<u64>,

    /// Number of threads to use for fingerprinting (0 = auto)
    pub threads: usize,

    /// Log level
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: 0.55,
            score_scaling: ScoreScaling::Raw,
            canvas_size: 256,
            grid_size: 8,
            method: FingerprintMethod::PerceptualHash,
            report_mode: ReportMode::All,
            timeout_secs: None,
            threads: 0, // Auto
            log_level: LogLevel::Info,
        }
    }
}

impl Config {
    /// Default configuration with a different threshold
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())
            .map_err(|e| Error::Configuration(format!("Failed to open config file: {}", e)))?;

        let config: Config = serde_json::from_reader(file)
            .map_err(|e| Error::Configuration(format!("Failed to parse config file: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())
            .map_err(|e| Error::Configuration(format!("Failed to create config file: {}", e)))?;

        serde_json::to_writer_pretty(file, self)
            .map_err(|e| Error::Configuration(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(Error::Configuration(
                "Match threshold must be between 0 and 1".to_string(),
            ));
        }

        if self.canvas_size == 0 || self.canvas_size > 4096 {
            return Err(Error::Configuration(
                "Canvas size must be between 1 and 4096 pixels".to_string(),
            ));
        }

        if self.grid_size == 0 || self.grid_size > 32 {
            return Err(Error::Configuration(
                "Grid size must be between 1 and 32".to_string(),
            ));
        }

        if let ScoreScaling::Affine {
            gain,
            offset,
            floor,
        } = self.score_scaling
        {
            if !gain.is_finite() || !offset.is_finite() {
                return Err(Error::Configuration(
                    "Affine gain and offset must be finite".to_string(),
                ));
            }
            if !(0.0..=1.0).contains(&floor) {
                return Err(Error::Configuration(
                    "Affine floor must be between 0 and 1".to_string(),
                ));
            }
        }

        if self.timeout_secs == Some(0) {
            return Err(Error::Configuration(
                "Timeout must be at least one second".to_string(),
            ));
        }

        Ok(())
    }
}
