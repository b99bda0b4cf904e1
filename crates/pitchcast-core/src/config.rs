// Configuration loading and parsing (pitchcast.toml).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the single configuration file under `config/` and `defaults/`.
pub const CONFIG_FILE: &str = "pitchcast.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub data: DataPaths,
    pub training: TrainingConfig,
    pub limits: InputLimits,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Prior pitches required before a pitcher's rate vector is defined.
    pub min_pitches: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    /// Directory of raw per-pitch files, one `<season>.csv` per season.
    pub raw_dir: String,
    /// Directory the season feature tables are written to.
    pub season_dir: String,
    pub snapshot_path: String,
}

impl DataPaths {
    pub fn raw_season(&self, season: &str) -> PathBuf {
        Path::new(&self.raw_dir).join(format!("{season}.csv"))
    }

    pub fn season_table(&self, season: &str) -> PathBuf {
        Path::new(&self.season_dir).join(format!("{season}.csv"))
    }
}

/// Which column layout a feature vector uses.
///
/// `Simplified` is what the interactive predictor feeds the model; `Full`
/// additionally needs the at-bat history and is only available where that
/// history is known (training-time rows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureEncoding {
    Full,
    Simplified,
}

impl FeatureEncoding {
    pub fn as_str(self) -> &'static str {
        match self {
            FeatureEncoding::Full => "full",
            FeatureEncoding::Simplified => "simplified",
        }
    }
}

impl std::fmt::Display for FeatureEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FeatureEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(FeatureEncoding::Full),
            "simplified" | "simple" => Ok(FeatureEncoding::Simplified),
            other => Err(format!("unknown feature encoding '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrainingConfig {
    pub encoding: FeatureEncoding,
    /// Skip rows whose label is `other` when exporting a training matrix.
    #[serde(default = "default_true")]
    pub drop_other_labels: bool,
}

/// Upper bounds for live pitch counts accepted at inference time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct InputLimits {
    pub max_pitch_count: u32,
    pub max_inning_pitch_count: u32,
    pub max_ab_pitch_count: u32,
}

impl Default for InputLimits {
    fn default() -> Self {
        InputLimits {
            max_pitch_count: 125,
            max_inning_pitch_count: 50,
            max_ab_pitch_count: 15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub dir: String,
    pub filter: String,
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/pitchcast.toml` relative to
/// the given `base_dir`.
///
/// Does not seed from `defaults/`; `load_config` does.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let config = parse_config(&text, &path)?;
    validate(&config)?;
    Ok(config)
}

fn parse_config(text: &str, path: &Path) -> Result<Config, ConfigError> {
    toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Seed `config/pitchcast.toml` from `defaults/pitchcast.toml` when the user
/// has no copy yet. Returns the path written, or `None` when a copy already
/// exists. An existing copy is never touched.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join(CONFIG_FILE);
    if target.exists() {
        return Ok(None);
    }

    let default = base_dir.join("defaults").join(CONFIG_FILE);
    if !default.exists() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "no config/{CONFIG_FILE} or defaults/{CONFIG_FILE} in {}; \
                 run from the project root",
                base_dir.display()
            ),
        });
    }

    if let Some(config_dir) = target.parent() {
        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to create {}: {e}", config_dir.display()),
        })?;
    }
    std::fs::copy(&default, &target).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to copy {} to {}: {e}", default.display(), target.display()),
    })?;
    tracing::info!("seeded {} from {}", target.display(), default.display());
    Ok(Some(target))
}

/// Load config relative to the current working directory, seeding it from
/// the shipped defaults on first run.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_file(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.pipeline.min_pitches == 0 {
        return Err(ConfigError::ValidationError {
            field: "pipeline.min_pitches".into(),
            message: "must be greater than 0".into(),
        });
    }

    let limits = &config.limits;
    let limit_fields: &[(&str, u32)] = &[
        ("limits.max_pitch_count", limits.max_pitch_count),
        ("limits.max_inning_pitch_count", limits.max_inning_pitch_count),
        ("limits.max_ab_pitch_count", limits.max_ab_pitch_count),
    ];
    for (name, val) in limit_fields {
        if *val == 0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must be > 0".into(),
            });
        }
    }

    let path_fields: &[(&str, &str)] = &[
        ("data.raw_dir", &config.data.raw_dir),
        ("data.season_dir", &config.data.season_dir),
        ("data.snapshot_path", &config.data.snapshot_path),
        ("logging.dir", &config.logging.dir),
    ];
    for (name, val) in path_fields {
        if val.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must not be empty".into(),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
