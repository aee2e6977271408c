use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{AdjustmentError, Result};
use crate::models::WindowSize;

/// Configuration for the projection adjuster
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjusterConfig {
    /// Signal blending and capping parameters
    pub adjustment: AdjustmentParameters,

    /// Input locations
    pub data: DataConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Parameters of the adjustment math; immutable for a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentParameters {
    /// Per-window weights, favouring recency
    pub weights: WindowWeights,

    /// Multiplier k applied to the signal before capping
    pub aggressiveness: f64,

    /// Maximum absolute fractional adjustment (0.20 = ±20%)
    pub cap: f64,

    /// League-average xwOBA, the zero point for deviations
    pub league_baseline: f64,

    /// Fan players out across the rayon pool
    pub parallel: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowWeights {
    pub w50: f64,
    pub w100: f64,
    pub w250: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Root holding `hitters/` and `pitchers/` rolling-window files
    pub rolling_dir: PathBuf,

    /// Active roster feed used to resolve slate names to player ids
    pub roster_path: Option<PathBuf>,

    /// Minimum series length for a window to count as an adequate sample
    pub min_series_points: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (pretty, json, compact)
    pub format: String,
}

impl Default for AdjustmentParameters {
    fn default() -> Self {
        Self {
            weights: WindowWeights::default(),
            aggressiveness: 0.15,
            cap: 0.20, // ±20%
            league_baseline: 0.320,
            parallel: false,
        }
    }
}

impl Default for WindowWeights {
    fn default() -> Self {
        Self {
            w50: 0.5,
            w100: 0.3,
            w250: 0.2,
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            rolling_dir: PathBuf::from("./data/rolling_windows"),
            roster_path: None,
            min_series_points: 1,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl WindowWeights {
    pub fn weight_for(&self, window: WindowSize) -> f64 {
        match window {
            WindowSize::W50 => self.w50,
            WindowSize::W100 => self.w100,
            WindowSize::W250 => self.w250,
        }
    }

    pub fn total(&self) -> f64 {
        self.w50 + self.w100 + self.w250
    }

    /// True when the weights sum to 1 within float tolerance
    pub fn is_normalized(&self) -> bool {
        (self.total() - 1.0).abs() <= 1e-6
    }
}

impl AdjustmentParameters {
    /// Reject parameter sets that would make every result meaningless
    ///
    /// Weights that do not sum to 1 are accepted; the engine renormalizes
    /// them per player.
    pub fn validate(&self) -> Result<()> {
        for window in WindowSize::ALL {
            let weight = self.weights.weight_for(window);
            if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
                return Err(AdjustmentError::invalid_configuration(format!(
                    "weight for window {window} must be within [0, 1], got {weight}"
                )));
            }
        }

        if self.weights.total() <= 0.0 {
            return Err(AdjustmentError::invalid_configuration(
                "window weights sum to zero",
            ));
        }

        if !self.aggressiveness.is_finite() || self.aggressiveness < 0.0 {
            return Err(AdjustmentError::invalid_configuration(format!(
                "aggressiveness must be a non-negative number, got {}",
                self.aggressiveness
            )));
        }

        if !self.cap.is_finite() || self.cap <= 0.0 {
            return Err(AdjustmentError::invalid_configuration(format!(
                "cap must be positive, got {}",
                self.cap
            )));
        }

        if !self.league_baseline.is_finite() || self.league_baseline <= 0.0 {
            return Err(AdjustmentError::invalid_configuration(format!(
                "league baseline must be positive, got {}",
                self.league_baseline
            )));
        }

        Ok(())
    }
}

impl AdjusterConfig {
    /// Defaults, then the optional TOML file, then `ADJ_*` environment overrides
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path).with_context(|| {
                format!("Failed to load configuration from {}", path.display())
            })?,
            None => Self::default(),
        };

        config.apply_env()?;
        Ok(config)
    }

    /// Load configuration from a TOML file; missing sections take defaults
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AdjusterConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Override with environment variables
    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Override from an arbitrary variable lookup
    pub fn apply_env_from<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let adj = &mut self.adjustment;
        if let Some(v) = parse_var(&lookup, "ADJ_W50")? {
            adj.weights.w50 = v;
        }
        if let Some(v) = parse_var(&lookup, "ADJ_W100")? {
            adj.weights.w100 = v;
        }
        if let Some(v) = parse_var(&lookup, "ADJ_W250")? {
            adj.weights.w250 = v;
        }
        if let Some(v) = parse_var(&lookup, "ADJ_AGGRESSIVENESS")? {
            adj.aggressiveness = v;
        }
        if let Some(v) = parse_var(&lookup, "ADJ_CAP")? {
            adj.cap = v;
        }
        if let Some(v) = parse_var(&lookup, "ADJ_LEAGUE_BASELINE")? {
            adj.league_baseline = v;
        }
        if let Some(v) = parse_var(&lookup, "ADJ_PARALLEL")? {
            adj.parallel = v;
        }

        if let Some(dir) = lookup("ADJ_ROLLING_DIR") {
            self.data.rolling_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("ADJ_ROSTER_PATH") {
            self.data.roster_path = Some(PathBuf::from(path));
        }
        if let Some(v) = parse_var(&lookup, "ADJ_MIN_SERIES_POINTS")? {
            self.data.min_series_points = v;
        }

        if let Some(level) = lookup("ADJ_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("ADJ_LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Validate the whole configuration; any failure is fatal for the run
    pub fn validate(&self) -> Result<()> {
        self.logging.validate()?;
        self.adjustment.validate()
    }
}

impl LoggingConfig {
    /// Check level and format; runs before the subscriber is installed
    pub fn validate(&self) -> Result<()> {
        match self.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(AdjustmentError::invalid_configuration(format!(
                    "Invalid log level: {other}"
                )))
            }
        }

        match self.format.as_str() {
            "pretty" | "json" | "compact" => {}
            other => {
                return Err(AdjustmentError::invalid_configuration(format!(
                    "Invalid log format: {other}"
                )))
            }
        }

        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> anyhow::Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => {
            let value = raw
                .trim()
                .parse::<T>()
                .with_context(|| format!("Invalid value for {key}: {raw:?}"))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}
