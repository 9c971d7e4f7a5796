use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::TrainingError;

/// Which wall clock the temporal features are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeBasis {
    #[default]
    Local,
    Utc,
}

impl TimeBasis {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeBasis::Local => "local",
            TimeBasis::Utc => "utc",
        }
    }

    pub const fn all() -> &'static [TimeBasis] {
        &[TimeBasis::Local, TimeBasis::Utc]
    }

    /// Convert an instant to the naive wall-clock time used for features.
    pub fn wall_clock(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        match self {
            TimeBasis::Local => instant.with_timezone(&Local).naive_local(),
            TimeBasis::Utc => instant.naive_utc(),
        }
    }
}

impl std::fmt::Display for TimeBasis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TimeBasis {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "local" => Ok(TimeBasis::Local),
            "utc" => Ok(TimeBasis::Utc),
            _ => Err(anyhow!("Unknown time basis '{value}'. Supported values: local, utc.")),
        }
    }
}

/// Parameters of the synthetic dataset, the split and the forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Rows in the synthetic training set.
    pub n_samples: usize,
    /// Seed shared by the generator, the split and the forest.
    pub seed: u64,
    /// Share of rows held out for the test score.
    pub test_fraction: f64,
    pub n_estimators: usize,
    /// `None` grows every tree until its leaves are pure.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Half-width of the confidence interval, in degrees.
    pub uncertainty: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            n_samples: 1000,
            seed: 42,
            test_fraction: 0.2,
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            uncertainty: 2.0,
        }
    }
}

impl ModelConfig {
    /// Check the parameters a training pass reads. `uncertainty` is not one of them.
    pub fn validate(&self) -> Result<(), TrainingError> {
        if self.n_samples == 0 {
            return Err(TrainingError::InvalidConfig("n_samples must be positive".into()));
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(TrainingError::InvalidConfig(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.n_estimators == 0 {
            return Err(TrainingError::InvalidConfig("n_estimators must be positive".into()));
        }
        if self.min_samples_split < 2 {
            return Err(TrainingError::InvalidConfig("min_samples_split must be at least 2".into()));
        }
        if self.min_samples_leaf == 0 {
            return Err(TrainingError::InvalidConfig("min_samples_leaf must be positive".into()));
        }
        Ok(())
    }

    /// Check the settings read at prediction time.
    pub fn validate_uncertainty(&self) -> Result<()> {
        if !(self.uncertainty.is_finite() && self.uncertainty >= 0.0) {
            bail!("uncertainty must be a non-negative number, got {}", self.uncertainty);
        }
        Ok(())
    }
}

/// Address the HTTP adapter binds to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 5001 }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// train_on_startup = true
/// time_basis = "local"
///
/// [server]
/// port = 5001
///
/// [model]
/// n_estimators = 100
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub model: ModelConfig,
    /// Fit the model before the server starts accepting requests.
    pub train_on_startup: bool,
    pub time_basis: TimeBasis,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            model: ModelConfig::default(),
            train_on_startup: true,
            time_basis: TimeBasis::default(),
        }
    }
}

impl Config {
    /// Load config from the platform path, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    /// Load config from an explicit path, or return defaults if it doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        cfg.model
            .validate_uncertainty()
            .with_context(|| format!("Invalid model settings in {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the platform path, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "tempcast", "tempcast")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn defaults_match_service_constants() {
        let cfg = Config::default();

        assert_eq!(cfg.model.n_samples, 1000);
        assert_eq!(cfg.model.seed, 42);
        assert_eq!(cfg.model.n_estimators, 100);
        assert_eq!(cfg.model.uncertainty, 2.0);
        assert_eq!(cfg.bind_address(), "0.0.0.0:5001");
        assert!(cfg.train_on_startup);
        assert!(cfg.model.validate().is_ok());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            time_basis = "utc"

            [model]
            n_estimators = 10
            "#,
        )
        .expect("partial config should parse");

        assert_eq!(cfg.time_basis, TimeBasis::Utc);
        assert_eq!(cfg.model.n_estimators, 10);
        assert_eq!(cfg.model.seed, 42);
        assert_eq!(cfg.server.port, 5001);
    }

    #[test]
    fn save_and_load_explicit_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.server.port = 8080;
        cfg.model.max_depth = Some(12);
        cfg.save_to(&path).expect("save should succeed");

        let loaded = Config::load_from(&path).expect("load should succeed");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let loaded = Config::load_from(&dir.path().join("absent.toml")).expect("defaults");
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn load_rejects_negative_uncertainty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[model]\nuncertainty = -1.5\n").expect("write");

        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("uncertainty must be a non-negative number"));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let bad_fraction = ModelConfig { test_fraction: 1.0, ..ModelConfig::default() };
        assert!(matches!(bad_fraction.validate(), Err(TrainingError::InvalidConfig(_))));

        let negative_margin = ModelConfig { uncertainty: -0.5, ..ModelConfig::default() };
        assert!(negative_margin.validate().is_ok());
        assert!(negative_margin.validate_uncertainty().is_err());
        assert!(ModelConfig::default().validate_uncertainty().is_ok());

        let no_trees = ModelConfig { n_estimators: 0, ..ModelConfig::default() };
        assert!(no_trees.validate().is_err());
    }

    #[test]
    fn time_basis_as_str_roundtrip() {
        for basis in TimeBasis::all() {
            let parsed = TimeBasis::try_from(basis.as_str()).expect("roundtrip should succeed");
            assert_eq!(*basis, parsed);
        }

        let err = TimeBasis::try_from("mars").unwrap_err();
        assert!(err.to_string().contains("Unknown time basis"));
    }

    #[test]
    fn utc_wall_clock_is_naive_utc() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap();
        assert_eq!(TimeBasis::Utc.wall_clock(instant), instant.naive_utc());
    }
}
