use std::{
    fs, io,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inquire::{Confirm, CustomType, Select, Text};
use tempcast_core::{
    Config, DEFAULT_HOURS_AHEAD, PredictionResult, PredictionService, TimeBasis, TrainingReport,
    WeatherObservation,
};

use crate::server;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "tempcast", version, about = "Short-horizon temperature prediction")]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the prediction REST API.
    Serve {
        /// Overrides `server.host` from the config.
        #[arg(long)]
        host: Option<String>,

        /// Overrides `server.port` from the config.
        #[arg(long)]
        port: Option<u16>,
    },

    /// Train the model once and print its scores.
    Train,

    /// Predict from an observation in JSON (OpenWeather "current weather" shape).
    Predict {
        /// JSON file to read; stdin when absent.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Prediction horizon in hours.
        #[arg(long, default_value_t = DEFAULT_HOURS_AHEAD)]
        hours: f64,
    },

    /// Interactively edit and save the configuration.
    Configure,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config_path = match self.config {
            Some(path) => path,
            None => Config::config_file_path()?,
        };
        let mut config = Config::load_from(&config_path)?;

        match self.command {
            Command::Serve { host, port } => {
                if let Some(host) = host {
                    config.server.host = host;
                }
                if let Some(port) = port {
                    config.server.port = port;
                }
                server::run_server(config).await
            }
            Command::Train => {
                let service = PredictionService::from_config(&config);
                let report = tokio::task::spawn_blocking(move || service.train())
                    .await
                    .context("Training task panicked")?
                    .context("Failed to train model")?;
                println!("{}", format_report(&report));
                Ok(())
            }
            Command::Predict { file, hours } => {
                let observation = read_observation(file.as_deref())?;
                let service = PredictionService::from_config(&config);
                let result =
                    tokio::task::spawn_blocking(move || service.predict(&observation, hours))
                        .await
                        .context("Prediction task panicked")?
                        .context("Failed to generate prediction")?;
                println!("{}", format_prediction(&result));
                Ok(())
            }
            Command::Configure => {
                let updated = prompt_config(config)?;
                updated.save_to(&config_path)?;
                println!("Configuration saved to {}", config_path.display());
                Ok(())
            }
        }
    }
}

fn read_observation(file: Option<&Path>) -> Result<WeatherObservation> {
    let raw = match file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read observation file: {}", path.display()))?,
        None => io::read_to_string(io::stdin()).context("Failed to read observation from stdin")?,
    };
    parse_observation(&raw)
}

fn parse_observation(raw: &str) -> Result<WeatherObservation> {
    serde_json::from_str(raw).context("Observation must be a JSON object")
}

fn prompt_config(mut config: Config) -> Result<Config> {
    let host = Text::new("Server host:").with_default(&config.server.host).prompt()?;
    config.server.host = host;
    config.server.port = CustomType::<u16>::new("Server port:")
        .with_default(config.server.port)
        .with_error_message("Please enter a port number between 0 and 65535")
        .prompt()?;
    config.train_on_startup = Confirm::new("Train the model when the server starts?")
        .with_default(config.train_on_startup)
        .prompt()?;

    let bases = TimeBasis::all().to_vec();
    let current = bases.iter().position(|b| *b == config.time_basis).unwrap_or(0);
    config.time_basis = Select::new("Read hour/day/month features from which clock?", bases)
        .with_starting_cursor(current)
        .prompt()?;

    config.model.n_estimators = CustomType::<usize>::new("Number of trees:")
        .with_default(config.model.n_estimators)
        .prompt()?;
    config.model.uncertainty = CustomType::<f64>::new("Confidence margin (degrees):")
        .with_default(config.model.uncertainty)
        .prompt()?;

    config.model.validate()?;
    config.model.validate_uncertainty()?;
    Ok(config)
}

fn format_prediction(result: &PredictionResult) -> String {
    format!(
        "Predicted temperature in {}h: {:.1}°C (range {:.1}°C .. {:.1}°C)\n\
         Confidence: {}\n\
         Generated at: {}",
        result.hours_ahead,
        result.predicted_temperature,
        result.confidence_min,
        result.confidence_max,
        result.model_confidence,
        result.prediction_time.to_rfc3339(),
    )
}

fn format_report(report: &TrainingReport) -> String {
    format!(
        "Model trained successfully\n\
         Train score: {:.3} ({} rows)\n\
         Test score:  {:.3} ({} rows)",
        report.train_score, report.train_rows, report.test_score, report.test_rows,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use clap::CommandFactory;
    use std::time::Duration;
    use tempcast_core::ConfidenceLevel;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn predict_defaults_to_24_hours() {
        let cli = Cli::try_parse_from(["tempcast", "predict"]).expect("should parse");
        match cli.command {
            Command::Predict { file, hours } => {
                assert!(file.is_none());
                assert_eq!(hours, 24.0);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_config_and_serve_overrides() {
        let cli = Cli::try_parse_from([
            "tempcast", "serve", "--port", "8080", "--config", "/tmp/tempcast.toml",
        ])
        .expect("should parse");

        assert_eq!(cli.config.as_deref(), Some(Path::new("/tmp/tempcast.toml")));
        match cli.command {
            Command::Serve { host, port } => {
                assert!(host.is_none());
                assert_eq!(port, Some(8080));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn fractional_hours_are_accepted() {
        let cli = Cli::try_parse_from(["tempcast", "predict", "--hours", "12.5"])
            .expect("should parse");
        match cli.command {
            Command::Predict { hours, .. } => assert_eq!(hours, 12.5),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parse_observation_accepts_partial_json() {
        let obs = parse_observation(r#"{"main": {"temp": 18.5}}"#).expect("should parse");
        assert_eq!(obs.main.and_then(|m| m.temp), Some(18.5));

        let err = parse_observation("not json").unwrap_err();
        assert!(err.to_string().contains("Observation must be a JSON object"));
    }

    #[test]
    fn read_observation_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("obs.json");
        fs::write(&path, r#"{"visibility": 5000}"#).expect("write");

        let obs = read_observation(Some(&path)).expect("should read");
        assert_eq!(obs.visibility, Some(5000.0));

        let err = read_observation(Some(&dir.path().join("missing.json"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read observation file"));
    }

    #[test]
    fn prediction_output_is_human_readable() {
        let result = PredictionResult {
            predicted_temperature: 21.8,
            confidence_min: 19.8,
            confidence_max: 23.8,
            hours_ahead: 24.0,
            prediction_time: Utc.with_ymd_and_hms(2024, 7, 16, 12, 0, 0).unwrap(),
            model_confidence: ConfidenceLevel::Medium,
        };

        let text = format_prediction(&result);
        assert!(text.contains("in 24h: 21.8°C (range 19.8°C .. 23.8°C)"));
        assert!(text.contains("Confidence: medium"));
        assert!(text.contains("2024-07-16T12:00:00+00:00"));
    }

    #[test]
    fn report_output_lists_both_scores() {
        let report = TrainingReport {
            train_score: 0.9712,
            test_score: 0.8049,
            train_rows: 800,
            test_rows: 200,
            elapsed: Duration::from_millis(1200),
        };

        let text = format_report(&report);
        assert!(text.contains("Train score: 0.971 (800 rows)"));
        assert!(text.contains("Test score:  0.805 (200 rows)"));
    }
}
