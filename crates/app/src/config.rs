use clap::Parser;
use echovox_foundation::AppError;
use echovox_pricing::DEFAULT_MODEL;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "echovox", about = "Live voice client for conversational models")]
pub struct Cli {
    /// Model to converse with
    #[arg(long, env = "ECHOVOX_MODEL")]
    pub model: Option<String>,

    /// Input device name (host default when omitted)
    #[arg(long, env = "ECHOVOX_INPUT_DEVICE")]
    pub input_device: Option<String>,

    /// Output device name (host default when omitted)
    #[arg(long, env = "ECHOVOX_OUTPUT_DEVICE")]
    pub output_device: Option<String>,

    /// Optional TOML settings file; CLI flags take precedence
    #[arg(long, env = "ECHOVOX_SETTINGS")]
    pub settings: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct Settings {
    model: Option<String>,
    input_device: Option<String>,
    output_device: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model_id: String,
    pub input_device: Option<String>,
    pub output_device: Option<String>,
}

impl AppConfig {
    pub fn load(cli: Cli) -> Result<Self, AppError> {
        let settings = match &cli.settings {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    AppError::Config(format!("Cannot read {}: {}", path.display(), e))
                })?;
                toml::from_str::<Settings>(&raw)
                    .map_err(|e| AppError::Config(format!("Invalid settings file: {}", e)))?
            }
            None => Settings::default(),
        };

        Ok(Self {
            model_id: cli
                .model
                .or(settings.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            input_device: cli.input_device.or(settings.input_device),
            output_device: cli.output_device.or(settings.output_device),
        })
    }
}
