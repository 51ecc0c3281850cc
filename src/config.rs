use std::io::ErrorKind;

use anyhow::{Context, Result};
use clap_serde_derive::ClapSerde;

pub const DEFAULT_CONFIG_FILE: &str = "SentimentApi.toml";

#[derive(ClapSerde, Debug)]
pub struct Config {
    /// The address the listener binds to
    #[default("0.0.0.0".to_string())]
    #[arg(short, long, env)]
    pub address: String,

    /// The port the listener binds to
    #[default(25566)]
    #[arg(short, long, env)]
    pub port: u16,

    /// Path to the serialized model artifact
    #[default("model.json".to_string())]
    #[arg(short, long, env)]
    pub model_path: String,

    /// The single origin allowed to make cross-origin requests
    #[default("http://localhost:5173".to_string())]
    #[arg(long, env)]
    pub cors_origin: String,

    /// OTLP collector endpoint, telemetry is only exported when not empty
    #[default(String::new())]
    #[arg(long, env)]
    pub otlp_endpoint: String,

    /// Keep logging to the console while exporting to a collector
    #[default(false)]
    #[arg(long, env)]
    pub console_log: bool,
}

impl Config {
    pub fn from_toml(path: &str) -> Result<Self> {
        let str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {path}"))?;
        let opt: <Config as ClapSerde>::Opt = toml::from_str(&str)
            .with_context(|| format!("Failed to parse configuration file {path}"))?;
        Ok(Config::from(opt))
    }

    /// Reads `path`, or uses the defaults when `optional` is set and the file does not exist.
    /// A file that exists but cannot be parsed is always an error.
    pub fn load(path: &str, optional: bool) -> Result<Self> {
        match Self::from_toml(path) {
            Err(err) if optional && is_not_found(&err) => Ok(Config::default()),
            result => result,
        }
    }

    pub fn otlp_endpoint(&self) -> Option<&str> {
        match self.otlp_endpoint.trim() {
            "" => None,
            endpoint => Some(endpoint),
        }
    }
}

fn is_not_found(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == ErrorKind::NotFound)
    })
}
