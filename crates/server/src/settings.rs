use std::path::{Path, PathBuf};

use anyhow::Context;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

pub const SETTINGS_FILE: &str = "server.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bind_addr: String,
    pub config_path: PathBuf,
    pub calendar_path: Option<PathBuf>,
    pub version_path: PathBuf,
    pub max_body_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".into(),
            config_path: "./config.json".into(),
            calendar_path: None,
            version_path: "./version.txt".into(),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Defaults, then `server.toml` if present, then `APP__*` environment variables.
pub fn load_settings() -> anyhow::Result<Settings> {
    load_settings_from(Path::new(SETTINGS_FILE))
}

pub fn load_settings_from(file: &Path) -> anyhow::Result<Settings> {
    let raw = Config::builder()
        .add_source(
            File::from(file)
                .format(FileFormat::Toml)
                .required(false),
        )
        .add_source(
            Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("failed to read settings from '{}'", file.display()))?;

    let settings: Settings = raw
        .try_deserialize()
        .context("invalid server settings")?;
    if settings.max_body_bytes == 0 {
        anyhow::bail!("max_body_bytes must be greater than zero");
    }
    Ok(settings)
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
