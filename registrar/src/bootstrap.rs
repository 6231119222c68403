//! Configuration loading

use anyhow::{Context, Result};
use std::path::Path;

use registrar_core::Config;

const CWD_CONFIG: &str = "registrar.yaml";
const MOUNTED_CONFIG: &str = "/config/registrar.yaml";

/// Load and validate configuration.
///
/// Config file search order:
/// 1. `explicit` (from `--config` or `REGISTRAR_CONFIG_PATH`), which must exist
/// 2. ./registrar.yaml (current working directory)
/// 3. /config/registrar.yaml (container mount path)
/// 4. Environment variables and defaults only
///
/// `REGISTRAR_*` environment variables override the file in every case.
pub fn load_config(explicit: Option<&str>) -> Result<Config> {
    let config_path = match explicit {
        Some(path) if Path::new(path).exists() => Some(path.to_string()),
        Some(path) => anyhow::bail!("Config file '{path}' does not exist"),
        None => [CWD_CONFIG, MOUNTED_CONFIG]
            .into_iter()
            .find(|p| Path::new(p).exists())
            .map(str::to_string),
    };

    let config = match &config_path {
        Some(path) => {
            eprintln!("Loading config from {path}");
            Config::from_file(path).with_context(|| format!("Failed to load config from {path}"))?
        }
        None => Config::from_env().context("Failed to load config from environment")?,
    };

    // Fail fast on misconfigurations
    if let Err(errors) = config.validate() {
        for e in &errors {
            eprintln!("Config validation error: {e}");
        }
        anyhow::bail!(
            "Configuration validation failed with {} error(s)",
            errors.len()
        );
    }

    Ok(config)
}
