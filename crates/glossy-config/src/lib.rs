mod types;

pub use types::*;

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::info;

/// Returns the config directory: `<platform config dir>/glossy/`
pub fn config_dir() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
        .join("glossy");
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Returns the config file path: `<platform config dir>/glossy/config.toml`
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Load config from the default location, or return defaults if not found.
pub fn load_config() -> Result<GlossyConfig> {
    load_config_from(&config_path()?)
}

/// Save config to the default location.
pub fn save_config(config: &GlossyConfig) -> Result<()> {
    save_config_to(config, &config_path()?)
}

pub fn load_config_from(path: &Path) -> Result<GlossyConfig> {
    if path.exists() {
        let contents = std::fs::read_to_string(path)?;
        let config: GlossyConfig = toml::from_str(&contents)?;
        info!(?path, "Loaded config");
        Ok(config)
    } else {
        info!("No config found, using defaults");
        Ok(GlossyConfig::default())
    }
}

pub fn save_config_to(config: &GlossyConfig, path: &Path) -> Result<()> {
    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    info!(?path, "Saved config");
    Ok(())
}
