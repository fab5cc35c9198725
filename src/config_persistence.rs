use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::config::{sanitize_config, Config};
use crate::error::{ArtworkError, Result};

const CONFIG_DIR_NAME: &str = "archive-artwork";
const CONFIG_FILE_NAME: &str = "config.toml";

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str::<Config>(content)
        .map(sanitize_config)
        .map_err(|error| ArtworkError::Config(error.to_string()))
}

/// Reads `path`, writing a default config there first when it does not exist.
pub fn load_or_create_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        info!(
            "Config file not found. Creating default config. path={}",
            path.display()
        );
        write_config(path, &Config::default())?;
    }

    let content = fs::read_to_string(path).map_err(|error| ArtworkError::io(path, error))?;
    match parse_config(&content) {
        Ok(config) => Ok(config),
        Err(error) => {
            warn!(
                "Config at {} is invalid ({}), using defaults",
                path.display(),
                error
            );
            Ok(Config::default())
        }
    }
}

pub fn write_config(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|error| ArtworkError::io(parent, error))?;
    }
    let serialized =
        toml::to_string(config).map_err(|error| ArtworkError::Config(error.to_string()))?;
    fs::write(path, serialized).map_err(|error| ArtworkError::io(path, error))
}
