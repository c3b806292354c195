//! Character settings with persistence
//!
//! Settings are saved to `~/.config/stride/character.toml`

use std::path::{Path, PathBuf};

use stride_game::CharacterConfig;
use tracing::{info, warn};

/// Get the config directory path
fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("stride"))
}

/// Get the character settings file path
pub fn settings_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("character.toml"))
}

/// Load the character config from the default location, or defaults
pub fn load() -> CharacterConfig {
    let Some(path) = settings_path() else {
        warn!("Could not determine config directory");
        return CharacterConfig::default();
    };
    load_from(&path)
}

/// Load the character config from `path`, falling back to defaults
pub fn load_from(path: &Path) -> CharacterConfig {
    if !path.exists() {
        info!("No character settings at {:?}, using defaults", path);
        return CharacterConfig::default();
    }

    match CharacterConfig::load(path) {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load character settings: {}, using defaults", e);
            CharacterConfig::default()
        }
    }
}

/// Save the character config to the default location
pub fn save(config: &CharacterConfig) -> anyhow::Result<PathBuf> {
    let Some(path) = settings_path() else {
        anyhow::bail!("Could not determine config directory");
    };
    config.save(&path)?;
    Ok(path)
}
