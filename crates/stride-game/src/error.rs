use std::path::PathBuf;

use stride_physics::PhysicsError;

/// Errors raised by the player controller.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("physics bridge failed: {0}")]
    Physics(#[from] PhysicsError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("controller is already initialized")]
    AlreadyInitialized,
}

/// Errors raised while loading, merging or validating a character config.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to access config file '{0}': {1}")]
    Io(PathBuf, std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
