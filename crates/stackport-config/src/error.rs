use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config directory not found")]
    ConfigDirNotFound,

    #[error("Cache directory not found; set cache_dir in stackport.yaml")]
    CacheDirNotFound,

    #[error(
        "Config file not found. Looked in:\n\
        - current directory: stackport.local.yaml, stackport.yaml\n\
        - ./.stackport/stackport.yaml\n\
        - ~/.config/stackport/config.yaml\n\
        or point STACKPORT_CONFIG_PATH at a file"
    )]
    ConfigFileNotFound,

    #[error("Missing configuration value: {key} (set {env} or `{key}` in stackport.yaml)")]
    MissingValue { key: &'static str, env: &'static str },

    #[error("Invalid configuration value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
