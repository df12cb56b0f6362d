//! Stackport configuration
//!
//! Settings come from an optional `stackport.yaml`, overlaid with environment
//! variables. See [`find_config_file`] for the discovery order.

pub mod error;
pub mod settings;

pub use error::*;
pub use settings::Settings;

use std::path::PathBuf;

/// Environment variable pointing at a config file directly
pub const CONFIG_PATH_ENV: &str = "STACKPORT_CONFIG_PATH";

/// Return the global config directory, creating it if needed
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("stackport");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Find the project's stackport.yaml
///
/// Candidates, highest priority first:
/// 1. `STACKPORT_CONFIG_PATH`
/// 2. current directory: stackport.local.yaml, stackport.yaml
/// 3. ./.stackport/stackport.yaml
/// 4. ~/.config/stackport/config.yaml
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!("{} points at a missing file: {}", CONFIG_PATH_ENV, path.display());
    }

    let current_dir = std::env::current_dir()?;

    for filename in ["stackport.local.yaml", "stackport.yaml"] {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let project_config = current_dir.join(".stackport").join("stackport.yaml");
    if project_config.exists() {
        return Ok(project_config);
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("stackport").join("config.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    fn test_get_config_dir() {
        let config_dir = get_config_dir().unwrap();
        assert!(config_dir.ends_with("stackport"));
        assert!(config_dir.exists());
    }

    #[test]
    #[serial]
    fn test_find_config_file_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("stackport.yaml"), "project: demo\n").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = temp_env::with_var_unset(CONFIG_PATH_ENV, find_config_file);

        std::env::set_current_dir(original_dir).unwrap();
        assert!(result.unwrap().ends_with("stackport.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_config_file_local_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("stackport.yaml"), "project: shared\n").unwrap();
        fs::write(temp_dir.path().join("stackport.local.yaml"), "project: mine\n").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = temp_env::with_var_unset(CONFIG_PATH_ENV, find_config_file);

        std::env::set_current_dir(original_dir).unwrap();
        assert!(result.unwrap().ends_with("stackport.local.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_config_file_in_project_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        let project_dir = temp_dir.path().join(".stackport");
        fs::create_dir(&project_dir).unwrap();
        fs::write(project_dir.join("stackport.yaml"), "project: demo\n").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = temp_env::with_var_unset(CONFIG_PATH_ENV, find_config_file);

        std::env::set_current_dir(original_dir).unwrap();
        assert!(result.unwrap().ends_with(".stackport/stackport.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_config_file_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.yaml");
        fs::write(&config_path, "project: custom\n").unwrap();

        let result = temp_env::with_var(CONFIG_PATH_ENV, Some(&config_path), find_config_file);
        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    #[serial]
    fn test_find_config_file_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = temp_env::with_var_unset(CONFIG_PATH_ENV, find_config_file);

        std::env::set_current_dir(original_dir).unwrap();
        if dirs::config_dir()
            .map(|d| d.join("stackport").join("config.yaml").exists())
            .unwrap_or(false)
        {
            return;
        }
        assert!(matches!(result, Err(ConfigError::ConfigFileNotFound)));
    }
}
