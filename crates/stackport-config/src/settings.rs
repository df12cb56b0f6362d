use crate::error::{ConfigError, Result};
use crate::find_config_file;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const PROJECT_ENV: &str = "PROJECT_NAME";
pub const ORGANIZATION_ENV: &str = "PULUMI_ORG";
pub const REGION_ENV: &str = "STACKPORT_REGION";
pub const CACHE_DIR_ENV: &str = "STACKPORT_CACHE_DIR";
pub const WORK_DIR_ENV: &str = "STACKPORT_WORK_DIR";

/// Runtime settings
///
/// ```yaml
/// project: stackport
/// organization: acme
/// region: eu-west-1
/// instance_types: [t2.micro, t3.small]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Engine project every stack belongs to
    pub project: String,

    /// Engine organization, used only to build console URLs
    pub organization: String,

    pub region: String,

    pub console_base: String,

    /// Instance types a VM may be created with; the first one is the default
    pub instance_types: Vec<String>,

    pub engine_timeout_secs: u64,

    pub fetch_timeout_secs: u64,

    pub cache_lock_timeout_ms: u64,

    pub cache_dir: Option<PathBuf>,

    /// Where generated engine programs are written
    pub work_dir: Option<PathBuf>,

    pub pulumi_binary: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            project: String::new(),
            organization: String::new(),
            region: "us-east-1".to_string(),
            console_base: "https://app.pulumi.com".to_string(),
            instance_types: vec!["t2.micro".to_string()],
            engine_timeout_secs: 30 * 60,
            fetch_timeout_secs: 30,
            cache_lock_timeout_ms: 2_000,
            cache_dir: None,
            work_dir: None,
            pulumi_binary: "pulumi".to_string(),
        }
    }
}

impl Settings {
    /// Load the discovered config file (if any), apply the environment and validate
    pub fn load() -> Result<Self> {
        let mut settings = match find_config_file() {
            Ok(path) => Self::from_file(&path)?,
            Err(ConfigError::ConfigFileNotFound) => {
                tracing::debug!("No config file found, using defaults");
                Self::default()
            }
            Err(e) => return Err(e),
        };

        settings.apply_env(|key| std::env::var(key).ok());
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings = Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(settings)
    }

    pub fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Overlay values from the environment; blank values are ignored
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(project) = get(PROJECT_ENV) {
            self.project = project;
        }
        if let Some(organization) = get(ORGANIZATION_ENV) {
            self.organization = organization;
        }
        if let Some(region) = get(REGION_ENV) {
            self.region = region;
        }
        if let Some(dir) = get(CACHE_DIR_ENV) {
            self.cache_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = get(WORK_DIR_ENV) {
            self.work_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.project.trim().is_empty() {
            return Err(ConfigError::MissingValue {
                key: "project",
                env: PROJECT_ENV,
            });
        }
        if self.organization.trim().is_empty() {
            return Err(ConfigError::MissingValue {
                key: "organization",
                env: ORGANIZATION_ENV,
            });
        }
        if self.instance_types.iter().all(|t| t.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                key: "instance_types",
                reason: "at least one instance type is required".to_string(),
            });
        }
        if self.engine_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "engine_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn engine_timeout(&self) -> Duration {
        Duration::from_secs(self.engine_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn cache_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_lock_timeout_ms)
    }

    /// Listing cache directory, per project
    pub fn cache_dir(&self) -> Result<PathBuf> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(dirs::cache_dir()
                .ok_or(ConfigError::CacheDirNotFound)?
                .join("stackport")
                .join(&self.project)),
        }
    }

    /// Engine program directory, per project
    pub fn work_dir(&self) -> Result<PathBuf> {
        match &self.work_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(dirs::data_local_dir()
                .ok_or(ConfigError::ConfigDirNotFound)?
                .join("stackport")
                .join(&self.project)),
        }
    }
}
