use crate::api::DEFAULT_BASE_URL;
use crate::session;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A problem found in the configuration
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

/// Where the session is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    File,
    Memory,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ApiConfig {
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SessionConfig {
    #[serde(default)]
    pub store: Option<StoreKind>,
    /// Session file; defaults to ~/.userdesk/currentUser.json
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ActivityConfig {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ReplConfig {
    #[serde(default)]
    pub history_file: Option<PathBuf>,
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub activity: ActivityConfig,
    #[serde(default)]
    pub repl: ReplConfig,
}

fn user_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".userdesk"))
}

impl Config {
    /// Built-in defaults
    pub fn with_defaults() -> Self {
        Config {
            api: ApiConfig {
                base_url: Some(DEFAULT_BASE_URL.to_string()),
            },
            session: SessionConfig {
                store: Some(StoreKind::File),
                path: user_dir().map(|d| session::file_in(&d)),
            },
            activity: ActivityConfig {
                enabled: Some(true),
                dir: Some(Path::new(".userdesk").join("activity")),
            },
            repl: ReplConfig {
                history_file: user_dir().map(|d| d.join("history")),
            },
        }
    }

    /// Load configuration from default paths
    /// Priority: local (.userdesk/config.local.toml) > project (.userdesk/config.toml)
    /// > user (~/.userdesk/config.toml)
    pub fn load() -> Result<Self> {
        let mut config = Self::with_defaults();

        if let Some(dir) = user_dir() {
            let user_config = dir.join("config.toml");
            if user_config.exists() {
                config.merge(Self::load_from(&user_config)?);
            }
        }

        let project_config = Path::new(".userdesk").join("config.toml");
        if project_config.exists() {
            config.merge(Self::load_from(&project_config)?);
        }

        // Should be gitignored
        let local_config = Path::new(".userdesk").join("config.local.toml");
        if local_config.exists() {
            config.merge(Self::load_from(&local_config)?);
        }

        Ok(config)
    }

    /// Load configuration from a specific path, on top of the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes priority for every
    /// value it sets)
    pub fn merge(&mut self, other: Config) {
        if other.api.base_url.is_some() {
            self.api.base_url = other.api.base_url;
        }
        if other.session.store.is_some() {
            self.session.store = other.session.store;
        }
        if other.session.path.is_some() {
            self.session.path = other.session.path;
        }
        if other.activity.enabled.is_some() {
            self.activity.enabled = other.activity.enabled;
        }
        if other.activity.dir.is_some() {
            self.activity.dir = other.activity.dir;
        }
        if other.repl.history_file.is_some() {
            self.repl.history_file = other.repl.history_file;
        }
    }

    pub fn base_url(&self) -> &str {
        self.api.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn store_kind(&self) -> StoreKind {
        self.session.store.unwrap_or_default()
    }

    pub fn activity_enabled(&self) -> bool {
        self.activity.enabled.unwrap_or(true)
    }

    /// Validate configuration and return any issues found
    pub fn validate(&self) -> Result<(), Vec<ConfigIssue>> {
        let mut issues = Vec::new();

        let base_url = self.base_url();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            issues.push(ConfigIssue {
                field: "api.base_url".to_string(),
                message: format!("Must start with http:// or https://, got '{}'", base_url),
            });
        }

        if self.store_kind() == StoreKind::File && self.session.path.is_none() {
            issues.push(ConfigIssue {
                field: "session.path".to_string(),
                message: "Required for the file store (no home directory found)".to_string(),
            });
        }

        if self.activity_enabled() && self.activity.dir.is_none() {
            issues.push(ConfigIssue {
                field: "activity.dir".to_string(),
                message: "Required when the activity log is enabled".to_string(),
            });
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn defaults_with_path() -> Config {
        let mut config = Config::with_defaults();
        config.session.path = Some(PathBuf::from("/tmp/currentUser.json"));
        config
    }

    #[test]
    fn test_defaults() {
        if let Some(path) = &Config::with_defaults().session.path {
            assert!(path.ends_with("currentUser.json"));
        }
        let config = defaults_with_path();
        assert_eq!(config.base_url(), "http://localhost:3001/api");
        assert_eq!(config.store_kind(), StoreKind::File);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_overrides_only_set_values() {
        let mut config = defaults_with_path();
        let other: Config = toml::from_str(
            r#"
            [api]
            base_url = "https://users.example.com/api"

            [session]
            store = "memory"
            "#,
        )
        .unwrap();
        config.merge(other);
        assert_eq!(config.base_url(), "https://users.example.com/api");
        assert_eq!(config.store_kind(), StoreKind::Memory);
        assert_eq!(
            config.session.path.as_deref(),
            Some(Path::new("/tmp/currentUser.json"))
        );
        assert!(config.activity_enabled());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[activity]\nenabled = false\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.activity.enabled, Some(false));
        assert!(config.api.base_url.is_none());
    }

    #[test]
    fn test_load_from_rejects_bad_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[session]\nstore = \"cloud\"\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_validate_bad_url() {
        let mut config = defaults_with_path();
        config.api.base_url = Some("localhost:3001".to_string());
        let issues = config.validate().unwrap_err();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].field.contains("base_url"));
    }

    #[test]
    fn test_validate_missing_session_path() {
        let mut config = defaults_with_path();
        config.session.path = None;
        let issues = config.validate().unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "session.path");

        config.session.store = Some(StoreKind::Memory);
        assert!(config.validate().is_ok());
    }
}
