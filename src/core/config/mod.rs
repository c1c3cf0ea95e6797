//! core::config
//!
//! Configuration loading and precedence.
//!
//! Two scopes, later overrides earlier:
//! 1. Global config — `$AV_CONFIG` if set, else
//!    `$XDG_CONFIG_HOME/av/config.toml`, else `~/.av/config.toml`.
//! 2. Repo config — `.git/av/config.toml`.
//!
//! Missing files are not errors; defaults apply. Files that exist but do
//! not parse are errors — a half-read config is worse than none.
//!
//! Configuration is loaded once at process start and passed around as an
//! immutable value; nothing in the engine re-reads it mid-operation.

pub mod schema;

pub use schema::{ForgeConfig, GlobalConfig, PullRequestConfig, RepoConfig};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::paths::AvPaths;

/// Environment variable overriding the global config path.
const CONFIG_PATH_ENV: &str = "AV_CONFIG";

/// Environment variable carrying the forge API token.
pub const TOKEN_ENV: &str = "AV_GITHUB_TOKEN";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Merged configuration with precedence applied by the accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration.
    pub global: GlobalConfig,
    /// Repository configuration, when loaded inside a repository.
    pub repo: Option<RepoConfig>,
}

impl Config {
    /// Load configuration, including repo config when `paths` is given.
    ///
    /// # Errors
    ///
    /// Returns an error only for files that exist and fail to parse or
    /// validate.
    pub fn load(paths: Option<&AvPaths>) -> Result<Self, ConfigError> {
        let global = match global_config_path() {
            Some(path) if path.exists() => read_toml::<GlobalConfig>(&path)?,
            _ => GlobalConfig::default(),
        };
        global.validate()?;

        let repo = match paths {
            Some(paths) => {
                let path = paths.repo_config();
                if path.exists() {
                    let config = read_toml::<RepoConfig>(&path)?;
                    config.validate()?;
                    Some(config)
                } else {
                    None
                }
            }
            None => None,
        };

        Ok(Self { global, repo })
    }

    /// Write the repo config to its canonical location.
    pub fn write_repo(paths: &AvPaths, config: &RepoConfig) -> Result<(), ConfigError> {
        config.validate()?;
        paths.ensure_dir().map_err(|source| ConfigError::Write {
            path: paths.state_dir(),
            source,
        })?;
        let path = paths.repo_config();
        let text = toml::to_string_pretty(config).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            message: e.to_string(),
        })?;
        fs::write(&path, text).map_err(|source| ConfigError::Write { path, source })
    }

    /// The configured remote name, defaulting to "origin".
    pub fn remote(&self) -> &str {
        self.repo
            .as_ref()
            .and_then(|r| r.remote.as_deref())
            .unwrap_or("origin")
    }

    /// Additional trunk branch names beyond the repository default branch.
    pub fn additional_trunks(&self) -> &[String] {
        self.repo
            .as_ref()
            .map(|r| r.additional_trunks.as_slice())
            .unwrap_or(&[])
    }

    /// The forge host, repo config first, then global, then github.com.
    pub fn forge_host(&self) -> &str {
        self.repo
            .as_ref()
            .and_then(|r| r.forge.as_ref())
            .and_then(|f| f.host.as_deref())
            .or_else(|| {
                self.global
                    .forge
                    .as_ref()
                    .and_then(|f| f.host.as_deref())
            })
            .unwrap_or("github.com")
    }

    /// Resolve the forge API token: environment first, then config.
    pub fn forge_token(&self) -> Option<String> {
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.is_empty() {
                return Some(token);
            }
        }
        self.repo
            .as_ref()
            .and_then(|r| r.forge.as_ref())
            .and_then(|f| f.token.clone())
            .or_else(|| {
                self.global
                    .forge
                    .as_ref()
                    .and_then(|f| f.token.clone())
            })
    }

    /// Whether to open request permalinks in the browser after creation.
    pub fn open_browser(&self) -> bool {
        self.pull_request_setting(|p| p.open_browser).unwrap_or(false)
    }

    /// The draft-cycling policy around base-changing pushes.
    ///
    /// `None` means "decide from the presence of an owners file".
    pub fn rebase_with_draft(&self) -> Option<bool> {
        self.pull_request_setting(|p| p.rebase_with_draft)
    }

    /// Whether "WIP"-titled requests should skip draft conversion.
    pub fn no_wip_detection(&self) -> bool {
        self.pull_request_setting(|p| p.no_wip_detection)
            .unwrap_or(false)
    }

    fn pull_request_setting<T>(
        &self,
        get: impl Fn(&PullRequestConfig) -> Option<T>,
    ) -> Option<T> {
        self.repo
            .as_ref()
            .and_then(|r| r.pull_request.as_ref())
            .and_then(&get)
            .or_else(|| self.global.pull_request.as_ref().and_then(&get))
    }
}

/// The global config location, honoring `$AV_CONFIG`.
fn global_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let xdg = config_dir.join("av").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    dirs::home_dir().map(|home| home.join(".av").join("config.toml"))
}

fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
