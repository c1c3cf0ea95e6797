//! core::config::schema
//!
//! Configuration schema types.
//!
//! Config values are validated after parsing so a typo in a trunk name is
//! caught at load time, not deep inside a sync.

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::BranchName;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// interactive = true
///
/// [forge]
/// host = "github.com"
/// token = "ghp_..."
///
/// [pull_request]
/// open_browser = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Default interactive mode.
    pub interactive: Option<bool>,

    /// Forge connection defaults.
    pub forge: Option<ForgeConfig>,

    /// Pull-request behavior defaults.
    pub pull_request: Option<PullRequestConfig>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(forge) = &self.forge {
            forge.validate()?;
        }
        Ok(())
    }
}

/// Repository configuration.
///
/// # Example
///
/// ```toml
/// remote = "origin"
/// additional_trunks = ["release-2.x"]
///
/// [forge]
/// host = "github.com"
///
/// [pull_request]
/// rebase_with_draft = false
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepoConfig {
    /// Remote name (default: "origin").
    pub remote: Option<String>,

    /// Long-lived branches treated as trunks in addition to the
    /// repository default branch.
    pub additional_trunks: Vec<String>,

    /// Forge connection settings for this repository.
    pub forge: Option<ForgeConfig>,

    /// Pull-request behavior for this repository.
    pub pull_request: Option<PullRequestConfig>,
}

impl RepoConfig {
    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(remote) = &self.remote {
            if remote.is_empty() {
                return Err(ConfigError::InvalidValue("remote cannot be empty".into()));
            }
        }
        for trunk in &self.additional_trunks {
            BranchName::new(trunk).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid additional trunk '{trunk}': {e}"))
            })?;
        }
        if let Some(forge) = &self.forge {
            forge.validate()?;
        }
        Ok(())
    }
}

/// Forge connection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ForgeConfig {
    /// Forge host (default: "github.com").
    pub host: Option<String>,

    /// API token. The `AV_GITHUB_TOKEN` environment variable takes
    /// precedence over this value.
    pub token: Option<String>,
}

impl ForgeConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(host) = &self.host {
            if host.is_empty() {
                return Err(ConfigError::InvalidValue(
                    "forge host cannot be empty".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Pull-request behavior settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PullRequestConfig {
    /// Open the request permalink in a browser after creation.
    pub open_browser: Option<bool>,

    /// Convert requests to draft around base-changing pushes. When unset,
    /// the behavior is decided by whether the repository carries an owners
    /// file (codeowners auto-assignment fires on base changes).
    pub rebase_with_draft: Option<bool>,

    /// Disable treating "WIP"-titled requests as drafts.
    pub no_wip_detection: Option<bool>,
}
