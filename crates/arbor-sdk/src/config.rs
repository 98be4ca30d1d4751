//! Repository configuration.
//!
//! Stored as TOML:
//!
//! ```toml
//! [user]
//! name = "groldan"
//! email = "groldan@example.org"
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use arbor_merge::Identity;

use crate::error::{SdkError, SdkResult};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfig {
    #[serde(default)]
    pub user: UserConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl RepoConfig {
    pub fn from_toml(text: &str) -> SdkResult<Self> {
        toml::from_str(text).map_err(|e| SdkError::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> SdkResult<String> {
        toml::to_string(self).map_err(|e| SdkError::Config(e.to_string()))
    }

    /// Read `path`, or start from defaults when it does not exist.
    pub fn load(path: &Path) -> SdkResult<Self> {
        if !path.exists() {
            info!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::from_toml(&fs::read_to_string(path)?)
    }

    pub fn save(&self, path: &Path) -> SdkResult<()> {
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Look up a dotted key such as `user.name`.
    pub fn get(&self, key: &str) -> SdkResult<Option<&str>> {
        Ok(match key {
            "user.name" => self.user.name.as_deref(),
            "user.email" => self.user.email.as_deref(),
            _ => return Err(SdkError::Config(format!("unknown key: {key}"))),
        })
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) -> SdkResult<()> {
        let slot = match key {
            "user.name" => &mut self.user.name,
            "user.email" => &mut self.user.email,
            _ => return Err(SdkError::Config(format!("unknown key: {key}"))),
        };
        *slot = Some(value.into());
        Ok(())
    }

    /// The commit identity, if both name and email are set.
    pub fn identity(&self) -> Option<Identity> {
        match (&self.user.name, &self.user.email) {
            (Some(name), Some(email)) => Some(Identity::new(name.clone(), email.clone())),
            _ => None,
        }
    }
}
