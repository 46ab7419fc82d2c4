// src/config/app.rs
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use serde::Deserialize;
use tracing::warn;

use super::defaults::*;
use crate::consts::DEFAULT_CONFIG_FILE;
use crate::error::{KeyringError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_keyring_paths")]
    pub keyrings: KeyringPaths,
    #[serde(default = "default_features")]
    pub features: Features,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeyringPaths {
    #[serde(default)]
    pub public: Vec<PathBuf>,
    #[serde(default)]
    pub secret: Vec<PathBuf>,
    /// Per-user secret keyring path; `%u` is replaced by the username.
    /// Falls back to the built-in location when absent; an empty string
    /// turns per-user keyrings off.
    #[serde(default = "default_secret_keyring_template")]
    pub secret_keyring_template: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Features {
    /// Load the shared public/secret keyrings at all
    #[serde(default = "default_true")]
    pub gpg_keyring: bool,
}

/// Which keyrings an aggregate should open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub gpg_keyring: bool,
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Config {
            keyrings: default_keyring_paths(),
            features: default_features(),
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> std::result::Result<Config, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| KeyringError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Config::from_toml_str(&content).map_err(|source| KeyringError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn usage(&self) -> Usage {
        Usage {
            gpg_keyring: self.features.gpg_keyring,
        }
    }

    /// `SKR_SECRET_KEYRING_TEMPLATE` replaces the configured template
    pub fn apply_env_overrides(&mut self) {
        if let Ok(template) = std::env::var("SKR_SECRET_KEYRING_TEMPLATE") {
            self.keyrings.secret_keyring_template = Some(template);
        }
    }
}

static CONFIG: OnceCell<Config> = OnceCell::new();

/// Load config once. `SKR_CONFIG` names the file; built-in defaults if it is missing
pub fn load() -> Result<&'static Config> {
    CONFIG.get_or_try_init(|| {
        let config_path =
            std::env::var("SKR_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let mut conf = if Path::new(&config_path).exists() {
            Config::from_file(&config_path)?
        } else {
            warn!("{config_path} not found, using built-in defaults");
            Config::default()
        };

        conf.apply_env_overrides();
        Ok(conf)
    })
}
