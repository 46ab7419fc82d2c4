// src/config/defaults.rs
use std::path::PathBuf;

use crate::config::app::{Features, KeyringPaths};
use crate::consts::{
    CONFIG_DIR_NAME, DEFAULT_PUBLIC_KEYRING, DEFAULT_SECRET_KEYRING,
    DEFAULT_SECRET_KEYRING_TEMPLATE,
};

fn home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

pub fn default_secret_keyring_template() -> Option<String> {
    let template = dirs::config_dir()
        .unwrap_or_else(|| home().join(".config"))
        .join(CONFIG_DIR_NAME)
        .join(DEFAULT_SECRET_KEYRING_TEMPLATE);
    Some(template.to_string_lossy().into_owned())
}

pub fn default_keyring_paths() -> KeyringPaths {
    KeyringPaths {
        public: vec![home().join(DEFAULT_PUBLIC_KEYRING)],
        secret: vec![home().join(DEFAULT_SECRET_KEYRING)],
        secret_keyring_template: default_secret_keyring_template(),
    }
}

pub fn default_features() -> Features {
    Features { gpg_keyring: true }
}
