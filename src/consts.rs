// src/consts.rs
//! Shared constants — file naming, identifier sizes and user-facing phrasing

/// Placeholder replaced by the username in the secret keyring template
pub const USERNAME_TOKEN: &str = "%u";

/// Default per-user secret keyring file name (relative to the config dir)
pub const DEFAULT_SECRET_KEYRING_TEMPLATE: &str = "secretkeys.%u.gpg";

/// Default public keyring, relative to the home directory
pub const DEFAULT_PUBLIC_KEYRING: &str = ".gnupg/pubring.gpg";

/// Default secret keyring, relative to the home directory
pub const DEFAULT_SECRET_KEYRING: &str = ".gnupg/secring.gpg";

/// Sub-directory of the platform config dir holding per-user keyrings
pub const CONFIG_DIR_NAME: &str = "secret-keyring";

/// Config file consulted when `SKR_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "skr-config.toml";

/// Fingerprint length in bytes (160 bits)
pub const FINGERPRINT_LEN: usize = 20;

/// Short key identifier length in bytes (64 bits)
pub const KEY_ID_LEN: usize = 8;

/// Provenance phrasing shown while unlocking
pub const PROVENANCE_DEVICE_KEY: &str = "your device key";
pub const PROVENANCE_LOCAL_KEYRING: &str = "a key in your local keyring";
pub const PROVENANCE_SYNCED_KEY: &str = "your Keybase.io passphrase";
