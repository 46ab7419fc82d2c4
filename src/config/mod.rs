// src/config/mod.rs
//! Configuration system for secret-keyring
//!
//! Central, lazy-loaded global config with TOML + env overrides.

pub use app::{load, Config, Features, KeyringPaths, Usage};

mod app;
mod defaults;
