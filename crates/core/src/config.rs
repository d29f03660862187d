//! Config file discovery and loading
//!
//! Flags and env vars (handled by clap in each binary) win over the file, and
//! the file wins over built-in defaults.

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use serde::de::DeserializeOwned;

use crate::APP_NAME;

/// Where a service's settings file comes from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// `--config` or the service's config env var; must load
    Explicit(PathBuf),
    /// First existing file among the working directory, XDG config home and /etc
    Discovered(PathBuf),
    /// No file, flags and defaults only
    Defaults,
}

impl ConfigSource {
    /// An explicit path is taken as-is, even when nothing exists there, so a
    /// mistyped `--config` fails at load instead of falling back to defaults.
    pub fn resolve(explicit: Option<&str>, env_var: &str, filename: &str) -> Self {
        let explicit = explicit
            .map(String::from)
            .or_else(|| env::var(env_var).ok())
            .filter(|path| !path.trim().is_empty());
        if let Some(path) = explicit {
            return ConfigSource::Explicit(PathBuf::from(path));
        }

        search_paths(filename)
            .into_iter()
            .find(|path| path.is_file())
            .map(ConfigSource::Discovered)
            .unwrap_or(ConfigSource::Defaults)
    }

    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            ConfigSource::Explicit(p) | ConfigSource::Discovered(p) => Some(p),
            ConfigSource::Defaults => None,
        }
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.path() {
            Some(path) => write!(f, "{}", path.display()),
            None => write!(f, "(defaults)"),
        }
    }
}

fn search_paths(filename: &str) -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(filename)];

    let config_home = env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")));
    if let Some(dir) = config_home {
        paths.push(dir.join(APP_NAME).join(filename));
    }

    paths.push(PathBuf::from("/etc").join(APP_NAME).join(filename));
    paths
}

/// Reads the TOML file behind `source`, or `T::default()` for
/// [`ConfigSource::Defaults`]. A missing or malformed file is an error.
pub fn load_config<T: DeserializeOwned + Default>(source: &ConfigSource) -> anyhow::Result<T> {
    let Some(path) = source.path() else {
        return Ok(T::default());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("failed to parse config {}", path.display()))
}
