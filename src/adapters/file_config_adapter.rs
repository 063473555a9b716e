//! INI file configuration adapter.
//!
//! Any `[section] key` can be overridden from the environment as
//! `TRADEEVAL_<SECTION>_<KEY>` (uppercase), which is how credentials and
//! per-host paths are supplied without editing the file.

use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::collections::HashMap;
use std::path::Path;

pub const ENV_PREFIX: &str = "TRADEEVAL_";

pub struct FileConfigAdapter {
    config: Ini,
    overrides: HashMap<String, String>,
}

impl FileConfigAdapter {
    /// Load the file and pick up `TRADEEVAL_*` environment overrides.
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = Ini::new();
        config.load(path).map_err(std::io::Error::other)?;
        let overrides = std::env::vars()
            .filter(|(name, _)| name.starts_with(ENV_PREFIX))
            .collect();
        Ok(Self { config, overrides })
    }

    /// Parse INI text. No environment overrides are applied.
    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self {
            config,
            overrides: HashMap::new(),
        })
    }

    /// Replace the override table, keyed by full variable name.
    pub fn with_overrides<I, K, V>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.overrides = overrides
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    pub fn override_name(section: &str, key: &str) -> String {
        format!("{ENV_PREFIX}{section}_{key}").to_uppercase()
    }

    fn lookup(&self, section: &str, key: &str) -> Option<String> {
        self.overrides
            .get(&Self::override_name(section, key))
            .cloned()
            .or_else(|| self.config.get(section, key))
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.lookup(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.lookup(section, key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.lookup(section, key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.lookup(section, key)
            .as_deref()
            .and_then(Self::parse_bool)
            .unwrap_or(default)
    }
}
