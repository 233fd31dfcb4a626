//! JSON configuration file handling.
//!
//! Deployed config files carry a `#`-prefixed comment header block ahead
//! of the JSON payload; the header is stripped before parsing.

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Config {
    pub backends: Vec<String>,
    pub max_procs: usize,
    pub port: u16,
    pub buckets: usize,
    pub timeout_ms: u64,
    pub timeout_ms_after_first_seen: u64,
    pub max_idle_conns_per_host: usize,
    pub graphite_host: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backends: Vec::new(),
            max_procs: 1,
            port: 8080,
            buckets: 10,
            timeout_ms: 2000,
            timeout_ms_after_first_seen: 500,
            max_idle_conns_per_host: 100,
            graphite_host: String::new(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("unable to load config file {}", path.display()))?;

        let payload = strip_comment_header(&raw)
            .with_context(|| format!("config file {} is all comment header", path.display()))?;

        let config: Config = serde_json::from_str(payload)
            .with_context(|| format!("error parsing config file {}", path.display()))?;

        ensure!(!config.backends.is_empty(), "no Backends loaded");

        Ok(config)
    }

    /// Telemetry sink address: the config value, or the GRAPHITEHOST /
    /// GRAPHITEPORT environment pair when the config leaves it empty.
    pub fn graphite_host(&self) -> Option<String> {
        if !self.graphite_host.is_empty() {
            return Some(self.graphite_host.clone());
        }

        let host = env::var("GRAPHITEHOST").unwrap_or_default();
        let port = env::var("GRAPHITEPORT").unwrap_or_default();
        if host.is_empty() && port.is_empty() {
            None
        } else {
            Some(format!("{host}:{port}"))
        }
    }
}

/// Drops leading `#` comment lines. Returns None when the comment header
/// never ends.
fn strip_comment_header(raw: &str) -> Option<&str> {
    let mut payload = raw;
    while payload.starts_with('#') {
        let newline = payload.find('\n')?;
        payload = &payload[newline + 1..];
        if payload.is_empty() {
            return None;
        }
    }

    Some(payload)
}
