// src/config/mod.rs
pub mod ai;
pub mod pipeline;

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// Read a config file. Supports TOML or JSON; the extension is a hint, the
/// other format is tried when the hinted one fails.
pub fn read_structured<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_structured(&content, ext.as_str())
        .with_context(|| format!("parsing config {}", path.display()))
}

fn parse_structured<T: DeserializeOwned>(s: &str, hint_ext: &str) -> Result<T> {
    if hint_ext == "json" {
        match serde_json::from_str(s) {
            Ok(v) => return Ok(v),
            Err(json_err) => {
                return toml::from_str(s).map_err(|_| anyhow!("invalid json: {json_err}"))
            }
        }
    }
    match toml::from_str(s) {
        Ok(v) => Ok(v),
        Err(toml_err) => serde_json::from_str(s).map_err(|_| anyhow!("invalid toml: {toml_err}")),
    }
}

/// Resolve a config path:
/// 1) the env var, which must point at an existing file when set
/// 2) the first existing fallback
/// 3) `None`
pub fn locate(env_key: &str, fallbacks: &[&str]) -> Result<Option<PathBuf>> {
    if let Ok(p) = std::env::var(env_key) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Ok(Some(pb));
        }
        return Err(anyhow!("{env_key} points to non-existent path {}", pb.display()));
    }
    Ok(fallbacks.iter().map(PathBuf::from).find(|p| p.exists()))
}
