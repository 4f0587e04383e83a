// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::{env, path::Path};

pub const ENV_AI_CONFIG_PATH: &str = "AI_CONFIG_PATH";
pub const DEFAULT_AI_CONFIG_PATH: &str = "config/ai.json";

fn default_true() -> bool {
    true
}
fn default_provider() -> String {
    "openai".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_classify_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_rewrite_model() -> String {
    "gpt-4".to_string()
}
fn default_timeout_secs() -> u64 {
    20
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// "openai" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    /// "ENV" means: read from OPENAI_API_KEY. Resolved to "" when unset.
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_classify_model")]
    pub classify_model: String,
    #[serde(default = "default_rewrite_model")]
    pub rewrite_model: String,
    /// Per-call budget; a slower answer counts as a failure.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: default_provider(),
            api_key: default_api_key(),
            classify_model: default_classify_model(),
            rewrite_model: default_rewrite_model(),
            timeout_secs: default_timeout_secs(),
            base_url: default_base_url(),
        }
    }
}

impl AiConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let cfg: AiConfig = crate::config::read_structured(path.as_ref())?;
        Ok(cfg.resolved())
    }

    /// 1) $AI_CONFIG_PATH
    /// 2) config/ai.json
    /// 3) defaults (OpenAI, key from env)
    pub fn load_default() -> anyhow::Result<Self> {
        match crate::config::locate(ENV_AI_CONFIG_PATH, &[DEFAULT_AI_CONFIG_PATH])? {
            Some(p) => Self::load_from_file(p),
            None => Ok(Self::default().resolved()),
        }
    }

    /// Normalize provider and resolve the "ENV" key indirection.
    pub fn resolved(mut self) -> Self {
        self.provider = self.provider.trim().to_lowercase();
        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = match self.provider.as_str() {
                "openai" => env::var("OPENAI_API_KEY").unwrap_or_default(),
                _ => String::new(),
            };
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout_secs();
        }
        self
    }

    pub fn has_credential(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}
