// src/config/pipeline.rs
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::aggregate::CombinedOrder;
use crate::classify::PolicyKind;
use crate::ingest::retry::RetryPolicy;

pub const ENV_PIPELINE_CONFIG: &str = "NEWS_PIPELINE_CONFIG";

fn default_output_dir() -> PathBuf {
    PathBuf::from("docs")
}
fn default_combined_file() -> String {
    "canada-news.json".to_string()
}
fn default_cache_file() -> String {
    "news_cache.json".to_string()
}
fn default_max_items_per_feed() -> Option<usize> {
    Some(15)
}
fn default_concurrency() -> usize {
    4
}
fn default_user_agent() -> String {
    "Mozilla/5.0".to_string()
}
fn default_fetch_timeout_secs() -> u64 {
    15
}
fn default_true() -> bool {
    true
}
fn default_retain_per_category() -> usize {
    50
}

/// Run configuration. Every field has a default, so an empty file is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_combined_file")]
    pub combined_file: String,
    #[serde(default = "default_cache_file")]
    pub cache_file: String,
    #[serde(default)]
    pub classify_policy: PolicyKind,
    #[serde(default = "default_max_items_per_feed")]
    pub max_items_per_feed: Option<usize>,
    /// Random sample of at most N new items per category; `None` keeps all.
    #[serde(default)]
    pub sample_per_category: Option<usize>,
    #[serde(default)]
    pub combined_order: CombinedOrder,
    #[serde(default)]
    pub shuffle_seed: Option<u64>,
    #[serde(default = "default_concurrency")]
    pub fetch_concurrency: usize,
    #[serde(default = "default_concurrency")]
    pub item_concurrency: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default = "default_true")]
    pub rewrite_enabled: bool,
    /// Keep only the newest N fingerprints; `None` never truncates.
    #[serde(default)]
    pub cache_max_entries: Option<usize>,
    /// Items kept per category file after merging with the previous run.
    #[serde(default = "default_retain_per_category")]
    pub retain_per_category: usize,
    #[serde(default)]
    pub metrics_textfile: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            combined_file: default_combined_file(),
            cache_file: default_cache_file(),
            classify_policy: PolicyKind::default(),
            max_items_per_feed: default_max_items_per_feed(),
            sample_per_category: None,
            combined_order: CombinedOrder::default(),
            shuffle_seed: None,
            fetch_concurrency: default_concurrency(),
            item_concurrency: default_concurrency(),
            user_agent: default_user_agent(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            retry: RetryPolicy::default(),
            rewrite_enabled: true,
            cache_max_entries: None,
            retain_per_category: default_retain_per_category(),
            metrics_textfile: None,
        }
    }
}

impl PipelineConfig {
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        crate::config::read_structured(path)
    }

    /// 1) $NEWS_PIPELINE_CONFIG
    /// 2) config/pipeline.toml
    /// 3) config/pipeline.json
    /// 4) defaults
    pub fn load_default() -> anyhow::Result<Self> {
        match crate::config::locate(
            ENV_PIPELINE_CONFIG,
            &["config/pipeline.toml", "config/pipeline.json"],
        )? {
            Some(p) => Self::load_from(&p),
            None => Ok(Self::default()),
        }
    }
}
