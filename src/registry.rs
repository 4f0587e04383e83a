//! # Feed Registry
//!
//! Static configuration: which feeds belong to which category, which logo
//! each source key uses, the ordered domain markers the resolver matches
//! against, and the keyword table for keyword classification.
//!
//! Loads from TOML or JSON; falls back to `default_seed()` with the
//! Canadian outlets the site started with.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::classify::KeywordRule;
use crate::ingest::types::FeedEndpoint;
use crate::model::Category;
use crate::resolve::DomainMarker;

pub const ENV_FEEDS_PATH: &str = "NEWS_FEEDS_PATH";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedGroup {
    pub category: Category,
    pub urls: Vec<String>,
}

fn default_source_key() -> String {
    "unknown".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedRegistry {
    #[serde(default)]
    pub groups: Vec<FeedGroup>,
    /// Source key → logo URL.
    #[serde(default)]
    pub logos: HashMap<String, String>,
    /// Checked in order; put specific markers before generic ones.
    #[serde(default)]
    pub markers: Vec<DomainMarker>,
    #[serde(default = "default_source_key")]
    pub default_source: String,
    #[serde(default)]
    pub default_logo: String,
    /// Priority-ordered keyword table; empty means the built-in table.
    #[serde(default)]
    pub keywords: Vec<KeywordRule>,
}

impl FeedRegistry {
    /// Load from an explicit path (TOML or JSON by extension).
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let mut reg: FeedRegistry = crate::config::read_structured(path)?;
        if reg.keywords.is_empty() {
            reg.keywords = crate::classify::default_keyword_table();
        }
        Ok(reg)
    }

    /// 1) $NEWS_FEEDS_PATH
    /// 2) config/feeds.toml
    /// 3) config/feeds.json
    /// 4) built-in seed
    pub fn load_default() -> anyhow::Result<Self> {
        match crate::config::locate(ENV_FEEDS_PATH, &["config/feeds.toml", "config/feeds.json"])? {
            Some(p) => Self::load_from(&p),
            None => Ok(Self::default_seed()),
        }
    }

    /// All endpoints in declared group order.
    pub fn endpoints(&self) -> Vec<FeedEndpoint> {
        self.groups
            .iter()
            .flat_map(|g| {
                g.urls.iter().map(move |u| FeedEndpoint {
                    category: g.category,
                    url: u.clone(),
                })
            })
            .collect()
    }

    pub fn logo_for(&self, source: &str) -> &str {
        self.logos
            .get(source)
            .map(String::as_str)
            .unwrap_or(self.default_logo.as_str())
    }

    pub fn default_seed() -> Self {
        let groups = vec![
            FeedGroup {
                category: Category::Politics,
                urls: vec![
                    "https://www.cbc.ca/webfeed/rss/rss-politics".into(),
                    "https://globalnews.ca/politics/feed/".into(),
                ],
            },
            FeedGroup {
                category: Category::Business,
                urls: vec![
                    "https://www.cbc.ca/webfeed/rss/rss-business".into(),
                    "https://globalnews.ca/money/feed/".into(),
                ],
            },
            FeedGroup {
                category: Category::Sports,
                urls: vec![
                    "https://www.cbc.ca/webfeed/rss/rss-sports".into(),
                    "https://globalnews.ca/sports/feed/".into(),
                ],
            },
            FeedGroup {
                category: Category::Weather,
                urls: vec!["https://globalnews.ca/tag/weather/feed/".into()],
            },
            FeedGroup {
                category: Category::General,
                urls: vec![
                    "https://www.cbc.ca/cmlink/rss-topstories".into(),
                    "https://globalnews.ca/feed/".into(),
                    "https://www.ctvnews.ca/rss/ctvnews-ca-top-stories-public-rss-1.822009".into(),
                ],
            },
        ];

        let mut logos = HashMap::new();
        for (k, v) in [
            (
                "cbc",
                "https://cdn.shopify.com/s/files/1/0649/5997/1534/files/cbc.png?v=1742728178",
            ),
            (
                "global",
                "https://cdn.shopify.com/s/files/1/0649/5997/1534/files/global_news.png?v=1742728177",
            ),
            (
                "ctv",
                "https://cdn.shopify.com/s/files/1/0649/5997/1534/files/ctv.png?v=1742728179",
            ),
        ] {
            logos.insert(k.to_string(), v.to_string());
        }

        let markers = [
            ("ctvnews.ca", "ctv"),
            ("globalnews.ca", "global"),
            ("cbc.ca", "cbc"),
        ]
        .into_iter()
        .map(|(m, s)| DomainMarker {
            marker: m.to_string(),
            source: s.to_string(),
        })
        .collect();

        Self {
            groups,
            logos,
            markers,
            default_source: default_source_key(),
            default_logo: String::new(),
            keywords: crate::classify::default_keyword_table(),
        }
    }
}
