// src/model.rs
//! Output records shared by the classifier, aggregator and writer.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Closed set of topical labels. Declaration order is the shard/write order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Politics,
    Business,
    Sports,
    Weather,
    General,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Politics,
        Category::Business,
        Category::Sports,
        Category::Weather,
        Category::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Politics => "Politics",
            Category::Business => "Business",
            Category::Sports => "Sports",
            Category::Weather => "Weather",
            Category::General => "General",
        }
    }

    /// File stem used for the per-category shard, e.g. `politics`.
    pub fn slug(&self) -> String {
        self.as_str().to_ascii_lowercase()
    }

    /// Lenient lookup used for model answers: case-insensitive, trims quotes
    /// and trailing punctuation. Anything else is `None`.
    pub fn parse_loose(s: &str) -> Option<Category> {
        let t = s
            .trim()
            .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '*'))
            .trim_end_matches(['.', '!', ',', ';', ':'])
            .trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(t))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical output record for one processed headline.
///
/// Field names are consumed by the static site as-is. `published_at` is
/// written as `""` when the feed carried no usable date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub source: String,
    pub logo: String,
    pub headline: String,
    pub url: String,
    pub category: Category,
    #[serde(
        default,
        serialize_with = "ser_opt_ts",
        deserialize_with = "de_opt_ts"
    )]
    pub published_at: Option<String>,
}

fn ser_opt_ts<S: Serializer>(v: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(v.as_deref().unwrap_or(""))
}

fn de_opt_ts<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let raw: Option<String> = Option::deserialize(d)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}
