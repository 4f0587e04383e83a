// src/classify.rs
//! Category assignment. Three interchangeable policies; none of them can
//! fail the run.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::generate::{complete_with_timeout, CompletionOptions, DynTextGenerator};
use crate::model::Category;

/// Config-level policy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    #[default]
    Assigned,
    Keyword,
    Service,
}

/// One row of the keyword table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub category: Category,
    pub keywords: Vec<String>,
}

/// Priority-ordered table; the first row with a matching keyword wins.
pub fn default_keyword_table() -> Vec<KeywordRule> {
    let rows: [(Category, &[&str]); 4] = [
        (
            Category::Politics,
            &["election", "minister", "government", "parliament", "policy", "bill"],
        ),
        (
            Category::Business,
            &["business", "economy", "inflation", "trade", "market", "stock", "investment"],
        ),
        (
            Category::Sports,
            &["sport", "game", "team", "match", "score", "tournament", "league"],
        ),
        (
            Category::Weather,
            &["weather", "storm", "climate", "temperature", "environment", "rain", "snow"],
        ),
    ];
    rows.into_iter()
        .map(|(category, kws)| KeywordRule {
            category,
            keywords: kws.iter().map(|k| k.to_string()).collect(),
        })
        .collect()
}

/// Case-insensitive substring test over the table; `General` on no match.
pub fn classify_by_keywords(title: &str, table: &[KeywordRule]) -> Category {
    let t = title.to_lowercase();
    table
        .iter()
        .find(|row| {
            row.keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .any(|k| !k.is_empty() && t.contains(&k))
        })
        .map(|row| row.category)
        .unwrap_or(Category::General)
}

pub fn classification_prompt(title: &str) -> String {
    format!(
        "Classify this Canadian news headline into one of the following categories:\n\
         Politics, Business, Sports, Weather, or General.\n\n\
         Respond with only the category name.\n\n\
         Headline: \"{title}\"\n"
    )
}

/// Map a model answer onto the closed set; anything else is `General`.
pub fn coerce_category(answer: &str) -> Category {
    Category::parse_loose(answer).unwrap_or(Category::General)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    /// The service call failed and `General` was substituted.
    pub fell_back: bool,
}

pub enum Classifier {
    Assigned,
    Keyword(Vec<KeywordRule>),
    Service {
        generator: DynTextGenerator,
        options: CompletionOptions,
        timeout: Duration,
    },
}

impl Classifier {
    pub fn kind(&self) -> PolicyKind {
        match self {
            Classifier::Assigned => PolicyKind::Assigned,
            Classifier::Keyword(_) => PolicyKind::Keyword,
            Classifier::Service { .. } => PolicyKind::Service,
        }
    }

    /// `assigned` is the category of the feed group the item came from.
    pub async fn classify(&self, title: &str, assigned: Category) -> Classification {
        match self {
            Classifier::Assigned => Classification {
                category: assigned,
                fell_back: false,
            },
            Classifier::Keyword(table) => Classification {
                category: classify_by_keywords(title, table),
                fell_back: false,
            },
            Classifier::Service {
                generator,
                options,
                timeout,
            } => {
                let prompt = classification_prompt(title);
                match complete_with_timeout(generator.as_ref(), &prompt, options, *timeout).await
                {
                    Ok(answer) => {
                        let category = coerce_category(&answer);
                        tracing::debug!(title, answer = answer.trim(), %category, "classified");
                        Classification {
                            category,
                            fell_back: false,
                        }
                    }
                    Err(e) => {
                        metrics::counter!("classify_fallback_total").increment(1);
                        tracing::warn!(
                            error = %e,
                            provider = generator.provider_name(),
                            title,
                            "classification failed; using General"
                        );
                        Classification {
                            category: Category::General,
                            fell_back: true,
                        }
                    }
                }
            }
        }
    }
}
