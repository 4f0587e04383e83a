// tests/common/mod.rs
#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use canada_news_feed::classify::Classifier;
use canada_news_feed::config::pipeline::PipelineConfig;
use canada_news_feed::ingest::providers::fixture::FixtureFetcher;
use canada_news_feed::ingest::retry::{RecordingSleeper, RetryPolicy};
use canada_news_feed::ingest::types::RawItem;
use canada_news_feed::model::{Category, NewsItem};
use canada_news_feed::registry::{FeedGroup, FeedRegistry};
use canada_news_feed::rewrite::Rewriter;
use canada_news_feed::Pipeline;

pub const CBC_POLITICS: &str = "https://www.cbc.ca/webfeed/rss/rss-politics";
pub const GLOBAL_POLITICS: &str = "https://globalnews.ca/politics/feed/";
pub const CTV_TOP: &str = "https://www.ctvnews.ca/rss/ctvnews-ca-top-stories-public-rss-1.822009";

pub fn raw(title: &str, link: &str, ts: Option<&str>) -> RawItem {
    RawItem {
        title: title.to_string(),
        link: link.to_string(),
        published_at: ts.map(str::to_string),
        origin_url: String::new(),
    }
}

/// Seed logos and markers, three endpoints over two categories.
pub fn registry() -> FeedRegistry {
    let mut reg = FeedRegistry::default_seed();
    reg.groups = vec![
        FeedGroup {
            category: Category::Politics,
            urls: vec![CBC_POLITICS.into(), GLOBAL_POLITICS.into()],
        },
        FeedGroup {
            category: Category::General,
            urls: vec![CTV_TOP.into()],
        },
    ];
    reg
}

pub fn config(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        output_dir: dir.to_path_buf(),
        retry: RetryPolicy {
            max_attempts: 3,
            delay_ms: 3_000,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Three feeds; the budget story appears on two of them with the same link.
pub fn overlapping_fetcher() -> FixtureFetcher {
    FixtureFetcher::new()
        .with_items(
            CBC_POLITICS,
            vec![
                raw(
                    "PM announces budget",
                    "https://www.cbc.ca/news/politics/budget",
                    Some("2024-01-02T15:00:00Z"),
                ),
                raw(
                    "Parliament returns after break",
                    "https://www.cbc.ca/news/politics/parliament",
                    Some("2024-01-01T09:00:00Z"),
                ),
            ],
        )
        .with_items(
            GLOBAL_POLITICS,
            vec![raw(
                "PM announces budget",
                "https://www.cbc.ca/news/politics/budget",
                Some("2024-01-02T15:00:00Z"),
            )],
        )
        .with_items(
            CTV_TOP,
            vec![raw(
                "Snowfall warning for Toronto",
                "https://www.ctvnews.ca/toronto/snow",
                None,
            )],
        )
}

pub fn pipeline(
    dir: &Path,
    fetcher: FixtureFetcher,
    classifier: Classifier,
    rewriter: Rewriter,
) -> (Pipeline, Arc<FixtureFetcher>, Arc<RecordingSleeper>) {
    let fetcher = Arc::new(fetcher);
    let sleeper = Arc::new(RecordingSleeper::new());
    let p = Pipeline::new(config(dir), registry(), fetcher.clone(), classifier, rewriter)
        .with_sleeper(sleeper.clone());
    (p, fetcher, sleeper)
}

pub fn read_items(path: &Path) -> Vec<NewsItem> {
    let s = std::fs::read_to_string(path).expect("output file exists");
    serde_json::from_str(&s).expect("valid NewsItem array")
}
