// src/ingest/providers/fixture.rs
//! In-memory fetcher for tests and offline runs. Each URL can be scripted to
//! fail a number of times before answering.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::ingest::providers::rss::parse_feed;
use crate::ingest::types::{FeedEndpoint, FeedFetcher, FetchError, RawItem};

#[derive(Debug, Clone)]
enum Body {
    Items(Vec<RawItem>),
    Xml(String),
}

#[derive(Debug, Clone)]
struct Script {
    fail_first: u32,
    body: Body,
}

#[derive(Default)]
pub struct FixtureFetcher {
    feeds: HashMap<String, Script>,
    attempts: Mutex<HashMap<String, u32>>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with ready-made items. `origin_url` is filled in when empty.
    pub fn with_items(mut self, url: &str, items: Vec<RawItem>) -> Self {
        self.feeds.insert(
            url.to_string(),
            Script {
                fail_first: 0,
                body: Body::Items(items),
            },
        );
        self
    }

    /// Answer `url` by parsing an RSS/Atom document.
    pub fn with_xml(mut self, url: &str, xml: &str) -> Self {
        self.feeds.insert(
            url.to_string(),
            Script {
                fail_first: 0,
                body: Body::Xml(xml.to_string()),
            },
        );
        self
    }

    /// Make the first `n` attempts against `url` time out.
    pub fn failing_first(mut self, url: &str, n: u32) -> Self {
        let script = self.feeds.entry(url.to_string()).or_insert(Script {
            fail_first: 0,
            body: Body::Items(vec![]),
        });
        script.fail_first = n;
        self
    }

    /// Make every attempt against `url` time out.
    pub fn always_failing(self, url: &str) -> Self {
        self.failing_first(url, u32::MAX)
    }

    pub fn attempts_for(&self, url: &str) -> u32 {
        self.attempts
            .lock()
            .map(|g| g.get(url).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

#[async_trait]
impl FeedFetcher for FixtureFetcher {
    async fn fetch(&self, endpoint: &FeedEndpoint) -> Result<Vec<RawItem>, FetchError> {
        let attempt = {
            let mut g = self
                .attempts
                .lock()
                .map_err(|_| FetchError::Transport("fixture state poisoned".into()))?;
            let n = g.entry(endpoint.url.clone()).or_insert(0);
            *n += 1;
            *n
        };

        let Some(script) = self.feeds.get(&endpoint.url) else {
            return Err(FetchError::Status(404));
        };
        if attempt <= script.fail_first {
            return Err(FetchError::Timeout(Duration::from_secs(10)));
        }

        match &script.body {
            Body::Items(items) => Ok(items
                .iter()
                .cloned()
                .map(|mut it| {
                    if it.origin_url.is_empty() {
                        it.origin_url = endpoint.url.clone();
                    }
                    it
                })
                .collect()),
            Body::Xml(xml) => parse_feed(xml, &endpoint.url),
        }
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
