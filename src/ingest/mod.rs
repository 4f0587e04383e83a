// src/ingest/mod.rs
pub mod providers;
pub mod retry;
pub mod types;

use crate::ingest::retry::{RetryPolicy, Sleeper};
use crate::ingest::types::{FeedEndpoint, FeedFetcher, RawItem};
use futures::stream::{self, StreamExt};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up in the exposition).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_fetch_attempts_total", "Feed fetch attempts.");
        describe_counter!("feed_fetch_failures_total", "Failed feed fetch attempts.");
        describe_counter!(
            "feed_fetch_exhausted_total",
            "Endpoints skipped after exhausting retries."
        );
        describe_counter!("feed_items_total", "Raw items returned by feeds.");
        describe_counter!("dedup_dropped_total", "Items dropped as already seen.");
        describe_counter!("pipeline_kept_total", "New items emitted by a run.");
        describe_counter!(
            "classify_fallback_total",
            "Service classifications that fell back to General."
        );
        describe_counter!(
            "rewrite_fallback_total",
            "Rewrites that fell back to the original headline."
        );
        describe_histogram!("feed_fetch_ms", "Feed fetch time in milliseconds.");
        describe_gauge!("pipeline_last_run_ts", "Unix ts when the pipeline last ran.");
    });
}

/// Normalize headline text: decode entities, strip tags, fold typographic
/// quotes and whitespace. Sentence punctuation is kept.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // 5) Length cap: 500 chars
    if out.chars().count() > 500 {
        out = out.chars().take(500).collect();
    }

    out
}

/// Fetch one endpoint under the retry policy. Never fails: exhaustion is
/// logged and yields `None`.
pub async fn fetch_with_retry(
    fetcher: &dyn FeedFetcher,
    endpoint: &FeedEndpoint,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
) -> Option<Vec<RawItem>> {
    ensure_metrics_described();

    let attempts = policy.attempts();
    for attempt in 1..=attempts {
        counter!("feed_fetch_attempts_total").increment(1);
        let t0 = std::time::Instant::now();
        let res = fetcher.fetch(endpoint).await;
        histogram!("feed_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        match res {
            Ok(items) => {
                counter!("feed_items_total").increment(items.len() as u64);
                tracing::debug!(
                    url = %endpoint.url,
                    attempt,
                    items = items.len(),
                    "feed fetched"
                );
                return Some(items);
            }
            Err(e) => {
                counter!("feed_fetch_failures_total").increment(1);
                tracing::warn!(
                    error = %e,
                    url = %endpoint.url,
                    fetcher = fetcher.name(),
                    attempt,
                    max_attempts = attempts,
                    "feed fetch attempt failed"
                );
                if attempt < attempts {
                    sleeper.sleep(policy.delay_after(attempt)).await;
                }
            }
        }
    }

    counter!("feed_fetch_exhausted_total").increment(1);
    tracing::error!(
        url = %endpoint.url,
        attempts,
        "feed skipped after exhausting retries"
    );
    None
}

/// Outcome of fetching one endpoint, in registry order.
#[derive(Debug, Clone)]
pub struct EndpointBatch {
    pub endpoint: FeedEndpoint,
    /// `None` when every attempt failed.
    pub items: Option<Vec<RawItem>>,
}

/// Fetch all endpoints with at most `concurrency` requests in flight.
/// Results come back in input order. `per_feed_cap` truncates each feed.
pub async fn fetch_all(
    fetcher: &dyn FeedFetcher,
    endpoints: &[FeedEndpoint],
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    concurrency: usize,
    per_feed_cap: Option<usize>,
) -> Vec<EndpointBatch> {
    stream::iter(endpoints.iter().cloned())
        .map(|endpoint| async move {
            let items = fetch_with_retry(fetcher, &endpoint, policy, sleeper)
                .await
                .map(|mut v| {
                    if let Some(cap) = per_feed_cap {
                        v.truncate(cap);
                    }
                    v
                });
            EndpointBatch { endpoint, items }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await
}
