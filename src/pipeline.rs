//! # Pipeline
//! One run-to-completion batch: fetch → resolve → dedup → classify →
//! rewrite → aggregate → persist.
//!
//! The seen-set comes in by value and goes out with the outcome. It is only
//! mutated in the accumulation loop after all fetches have returned, so two
//! endpoints carrying the same story cannot both get it through.

use futures::stream::{self, StreamExt};
use metrics::{counter, gauge};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::aggregate::{
    build_combined, group_by_category, make_rng, merge_with_previous, sample_in_place, Snapshot,
};
use crate::classify::{Classifier, PolicyKind};
use crate::config::ai::AiConfig;
use crate::config::pipeline::PipelineConfig;
use crate::dedup::SeenSet;
use crate::generate::{build_generator_from_config, CompletionOptions, DynTextGenerator};
use crate::ingest::providers::rss::HttpRssFetcher;
use crate::ingest::retry::{Sleeper, TokioSleeper};
use crate::ingest::types::{FeedFetcher, RawItem};
use crate::ingest::{ensure_metrics_described, fetch_all};
use crate::model::{Category, NewsItem};
use crate::output::{OutputLayout, PersistenceError};
use crate::registry::FeedRegistry;
use crate::resolve::SourceResolver;
use crate::rewrite::Rewriter;

/// Counters for one run; logged at the end and returned to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub endpoints: usize,
    pub failed_endpoints: Vec<String>,
    pub fetched: usize,
    pub duplicates: usize,
    pub sampled_out: usize,
    pub kept: usize,
    pub classify_fallbacks: usize,
    pub rewrite_fallbacks: usize,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Items first seen in this run (the incremental set).
    pub new_items: Vec<NewsItem>,
    /// What was written to disk.
    pub snapshot: Snapshot,
    /// Seen-set after this run, as persisted.
    pub seen: SeenSet,
    pub report: RunReport,
}

struct Candidate {
    raw: RawItem,
    feed_category: Category,
}

struct Classified {
    raw: RawItem,
    category: Category,
}

pub struct Pipeline {
    config: PipelineConfig,
    registry: FeedRegistry,
    resolver: SourceResolver,
    fetcher: Arc<dyn FeedFetcher>,
    sleeper: Arc<dyn Sleeper>,
    classifier: Classifier,
    rewriter: Rewriter,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        registry: FeedRegistry,
        fetcher: Arc<dyn FeedFetcher>,
        classifier: Classifier,
        rewriter: Rewriter,
    ) -> Self {
        let resolver = SourceResolver::from_registry(&registry);
        Self {
            config,
            registry,
            resolver,
            fetcher,
            sleeper: Arc::new(TokioSleeper),
            classifier,
            rewriter,
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Production wiring: HTTP fetcher plus the configured generator.
    pub fn from_config(
        config: PipelineConfig,
        registry: FeedRegistry,
        ai: &AiConfig,
    ) -> anyhow::Result<Self> {
        let fetcher = HttpRssFetcher::new(
            &config.user_agent,
            Duration::from_secs(config.fetch_timeout_secs),
        )
        .map_err(|e| anyhow::anyhow!("building feed client: {e}"))?;

        let generator = build_generator_from_config(ai);
        let timeout = Duration::from_secs(ai.timeout_secs);
        let classifier = build_classifier(
            config.classify_policy,
            &registry,
            generator.clone(),
            CompletionOptions {
                model: ai.classify_model.clone(),
                temperature: 0.0,
                max_tokens: 5,
            },
            timeout,
        );
        let rewriter = if config.rewrite_enabled {
            Rewriter::new(
                generator.clone(),
                CompletionOptions {
                    model: ai.rewrite_model.clone(),
                    temperature: 0.7,
                    max_tokens: 60,
                },
                timeout,
            )
        } else {
            Rewriter::disabled()
        };

        tracing::info!(
            provider = generator.provider_name(),
            classify = ?classifier.kind(),
            rewrite = rewriter.is_enabled(),
            endpoints = registry.endpoints().len(),
            "pipeline configured"
        );

        Ok(Self::new(
            config,
            registry,
            Arc::new(fetcher),
            classifier,
            rewriter,
        ))
    }

    pub fn layout(&self) -> OutputLayout {
        OutputLayout::from_config(&self.config)
    }

    /// Fetch, dedup, classify and rewrite. No file I/O.
    pub async fn collect(&self, mut seen: SeenSet) -> (Vec<NewsItem>, SeenSet, RunReport) {
        ensure_metrics_described();
        let mut report = RunReport::default();

        // 1) Fetch, bounded fan-out, results in registry order.
        let endpoints = self.registry.endpoints();
        report.endpoints = endpoints.len();
        let batches = fetch_all(
            self.fetcher.as_ref(),
            &endpoints,
            &self.config.retry,
            self.sleeper.as_ref(),
            self.config.fetch_concurrency,
            self.config.max_items_per_feed,
        )
        .await;

        // 2) Single accumulation point for the seen-set.
        let mut candidates = Vec::new();
        for batch in batches {
            let Some(items) = batch.items else {
                report.failed_endpoints.push(batch.endpoint.url);
                continue;
            };
            for raw in items {
                report.fetched += 1;
                if seen.accept(&raw) {
                    candidates.push(Candidate {
                        raw,
                        feed_category: batch.endpoint.category,
                    });
                } else {
                    report.duplicates += 1;
                }
            }
        }
        counter!("dedup_dropped_total").increment(report.duplicates as u64);
        if let Some(max) = self.config.cache_max_entries {
            seen.truncate_oldest(max);
        }

        // 3) Classify (pure per item; may call out).
        let classified: Vec<(Classified, bool)> = stream::iter(candidates)
            .map(|c| async move {
                let cls = self.classifier.classify(&c.raw.title, c.feed_category).await;
                (
                    Classified {
                        raw: c.raw,
                        category: cls.category,
                    },
                    cls.fell_back,
                )
            })
            .buffered(self.config.item_concurrency.max(1))
            .collect()
            .await;
        report.classify_fallbacks = classified.iter().filter(|(_, fb)| *fb).count();

        // 4) Optional per-category cap before spending rewrite calls.
        let mut by_cat: BTreeMap<Category, Vec<Classified>> = BTreeMap::new();
        for (c, _) in classified {
            by_cat.entry(c.category).or_default().push(c);
        }
        if let Some(n) = self.config.sample_per_category {
            let mut rng = make_rng(self.config.shuffle_seed);
            for v in by_cat.values_mut() {
                let before = v.len();
                sample_in_place(v, n, &mut rng);
                report.sampled_out += before - v.len();
            }
        }
        let selected: Vec<Classified> = by_cat.into_values().flatten().collect();

        // 5) Rewrite; failures degrade to the original title.
        let rewritten: Vec<(NewsItem, bool)> = stream::iter(selected)
            .map(|c| async move {
                let rw = self.rewriter.rewrite(&c.raw.title).await;
                (self.to_news_item(c, rw.text), rw.fell_back)
            })
            .buffered(self.config.item_concurrency.max(1))
            .collect()
            .await;
        report.rewrite_fallbacks = rewritten.iter().filter(|(_, fb)| *fb).count();

        let new_items: Vec<NewsItem> = rewritten.into_iter().map(|(it, _)| it).collect();
        report.kept = new_items.len();
        counter!("pipeline_kept_total").increment(report.kept as u64);

        (new_items, seen, report)
    }

    /// Merge fresh items with what is already on disk and order everything.
    pub fn assemble(&self, new_items: &[NewsItem], layout: &OutputLayout) -> Snapshot {
        let mut fresh = group_by_category(new_items.to_vec());
        let mut buckets = BTreeMap::new();
        for c in Category::ALL {
            let previous = layout.load_previous(c);
            let items = fresh.remove(&c).unwrap_or_default();
            buckets.insert(
                c,
                merge_with_previous(items, previous, self.config.retain_per_category),
            );
        }
        let mut rng = make_rng(self.config.shuffle_seed);
        let combined = build_combined(&buckets, self.config.combined_order, &mut rng);
        Snapshot { buckets, combined }
    }

    /// Full run against `layout`. Only persistence errors escape.
    pub async fn run(
        &self,
        seen: SeenSet,
        layout: &OutputLayout,
    ) -> Result<RunOutcome, PersistenceError> {
        let (new_items, seen, report) = self.collect(seen).await;
        let snapshot = self.assemble(&new_items, layout);
        layout.persist(&snapshot, &seen)?;

        gauge!("pipeline_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);
        tracing::info!(
            target: "pipeline",
            endpoints = report.endpoints,
            failed = report.failed_endpoints.len(),
            fetched = report.fetched,
            duplicates = report.duplicates,
            sampled_out = report.sampled_out,
            kept = report.kept,
            classify_fallbacks = report.classify_fallbacks,
            rewrite_fallbacks = report.rewrite_fallbacks,
            "run complete"
        );

        Ok(RunOutcome {
            new_items,
            snapshot,
            seen,
            report,
        })
    }

    /// Load the seen-set from the configured layout, then `run`.
    pub async fn run_from_disk(&self) -> Result<RunOutcome, PersistenceError> {
        let layout = self.layout();
        let seen = layout.load_seen()?;
        self.run(seen, &layout).await
    }

    fn to_news_item(&self, c: Classified, headline: String) -> NewsItem {
        // Aggregator feeds carry other outlets' links; try the link too.
        let mut source = self.resolver.resolve(&c.raw.origin_url);
        if source == self.resolver.default_key() {
            source = self.resolver.resolve(&c.raw.link);
        }
        NewsItem {
            source: source.to_string(),
            logo: self.registry.logo_for(source).to_string(),
            headline,
            url: c.raw.link,
            category: c.category,
            published_at: c.raw.published_at,
        }
    }
}

pub fn build_classifier(
    kind: PolicyKind,
    registry: &FeedRegistry,
    generator: DynTextGenerator,
    options: CompletionOptions,
    timeout: Duration,
) -> Classifier {
    match kind {
        PolicyKind::Assigned => Classifier::Assigned,
        PolicyKind::Keyword => Classifier::Keyword(registry.keywords.clone()),
        PolicyKind::Service => Classifier::Service {
            generator,
            options,
            timeout,
        },
    }
}
