// tests/pipeline_fallback.rs
//! The generation service being down must not change availability: every
//! headline falls back to its title, every category falls back to General,
//! and all files are still written.

mod common;

use std::sync::Arc;
use std::time::Duration;

use canada_news_feed::classify::Classifier;
use canada_news_feed::generate::{CompletionOptions, MockGenerator, ServiceError};
use canada_news_feed::model::Category;
use canada_news_feed::rewrite::Rewriter;

fn opts() -> CompletionOptions {
    CompletionOptions {
        model: "test".into(),
        temperature: 0.0,
        max_tokens: 16,
    }
}

#[tokio::test]
async fn failing_rewrite_keeps_titles_and_writes_all_files() {
    let tmp = tempfile::tempdir().unwrap();
    let generator = Arc::new(MockGenerator::failing(ServiceError::Status(503)));
    let (p, _f, _s) = common::pipeline(
        tmp.path(),
        common::overlapping_fetcher(),
        Classifier::Assigned,
        Rewriter::new(generator.clone(), opts(), Duration::from_secs(1)),
    );

    let out = p.run_from_disk().await.expect("run completes");
    assert_eq!(out.report.rewrite_fallbacks, 3);
    assert_eq!(generator.calls(), 3);

    let mut heads: Vec<String> = out.new_items.iter().map(|i| i.headline.clone()).collect();
    heads.sort();
    assert_eq!(
        heads,
        vec![
            "PM announces budget".to_string(),
            "Parliament returns after break".to_string(),
            "Snowfall warning for Toronto".to_string(),
        ]
    );

    let layout = p.layout();
    for c in Category::ALL {
        let _ = common::read_items(&layout.category_path(c));
    }
    assert_eq!(common::read_items(&layout.combined_path()).len(), 3);
    assert!(layout.cache_path().exists());
}

#[tokio::test]
async fn failing_service_classifier_puts_everything_in_general() {
    let tmp = tempfile::tempdir().unwrap();
    let generator = Arc::new(MockGenerator::failing(ServiceError::Timeout(
        Duration::from_secs(20),
    )));
    let classifier = Classifier::Service {
        generator: generator.clone(),
        options: opts(),
        timeout: Duration::from_secs(1),
    };
    let (p, _f, _s) = common::pipeline(
        tmp.path(),
        common::overlapping_fetcher(),
        classifier,
        Rewriter::disabled(),
    );

    let out = p.run_from_disk().await.unwrap();
    assert_eq!(out.report.classify_fallbacks, 3);
    assert!(out.new_items.iter().all(|i| i.category == Category::General));
    assert_eq!(
        common::read_items(&p.layout().category_path(Category::General)).len(),
        3
    );
    assert!(common::read_items(&p.layout().category_path(Category::Politics)).is_empty());
}

#[tokio::test]
async fn successful_rewrite_replaces_headline_but_not_url() {
    let tmp = tempfile::tempdir().unwrap();
    let generator = Arc::new(MockGenerator::new(|prompt| {
        let original = prompt.rsplit(": ").next().unwrap_or_default();
        Ok(format!("\"{} - what it means for you\"\n", original))
    }));
    let (p, _f, _s) = common::pipeline(
        tmp.path(),
        common::overlapping_fetcher(),
        Classifier::Assigned,
        Rewriter::new(generator, opts(), Duration::from_secs(1)),
    );

    let out = p.run_from_disk().await.unwrap();
    let budget = out
        .new_items
        .iter()
        .find(|i| i.url == "https://www.cbc.ca/news/politics/budget")
        .expect("budget item");
    assert_eq!(budget.headline, "PM announces budget - what it means for you");
    assert_eq!(out.report.rewrite_fallbacks, 0);
}

#[tokio::test]
async fn mixed_service_answers_are_coerced() {
    let tmp = tempfile::tempdir().unwrap();
    let generator = Arc::new(MockGenerator::new(|prompt| {
        if prompt.contains("budget") {
            Ok("Business".to_string())
        } else if prompt.contains("Snowfall") {
            Ok("Climate".to_string())
        } else {
            Ok("politics".to_string())
        }
    }));
    let classifier = Classifier::Service {
        generator,
        options: opts(),
        timeout: Duration::from_secs(1),
    };
    let (p, _f, _s) = common::pipeline(
        tmp.path(),
        common::overlapping_fetcher(),
        classifier,
        Rewriter::disabled(),
    );

    let out = p.run_from_disk().await.unwrap();
    let cat_of = |title: &str| {
        out.new_items
            .iter()
            .find(|i| i.headline == title)
            .map(|i| i.category)
    };
    assert_eq!(cat_of("PM announces budget"), Some(Category::Business));
    assert_eq!(cat_of("Snowfall warning for Toronto"), Some(Category::General));
    assert_eq!(
        cat_of("Parliament returns after break"),
        Some(Category::Politics)
    );
}
