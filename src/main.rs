//! update-news: one pipeline run, then exit.
//! Reads config/pipeline.toml, config/feeds.toml and config/ai.json (each
//! overridable via env), writes docs/*.json.

use anyhow::Context;
use canada_news_feed::config::ai::AiConfig;
use canada_news_feed::config::pipeline::PipelineConfig;
use canada_news_feed::metrics::Metrics;
use canada_news_feed::registry::FeedRegistry;
use canada_news_feed::Pipeline;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default; `LOG_FORMAT=json` for structured CI logs.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("canada_news_feed=info,update_news=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env locally; no-op in CI where secrets come from the environment.
    let _ = dotenvy::dotenv();
    init_tracing();

    let metrics = Metrics::init()?;

    let config = PipelineConfig::load_default().context("loading pipeline config")?;
    let registry = FeedRegistry::load_default().context("loading feed registry")?;
    let ai = AiConfig::load_default().context("loading ai config")?;
    tracing::info!(
        provider = %ai.provider,
        enabled = ai.enabled,
        key_present = ai.has_credential(),
        "ai config loaded"
    );

    let textfile = config.metrics_textfile.clone();
    let pipeline = Pipeline::from_config(config, registry, &ai)?;
    let outcome = pipeline.run_from_disk().await.context("pipeline run")?;

    if let Some(path) = textfile {
        if let Err(e) = metrics.write_textfile(&path) {
            tracing::warn!(error = %e, "metrics textfile not written");
        }
    }

    tracing::info!(
        new_items = outcome.new_items.len(),
        combined = outcome.snapshot.combined.len(),
        "docs updated"
    );
    Ok(())
}
