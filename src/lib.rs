// src/lib.rs
// Public library surface for the batch binary and integration tests.

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod dedup;
pub mod generate;
pub mod ingest;
pub mod metrics;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod registry;
pub mod resolve;
pub mod rewrite;

// ---- Re-exports for stable public API ----
pub use crate::model::{Category, NewsItem};
pub use crate::pipeline::{Pipeline, RunOutcome, RunReport};
