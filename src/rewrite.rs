// src/rewrite.rs
//! Headline rewriting with mandatory pass-through on failure.

use std::time::Duration;

use crate::generate::{
    complete_with_timeout, sanitize_generated, CompletionOptions, DynTextGenerator, ServiceError,
};

const MAX_HEADLINE_CHARS: usize = 200;

pub fn rewrite_prompt(original: &str) -> String {
    format!(
        "Rewrite this Canadian news headline to make it more SEO-friendly and unique: {original}"
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub text: String,
    /// The original was kept because the call failed.
    pub fell_back: bool,
}

pub struct Rewriter {
    generator: Option<DynTextGenerator>,
    options: CompletionOptions,
    timeout: Duration,
}

impl Rewriter {
    pub fn new(generator: DynTextGenerator, options: CompletionOptions, timeout: Duration) -> Self {
        Self {
            generator: Some(generator),
            options,
            timeout,
        }
    }

    /// Pass-through rewriter; never calls out.
    pub fn disabled() -> Self {
        Self {
            generator: None,
            options: CompletionOptions {
                model: String::new(),
                temperature: 0.0,
                max_tokens: 0,
            },
            timeout: Duration::ZERO,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.generator.is_some()
    }

    /// One attempt; any failure returns `original` unchanged.
    pub async fn rewrite(&self, original: &str) -> Rewrite {
        let Some(generator) = self.generator.as_ref() else {
            return Rewrite {
                text: original.to_string(),
                fell_back: false,
            };
        };

        let prompt = rewrite_prompt(original);
        let res = complete_with_timeout(generator.as_ref(), &prompt, &self.options, self.timeout)
            .await
            .and_then(|raw| {
                let cleaned = sanitize_generated(&raw, MAX_HEADLINE_CHARS);
                if cleaned.is_empty() {
                    Err(ServiceError::Empty)
                } else {
                    Ok(cleaned)
                }
            });

        match res {
            Ok(text) => Rewrite {
                text,
                fell_back: false,
            },
            Err(e) => {
                metrics::counter!("rewrite_fallback_total").increment(1);
                tracing::warn!(
                    error = %e,
                    provider = generator.provider_name(),
                    original,
                    "rewrite failed; keeping original headline"
                );
                Rewrite {
                    text: original.to_string(),
                    fell_back: true,
                }
            }
        }
    }
}
