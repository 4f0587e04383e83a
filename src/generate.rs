//! Text generation capability: provider abstraction used by both the
//! service classifier and the rewriter.
//!
//! Callers never see a panic or a hang from here: every failure is a
//! `ServiceError`, and `complete_with_timeout` bounds each call.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ai::AiConfig;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("generation disabled")]
    Disabled,
    #[error("missing credential")]
    MissingCredential,
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("http status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("empty response")]
    Empty,
}

pub type GenFuture<'a> = Pin<Box<dyn Future<Output = Result<String, ServiceError>> + Send + 'a>>;

pub trait TextGenerator: Send + Sync {
    /// One remote completion. No retries.
    fn complete<'a>(&'a self, prompt: &'a str, options: &'a CompletionOptions) -> GenFuture<'a>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynTextGenerator = Arc<dyn TextGenerator>;

/// Run one completion under `timeout`; elapsed time maps to `ServiceError::Timeout`.
pub async fn complete_with_timeout(
    generator: &dyn TextGenerator,
    prompt: &str,
    options: &CompletionOptions,
    timeout: Duration,
) -> Result<String, ServiceError> {
    match tokio::time::timeout(timeout, generator.complete(prompt, options)).await {
        Ok(res) => res,
        Err(_) => Err(ServiceError::Timeout(timeout)),
    }
}

/// Factory: build a generator according to config and environment.
///
/// * If `AI_TEST_MODE=mock`, returns a deterministic mock.
/// * Else if disabled or the credential is absent, returns a disabled generator.
/// * Else builds the OpenAI provider.
pub fn build_generator_from_config(config: &AiConfig) -> DynTextGenerator {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockGenerator::fixed("Neutral headline (mock)"));
    }

    if !config.enabled {
        return Arc::new(DisabledGenerator);
    }
    if !config.has_credential() {
        tracing::warn!(
            provider = %config.provider,
            "no credential for text generation; headlines pass through unchanged"
        );
        return Arc::new(DisabledGenerator);
    }

    match config.provider.as_str() {
        "openai" => match OpenAiGenerator::new(config) {
            Ok(g) => Arc::new(g),
            Err(e) => {
                tracing::warn!(error = %e, "openai client build failed; generation disabled");
                Arc::new(DisabledGenerator)
            }
        },
        other => {
            tracing::warn!(provider = other, "unsupported provider; generation disabled");
            Arc::new(DisabledGenerator)
        }
    }
}

// ------------------------------------------------------------
// Concrete providers
// ------------------------------------------------------------

/// OpenAI Chat Completions.
pub struct OpenAiGenerator {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    timeout: Duration,
}

impl OpenAiGenerator {
    pub fn new(config: &AiConfig) -> Result<Self, ServiceError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let http = reqwest::Client::builder()
            .user_agent("canada-news-feed/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            endpoint: format!(
                "{}/chat/completions",
                config.base_url.trim_end_matches('/')
            ),
            timeout,
        })
    }

    async fn complete_impl(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, ServiceError> {
        if self.api_key.is_empty() {
            return Err(ServiceError::MissingCredential);
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: Option<String>,
        }

        let req = Req {
            model: &options.model,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| self.map_err(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ServiceError::Status(status.as_u16()));
        }
        let body: Resp = resp
            .json()
            .await
            .map_err(|e| ServiceError::Malformed(e.to_string()))?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(ServiceError::Empty);
        }
        Ok(content)
    }

    fn map_err(&self, e: reqwest::Error) -> ServiceError {
        if e.is_timeout() {
            ServiceError::Timeout(self.timeout)
        } else {
            ServiceError::Transport(e.to_string())
        }
    }
}

impl TextGenerator for OpenAiGenerator {
    fn complete<'a>(&'a self, prompt: &'a str, options: &'a CompletionOptions) -> GenFuture<'a> {
        Box::pin(self.complete_impl(prompt, options))
    }
    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Always fails with `ServiceError::Disabled`; used when generation is off.
pub struct DisabledGenerator;

impl TextGenerator for DisabledGenerator {
    fn complete<'a>(&'a self, _prompt: &'a str, _options: &'a CompletionOptions) -> GenFuture<'a> {
        Box::pin(async { Err(ServiceError::Disabled) })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

type Responder = dyn Fn(&str) -> Result<String, ServiceError> + Send + Sync;

/// Scriptable generator for tests and local runs. Counts calls.
pub struct MockGenerator {
    respond: Box<Responder>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockGenerator {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&str) -> Result<String, ServiceError> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn fixed(reply: &str) -> Self {
        let reply = reply.to_string();
        Self::new(move |_| Ok(reply.clone()))
    }

    pub fn failing(err: ServiceError) -> Self {
        Self::new(move |_| Err(err.clone()))
    }

    /// Sleep before answering (to exercise timeouts).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextGenerator for MockGenerator {
    fn complete<'a>(&'a self, prompt: &'a str, _options: &'a CompletionOptions) -> GenFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            if let Some(d) = self.delay {
                tokio::time::sleep(d).await;
            }
            (self.respond)(prompt)
        })
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Sanitization
// ------------------------------------------------------------

/// Single line, collapsed whitespace, surrounding quotes removed, capped at
/// `max_chars`. Non-ASCII letters are kept (French headlines).
pub fn sanitize_generated(input: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(input.len().min(max_chars * 4));
    let mut prev_space = false;
    let mut n = 0usize;
    for ch in input.chars() {
        let c = if ch.is_whitespace() || ch.is_control() {
            ' '
        } else {
            ch
        };
        if c == ' ' {
            if !prev_space && !out.is_empty() {
                out.push(' ');
                n += 1;
            }
            prev_space = true;
        } else {
            out.push(c);
            n += 1;
            prev_space = false;
        }
        if n >= max_chars {
            break;
        }
    }
    let trimmed = out.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| {
            trimmed
                .strip_prefix('\u{201C}')
                .and_then(|s| s.strip_suffix('\u{201D}'))
        })
        .unwrap_or(trimmed);
    unquoted.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> CompletionOptions {
        CompletionOptions {
            model: "m".into(),
            temperature: 0.0,
            max_tokens: 8,
        }
    }

    #[test]
    fn sanitize_strips_quotes_and_newlines() {
        assert_eq!(
            sanitize_generated("  \"Ottawa unveils\n  new budget\"  ", 160),
            "Ottawa unveils new budget"
        );
    }

    #[test]
    fn sanitize_keeps_accents_and_caps_length() {
        assert_eq!(sanitize_generated("Québec", 160), "Québec");
        assert_eq!(sanitize_generated(&"x".repeat(500), 10).chars().count(), 10);
    }

    #[tokio::test]
    async fn slow_generator_times_out() {
        let g = MockGenerator::fixed("late").with_delay(Duration::from_millis(200));
        let res = complete_with_timeout(&g, "p", &opts(), Duration::from_millis(20)).await;
        assert_eq!(res, Err(ServiceError::Timeout(Duration::from_millis(20))));
    }

    #[tokio::test]
    async fn disabled_generator_fails() {
        let res = DisabledGenerator.complete("p", &opts()).await;
        assert_eq!(res, Err(ServiceError::Disabled));
    }

    #[test]
    fn disabled_config_builds_disabled_generator() {
        let cfg = AiConfig {
            enabled: false,
            ..Default::default()
        };
        assert_eq!(build_generator_from_config(&cfg).provider_name(), "disabled");
    }
}
