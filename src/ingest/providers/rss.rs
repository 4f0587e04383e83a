// src/ingest/providers/rss.rs
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;
use time::{
    format_description::well_known::{Rfc2822, Rfc3339},
    OffsetDateTime, UtcOffset,
};

use crate::ingest::normalize_text;
use crate::ingest::types::{FeedEndpoint, FeedFetcher, FetchError, RawItem};

// --- RSS 2.0 ---

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

// quick-xml drops namespace prefixes, so `<media:title>` or `<atom:link/>`
// land in the same field as the plain element. Collect all, keep the first
// non-empty one.
#[derive(Debug, Deserialize)]
struct Item {
    #[serde(rename = "title", default)]
    title: Vec<Text>,
    #[serde(rename = "link", default)]
    link: Vec<Text>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

// --- Atom ---

#[derive(Debug, Deserialize)]
struct Atom {
    #[serde(rename = "entry", default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(rename = "title", default)]
    title: Vec<Text>,
    #[serde(rename = "link", default)]
    link: Vec<Link>,
    published: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Text {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct Link {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

/// Parse a feed date (RFC 2822 for RSS, RFC 3339 for Atom) into RFC 3339 UTC.
pub fn normalize_feed_date(ts: &str) -> Option<String> {
    let ts = ts.trim();
    OffsetDateTime::parse(ts, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(ts, &Rfc3339))
        .ok()
        .and_then(|dt| dt.replace_nanosecond(0).ok())
        .and_then(|dt| dt.to_offset(UtcOffset::UTC).format(&Rfc3339).ok())
}

fn first_text(values: Vec<Text>) -> Option<String> {
    values
        .into_iter()
        .map(|t| t.value)
        .find(|v| !v.trim().is_empty())
}

/// Parse an RSS 2.0 or Atom document into raw items. Items without a title
/// or link are skipped.
pub fn parse_feed(body: &str, origin_url: &str) -> Result<Vec<RawItem>, FetchError> {
    let xml_clean = scrub_html_entities_for_xml(body);

    let pairs: Vec<(Option<String>, Option<String>, Option<String>)> = if xml_clean
        .contains("<rss")
    {
        let rss: Rss = from_str(&xml_clean).map_err(|e| FetchError::Parse(e.to_string()))?;
        rss.channel
            .item
            .into_iter()
            .map(|it| (first_text(it.title), first_text(it.link), it.pub_date))
            .collect()
    } else if xml_clean.contains("<feed") {
        let atom: Atom = from_str(&xml_clean).map_err(|e| FetchError::Parse(e.to_string()))?;
        atom.entry
            .into_iter()
            .map(|e| {
                let link = e
                    .link
                    .iter()
                    .find(|l| l.rel.as_deref().map_or(true, |r| r == "alternate"))
                    .or(e.link.first())
                    .and_then(|l| l.href.clone());
                (first_text(e.title), link, e.published.or(e.updated))
            })
            .collect()
    } else {
        return Err(FetchError::Parse("not an rss or atom document".into()));
    };

    let mut out = Vec::with_capacity(pairs.len());
    for (title, link, date) in pairs {
        let title = normalize_text(title.as_deref().unwrap_or_default());
        let link = link.unwrap_or_default().trim().to_string();
        if title.is_empty() || link.is_empty() {
            continue;
        }
        out.push(RawItem {
            title,
            link,
            published_at: date.as_deref().and_then(normalize_feed_date),
            origin_url: origin_url.to_string(),
        });
    }
    Ok(out)
}

/// HTTP feed fetcher. One request per call; retries live in the caller.
pub struct HttpRssFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpRssFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    fn map_err(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl FeedFetcher for HttpRssFetcher {
    async fn fetch(&self, endpoint: &FeedEndpoint) -> Result<Vec<RawItem>, FetchError> {
        let resp = self
            .client
            .get(&endpoint.url)
            .send()
            .await
            .map_err(|e| self.map_err(e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = resp.text().await.map_err(|e| self.map_err(e))?;
        parse_feed(&body, &endpoint.url)
    }

    fn name(&self) -> &'static str {
        "http-rss"
    }
}

/// Feeds often carry HTML named entities (`&eacute;`, `&hellip;`) that XML
/// does not define. Decode them to characters before parsing; the five XML
/// entities stay escaped and unknown names become literal text.
fn scrub_html_entities_for_xml(s: &str) -> String {
    static RE_ENTITY: OnceCell<regex::Regex> = OnceCell::new();
    let re = RE_ENTITY.get_or_init(|| regex::Regex::new(r"&([A-Za-z][A-Za-z0-9]*);").unwrap());

    let body = s.trim_start_matches('\u{FEFF}');
    re.replace_all(body, |caps: &regex::Captures| {
        let name = &caps[1];
        if matches!(name, "amp" | "lt" | "gt" | "quot" | "apos") {
            return caps[0].to_string();
        }
        let decoded = html_escape::decode_html_entities(&caps[0]);
        if decoded == caps[0] {
            return format!("&amp;{name};");
        }
        match decoded.as_ref() {
            "&" => "&amp;".to_string(),
            "<" => "&lt;".to_string(),
            ">" => "&gt;".to_string(),
            "\"" => "&quot;".to_string(),
            "'" => "&apos;".to_string(),
            other => other.to_string(),
        }
    })
    .into_owned()
}
