//! # Aggregator
//! Pure ordering and grouping over `NewsItem`s. No I/O.
//!
//! Buckets are sorted newest first with undated items last; the combined
//! feed is either the same ordering across all buckets or a shuffle so one
//! outlet does not dominate the top of the page.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::model::{Category, NewsItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CombinedOrder {
    #[default]
    Sorted,
    Shuffled,
}

/// Seeded when a seed is given, otherwise from the thread RNG.
pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_rng(&mut rand::rng()),
    }
}

/// Newest first; `None` after every dated item. RFC 3339 values are compared
/// as instants; anything else falls back to string order.
pub fn cmp_published_desc(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => match (parse_ts(x), parse_ts(y)) {
            (Some(tx), Some(ty)) => ty.cmp(&tx),
            _ => y.cmp(x),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn parse_ts(s: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(s, &Rfc3339).ok()
}

/// Stable sort: equal keys keep their input order.
pub fn sort_bucket(items: &mut [NewsItem]) {
    items.sort_by(|a, b| cmp_published_desc(&a.published_at, &b.published_at));
}

/// Random sample of at most `n`, in place. Order afterwards is arbitrary.
pub fn sample_in_place<T>(items: &mut Vec<T>, n: usize, rng: &mut StdRng) {
    if items.len() <= n {
        return;
    }
    items.shuffle(rng);
    items.truncate(n);
}

/// Group by category. Every category gets an entry, possibly empty.
pub fn group_by_category(items: Vec<NewsItem>) -> BTreeMap<Category, Vec<NewsItem>> {
    let mut buckets: BTreeMap<Category, Vec<NewsItem>> =
        Category::ALL.iter().map(|c| (*c, Vec::new())).collect();
    for it in items {
        buckets.entry(it.category).or_default().push(it);
    }
    for v in buckets.values_mut() {
        sort_bucket(v);
    }
    buckets
}

/// New items first, then previous ones whose URL is not already present;
/// sorted and capped at `retain`.
pub fn merge_with_previous(
    fresh: Vec<NewsItem>,
    previous: Vec<NewsItem>,
    retain: usize,
) -> Vec<NewsItem> {
    let mut urls: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(fresh.len() + previous.len());
    for it in fresh.into_iter().chain(previous) {
        if urls.insert(it.url.clone()) {
            out.push(it);
        }
    }
    sort_bucket(&mut out);
    out.truncate(retain);
    out
}

/// Union of all buckets in category order, then ordered per policy.
pub fn build_combined(
    buckets: &BTreeMap<Category, Vec<NewsItem>>,
    order: CombinedOrder,
    rng: &mut StdRng,
) -> Vec<NewsItem> {
    let mut all: Vec<NewsItem> = buckets.values().flatten().cloned().collect();
    match order {
        CombinedOrder::Sorted => sort_bucket(&mut all),
        CombinedOrder::Shuffled => all.shuffle(rng),
    }
    all
}

/// What the writer persists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub buckets: BTreeMap<Category, Vec<NewsItem>>,
    pub combined: Vec<NewsItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(headline: &str, cat: Category, ts: Option<&str>) -> NewsItem {
        NewsItem {
            source: "cbc".into(),
            logo: String::new(),
            headline: headline.into(),
            url: format!("https://example.test/{headline}"),
            category: cat,
            published_at: ts.map(str::to_string),
        }
    }

    #[test]
    fn undated_items_sort_last() {
        let mut v = vec![
            item("a", Category::General, None),
            item("b", Category::General, Some("2024-01-02")),
            item("c", Category::General, Some("2024-01-01")),
        ];
        sort_bucket(&mut v);
        let ts: Vec<Option<&str>> = v.iter().map(|i| i.published_at.as_deref()).collect();
        assert_eq!(ts, vec![Some("2024-01-02"), Some("2024-01-01"), None]);
    }

    #[test]
    fn sort_is_stable_for_ties() {
        let mut v = vec![
            item("first", Category::General, None),
            item("x", Category::General, Some("2024-01-01")),
            item("second", Category::General, None),
            item("y", Category::General, Some("2024-01-01")),
        ];
        sort_bucket(&mut v);
        let order: Vec<&str> = v.iter().map(|i| i.headline.as_str()).collect();
        assert_eq!(order, vec!["x", "y", "first", "second"]);
    }

    #[test]
    fn fractional_seconds_order_by_instant() {
        let mut v = vec![
            item("earlier", Category::General, Some("2024-01-02T10:00:00Z")),
            item("later", Category::General, Some("2024-01-02T10:00:00.5Z")),
            item("offset", Category::General, Some("2024-01-02T11:30:00+01:00")),
        ];
        sort_bucket(&mut v);
        let order: Vec<&str> = v.iter().map(|i| i.headline.as_str()).collect();
        assert_eq!(order, vec!["offset", "later", "earlier"]);
    }

    #[test]
    fn grouping_has_every_category() {
        let b = group_by_category(vec![item("a", Category::Sports, None)]);
        assert_eq!(b.len(), Category::ALL.len());
        assert_eq!(b[&Category::Sports].len(), 1);
        assert!(b[&Category::Weather].is_empty());
    }

    #[test]
    fn sample_caps_length() {
        let mut rng = make_rng(Some(1));
        let mut v: Vec<u32> = (0..20).collect();
        sample_in_place(&mut v, 5, &mut rng);
        assert_eq!(v.len(), 5);
        let mut small = vec![1, 2];
        sample_in_place(&mut small, 5, &mut rng);
        assert_eq!(small, vec![1, 2]);
    }

    #[test]
    fn seeded_shuffle_is_reproducible() {
        let b = group_by_category(
            (0..10)
                .map(|i| item(&format!("h{i}"), Category::General, None))
                .collect(),
        );
        let a1 = build_combined(&b, CombinedOrder::Shuffled, &mut make_rng(Some(42)));
        let a2 = build_combined(&b, CombinedOrder::Shuffled, &mut make_rng(Some(42)));
        assert_eq!(a1, a2);
        assert_eq!(a1.len(), 10);
    }

    #[test]
    fn merge_prefers_fresh_and_caps() {
        let mut fresh = item("new", Category::General, Some("2024-03-01"));
        fresh.url = "https://example.test/same".into();
        let mut old_same = item("old", Category::General, Some("2024-02-01"));
        old_same.url = "https://example.test/same".into();
        let older = item("older", Category::General, Some("2024-01-01"));

        let merged = merge_with_previous(vec![fresh], vec![old_same, older], 10);
        let heads: Vec<&str> = merged.iter().map(|i| i.headline.as_str()).collect();
        assert_eq!(heads, vec!["new", "older"]);

        let capped = merge_with_previous(
            vec![item("a", Category::General, Some("2024-01-02"))],
            vec![item("b", Category::General, Some("2024-01-01"))],
            1,
        );
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].headline, "a");
    }
}
