// src/resolve.rs
//! Source resolver: origin URL → canonical source key by ordered substring
//! match. Pure and total.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainMarker {
    pub marker: String,
    pub source: String,
}

#[derive(Debug, Clone)]
pub struct SourceResolver {
    markers: Vec<(String, String)>, // (lowercased marker, key)
    default_key: String,
}

impl SourceResolver {
    pub fn new(markers: &[DomainMarker], default_key: &str) -> Self {
        let markers = markers
            .iter()
            .filter(|m| !m.marker.trim().is_empty())
            .map(|m| (m.marker.trim().to_ascii_lowercase(), m.source.clone()))
            .collect();
        Self {
            markers,
            default_key: default_key.to_string(),
        }
    }

    pub fn from_registry(reg: &crate::registry::FeedRegistry) -> Self {
        Self::new(&reg.markers, &reg.default_source)
    }

    /// First marker contained in the URL wins; otherwise the default key.
    pub fn resolve(&self, origin_url: &str) -> &str {
        let url = origin_url.to_ascii_lowercase();
        self.markers
            .iter()
            .find(|(m, _)| url.contains(m.as_str()))
            .map(|(_, k)| k.as_str())
            .unwrap_or(self.default_key.as_str())
    }

    pub fn default_key(&self) -> &str {
        &self.default_key
    }
}
