// src/ingest/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// A candidate news entry retrieved from a feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewsItem {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub source_url: String,
    pub feed: String,                        // feed URL or provider name
    pub published_at: Option<DateTime<Utc>>, // from pubDate, when parseable
    pub fetched_at: DateTime<Utc>,
}

impl NewsItem {
    /// Item built from a manual `/generate` request; it never enters the seen-set.
    pub fn manual(title: &str, content: &str) -> Self {
        Self {
            id: format!("manual-{}", derive_item_id(&format!("{title}\n{content}"))),
            title: title.trim().to_string(),
            summary: content.trim().to_string(),
            source_url: String::new(),
            feed: "manual".to_string(),
            published_at: None,
            fetched_at: Utc::now(),
        }
    }
}

/// Stable id for an entry: SHA-256 over its GUID (or link), first 16 bytes in hex.
pub fn derive_item_id(key: &str) -> String {
    use sha2::{Digest, Sha256};
    use std::fmt::Write as _;

    let digest = Sha256::digest(key.trim().as_bytes());
    let mut out = String::with_capacity(32);
    for b in digest.iter().take(16) {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[async_trait::async_trait]
pub trait FeedProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<NewsItem>, FetchError>;
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_id_is_stable_and_trimmed() {
        let a = derive_item_id("https://example.com/a");
        let b = derive_item_id("  https://example.com/a \n");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert_ne!(a, derive_item_id("https://example.com/b"));
    }

    #[test]
    fn manual_items_are_namespaced() {
        let it = NewsItem::manual(" Title ", "Body");
        assert!(it.id.starts_with("manual-"));
        assert_eq!(it.title, "Title");
        assert_eq!(it.feed, "manual");
    }
}
