//! In-process stand-ins for feeds, the generator and both publishers.
//! Used by the integration tests and for running the service offline.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::error::{FetchError, GenerationError, PrimaryPublishError, ShareError, SubmissionError};
use crate::generate::{Article, ArticleGenerator};
use crate::ingest::types::{FeedProvider, NewsItem};
use crate::publish::{PrimaryPublisher, SecondaryPublisher};

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

/// Feed returning whatever items were last set. Clones share state, so a
/// test can keep a handle after boxing one into a fetcher.
#[derive(Clone)]
pub struct StaticFeed {
    name: String,
    items: Arc<Mutex<Vec<NewsItem>>>,
    failing: Arc<Mutex<bool>>,
}

impl StaticFeed {
    pub fn new(name: &str, items: Vec<NewsItem>) -> Self {
        Self {
            name: name.to_string(),
            items: Arc::new(Mutex::new(items)),
            failing: Arc::new(Mutex::new(false)),
        }
    }

    pub fn set_items(&self, items: Vec<NewsItem>) {
        *lock(&self.items) = items;
    }

    pub fn set_failing(&self, failing: bool) {
        *lock(&self.failing) = failing;
    }
}

#[async_trait::async_trait]
impl FeedProvider for StaticFeed {
    async fn fetch_latest(&self) -> Result<Vec<NewsItem>, FetchError> {
        if *lock(&self.failing) {
            return Err(FetchError::HttpStatus(503));
        }
        Ok(lock(&self.items).clone())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Build a feed item with a stable id, as tests need them.
pub fn news_item(id: &str, title: &str) -> NewsItem {
    NewsItem {
        id: id.to_string(),
        title: title.to_string(),
        summary: format!("{title} summary"),
        source_url: format!("https://news.example/{id}"),
        feed: "static".to_string(),
        published_at: None,
        fetched_at: chrono::Utc::now(),
    }
}

/// Generator with a fixed title and body. Items whose id is in the failure
/// set get an upstream error instead.
pub struct ScriptedGenerator {
    title: String,
    body: String,
    fail_ids: Mutex<HashSet<String>>,
    fail_all: bool,
    calls: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn ok(title: &str, body: &str) -> Self {
        Self {
            title: title.to_string(),
            body: body.to_string(),
            fail_ids: Mutex::new(HashSet::new()),
            fail_all: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::ok("", "")
        }
    }

    pub fn fail_for(&self, item_id: &str) {
        lock(&self.fail_ids).insert(item_id.to_string());
    }

    pub fn recover(&self, item_id: &str) {
        lock(&self.fail_ids).remove(item_id);
    }

    /// Item ids in call order.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }
}

#[async_trait::async_trait]
impl ArticleGenerator for ScriptedGenerator {
    async fn generate(&self, item: &NewsItem) -> Result<Article, GenerationError> {
        lock(&self.calls).push(item.id.clone());
        if self.fail_all || lock(&self.fail_ids).contains(&item.id) {
            return Err(GenerationError::Upstream {
                status: 503,
                message: "model overloaded".into(),
            });
        }
        Ok(Article {
            title: self.title.clone(),
            body: self.body.clone(),
            source_item_id: item.id.clone(),
        })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Primary publisher answering with a fixed URL and recording every article.
pub struct RecordingPrimary {
    url: String,
    fail: Mutex<bool>,
    published: Mutex<Vec<Article>>,
}

impl RecordingPrimary {
    pub fn returning(url: &str) -> Self {
        Self {
            url: url.to_string(),
            fail: Mutex::new(false),
            published: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        let p = Self::returning("");
        p.set_failing(true);
        p
    }

    pub fn set_failing(&self, fail: bool) {
        *lock(&self.fail) = fail;
    }

    /// Every article passed to `publish`, including rejected ones.
    pub fn published(&self) -> Vec<Article> {
        lock(&self.published).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.published).len()
    }
}

#[async_trait::async_trait]
impl PrimaryPublisher for RecordingPrimary {
    async fn publish(&self, article: &Article) -> Result<String, PrimaryPublishError> {
        lock(&self.published).push(article.clone());
        if *lock(&self.fail) {
            return Err(SubmissionError::Rejected {
                status: 500,
                message: "editor unavailable".into(),
            }
            .into());
        }
        Ok(self.url.clone())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Secondary publisher recording `(title, url)` pairs.
pub struct RecordingSecondary {
    fail: Mutex<bool>,
    shared: Mutex<Vec<(String, String)>>,
}

impl RecordingSecondary {
    pub fn ok() -> Self {
        Self {
            fail: Mutex::new(false),
            shared: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        let s = Self::ok();
        s.set_failing(true);
        s
    }

    pub fn set_failing(&self, fail: bool) {
        *lock(&self.fail) = fail;
    }

    pub fn shared(&self) -> Vec<(String, String)> {
        lock(&self.shared).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.shared).len()
    }
}

#[async_trait::async_trait]
impl SecondaryPublisher for RecordingSecondary {
    async fn share(&self, title: &str, url: &str) -> Result<(), ShareError> {
        lock(&self.shared).push((title.to_string(), url.to_string()));
        if *lock(&self.fail) {
            return Err(ShareError::Rejected {
                status: 429,
                message: "Too Many Requests".into(),
            });
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
