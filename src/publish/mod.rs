// src/publish/mod.rs
pub mod note;
pub mod session;
pub mod twitter;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AuthError, PrimaryPublishError, ShareError, StageError};
use crate::generate::Article;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    Success,
    Failed,
}

/// Outcome of one publisher call; drives the next transition and the logs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishResult {
    pub platform: Platform,
    pub status: PublishStatus,
    pub published_url: Option<String>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl PublishResult {
    pub fn success(platform: Platform, published_url: Option<String>) -> Self {
        Self {
            platform,
            status: PublishStatus::Success,
            published_url,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failed<E: StageError>(platform: Platform, err: &E) -> Self {
        Self {
            platform,
            status: PublishStatus::Failed,
            published_url: None,
            error: Some(err.reason()),
            timestamp: Utc::now(),
        }
    }
}

/// Content platform with session-based submission. Not idempotent: callers
/// must not publish the same article twice.
#[async_trait::async_trait]
pub trait PrimaryPublisher: Send + Sync {
    async fn publish(&self, article: &Article) -> Result<String, PrimaryPublishError>;
    fn name(&self) -> &'static str;
}

/// Social network announcement of an already published article.
#[async_trait::async_trait]
pub trait SecondaryPublisher: Send + Sync {
    async fn share(&self, title: &str, url: &str) -> Result<(), ShareError>;
    fn name(&self) -> &'static str;
}

pub type DynPrimary = Arc<dyn PrimaryPublisher>;
pub type DynSecondary = Arc<dyn SecondaryPublisher>;

/// Used when NOTE_EMAIL / NOTE_PASSWORD are missing.
pub struct DisabledPrimary;

#[async_trait::async_trait]
impl PrimaryPublisher for DisabledPrimary {
    async fn publish(&self, _article: &Article) -> Result<String, PrimaryPublishError> {
        Err(AuthError("note credentials are not configured".into()).into())
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Used when TWITTER_BEARER_TOKEN is missing.
pub struct DisabledSecondary;

#[async_trait::async_trait]
impl SecondaryPublisher for DisabledSecondary {
    async fn share(&self, _title: &str, _url: &str) -> Result<(), ShareError> {
        Err(ShareError::NotConfigured)
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}
