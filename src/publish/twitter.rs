// src/publish/twitter.rs
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::SecondaryPublisher;
use crate::error::ShareError;

pub const DEFAULT_TWITTER_API_BASE: &str = "https://api.twitter.com";

const MAX_WEIGHTED_LEN: usize = 280;
// t.co wraps every link to this weighted length
const URL_WEIGHT: usize = 23;

/// X API v2 client posting with an OAuth 2.0 user-context bearer token.
/// Single attempt: a retried post could publish the announcement twice.
pub struct TwitterPublisher {
    http: reqwest::Client,
    token: SecretString,
    base_url: String,
}

impl TwitterPublisher {
    pub fn new(token: SecretString, timeout_secs: u64) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: build_http(timeout_secs)?,
            token,
            base_url: DEFAULT_TWITTER_API_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base: &str) -> Self {
        self.base_url = base.trim_end_matches('/').to_string();
        self
    }
}

fn build_http(timeout_secs: u64) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(concat!("ai-news-publisher/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}

// X counts most CJK and emoji code points double.
fn char_weight(c: char) -> usize {
    match c as u32 {
        0..=4351 | 8192..=8205 | 8208..=8223 | 8242..=8247 => 1,
        _ => 2,
    }
}

pub fn weighted_len(s: &str) -> usize {
    s.chars().map(char_weight).sum()
}

/// `"{title}\n{url}"`, with the title shortened (ending in `…`) when the post
/// would exceed 280 weighted characters.
pub fn compose_post(title: &str, url: &str) -> String {
    let title = title.trim();
    let budget = MAX_WEIGHTED_LEN - URL_WEIGHT - 1;
    if weighted_len(title) <= budget {
        return format!("{title}\n{url}");
    }
    let ellipsis = '…';
    let limit = budget - char_weight(ellipsis);
    let mut used = 0usize;
    let mut short = String::new();
    for c in title.chars() {
        let w = char_weight(c);
        if used + w > limit {
            break;
        }
        used += w;
        short.push(c);
    }
    format!("{}{ellipsis}\n{url}", short.trim_end())
}

#[derive(Deserialize)]
struct ApiError {
    detail: Option<String>,
    title: Option<String>,
}

#[async_trait::async_trait]
impl SecondaryPublisher for TwitterPublisher {
    async fn share(&self, title: &str, url: &str) -> Result<(), ShareError> {
        let text = compose_post(title, url);
        let resp = self
            .http
            .post(format!("{}/2/tweets", self.base_url))
            .bearer_auth(self.token.expose_secret())
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let raw = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&raw)
                .ok()
                .and_then(|e| e.detail.or(e.title))
                .unwrap_or(raw);
            return Err(ShareError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        tracing::info!(%url, "announcement posted to X");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "twitter"
    }
}
