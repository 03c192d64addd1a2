// src/generate/gemini.rs
use metrics::histogram;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{parse_article, Article, ArticleGenerator};
use crate::error::GenerationError;
use crate::ingest::types::NewsItem;

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Gemini `generateContent` client. No retries: a failed item is picked up
/// again on the next tick.
pub struct GeminiGenerator {
    http: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl GeminiGenerator {
    pub fn new(api_key: SecretString, timeout_secs: u64) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: build_http(timeout_secs)?,
            api_key,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_API_BASE.to_string(),
        })
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_base_url(mut self, base: &str) -> Self {
        self.base_url = base.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

fn build_http(timeout_secs: u64) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(concat!("ai-news-publisher/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}

/// Ask for a structured article with the title alone on the first line.
pub fn build_prompt(item: &NewsItem) -> String {
    format!(
        "Write a blog article in Japanese based on the news below.\n\
         Put the article title alone on the first line, then the article.\n\
         Structure: 1. introduction (background), 2. main part (detailed explanation), \
         3. conclusion (summary).\n\n\
         Title: {}\n\
         Source: {}\n\n\
         Content:\n{}\n",
        item.title, item.source_url, item.summary
    )
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}
#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Req<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize)]
struct Resp {
    #[serde(default)]
    candidates: Vec<Candidate>,
}
#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}
#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}
#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}
#[derive(Deserialize)]
struct ErrBody {
    error: ErrDetail,
}
#[derive(Deserialize)]
struct ErrDetail {
    message: String,
}

#[async_trait::async_trait]
impl ArticleGenerator for GeminiGenerator {
    async fn generate(&self, item: &NewsItem) -> Result<Article, GenerationError> {
        let t0 = std::time::Instant::now();
        let prompt = build_prompt(item);
        let req = Req {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: &prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.7,
                max_output_tokens: 4096,
            },
        };

        let resp = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let raw = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrBody>(&raw)
                .map(|b| b.error.message)
                .unwrap_or(raw);
            return Err(GenerationError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let body: Resp = resp
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;
        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        histogram!("generation_duration_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        tracing::debug!(item_id = %item.id, model = %self.model, chars = text.chars().count(), "gemini answered");

        parse_article(&text, &item.id)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
