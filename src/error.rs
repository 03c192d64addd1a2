// src/error.rs
//! Stage error taxonomy shared by the generator, the publishers and the pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pipeline stage an error (or a failed item) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetch,
    Generate,
    PublishPrimary,
    PublishSecondary,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Generate => "generate",
            Stage::PublishPrimary => "publish_primary",
            Stage::PublishSecondary => "publish_secondary",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common surface of every stage error: a stage tag plus a readable reason.
pub trait StageError: std::error::Error {
    fn stage(&self) -> Stage;

    fn reason(&self) -> String {
        self.to_string()
    }
}

/// Errors raised while downloading or parsing a feed. Never aborts a tick.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, timeout)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Feed XML could not be parsed as RSS
    #[error("Parse error: {0}")]
    Parse(String),
}

impl FetchError {
    /// Metric label for the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Network(_) | FetchError::HttpStatus(_) => "http",
            FetchError::Parse(_) => "parse",
        }
    }
}

impl StageError for FetchError {
    fn stage(&self) -> Stage {
        Stage::Fetch
    }
}

/// Text generation failed: upstream error, empty output, or an unusable shape.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generator is not configured (GEMINI_API_KEY missing)")]
    NotConfigured,
    #[error("generation request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("generation API returned status {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("generation API returned empty content")]
    EmptyContent,
    #[error("generated content is malformed: {0}")]
    Malformed(String),
}

impl StageError for GenerationError {
    fn stage(&self) -> Stage {
        Stage::Generate
    }
}

/// Session/login failure on the primary platform.
#[derive(Debug, Error)]
#[error("login failed: {0}")]
pub struct AuthError(pub String);

impl StageError for AuthError {
    fn stage(&self) -> Stage {
        Stage::PublishPrimary
    }
}

/// The primary platform rejected the post or did not answer in time.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("submission timed out")]
    Timeout,
    #[error("submission rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("submission failed: {0}")]
    Other(String),
}

impl StageError for SubmissionError {
    fn stage(&self) -> Stage {
        Stage::PublishPrimary
    }
}

/// Everything the primary publisher can fail with.
#[derive(Debug, Error)]
pub enum PrimaryPublishError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

impl PrimaryPublishError {
    pub fn is_auth(&self) -> bool {
        matches!(self, PrimaryPublishError::Auth(_))
    }
}

impl StageError for PrimaryPublishError {
    fn stage(&self) -> Stage {
        Stage::PublishPrimary
    }
}

/// The social-network announcement failed.
#[derive(Debug, Error)]
pub enum ShareError {
    #[error("share is not configured (TWITTER_BEARER_TOKEN missing)")]
    NotConfigured,
    #[error("share request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("share rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

impl StageError for ShareError {
    fn stage(&self) -> Stage {
        Stage::PublishSecondary
    }
}
