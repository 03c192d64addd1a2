// src/config/app.rs
use anyhow::{bail, Context, Result};
use secrecy::SecretString;
use std::env;
use std::path::PathBuf;

use crate::generate::gemini::{DEFAULT_GEMINI_API_BASE, DEFAULT_GEMINI_MODEL};
use crate::ingest::config::{load_feeds_default, split_csv};
use crate::publish::note::DEFAULT_NOTE_BASE_URL;
use crate::publish::twitter::DEFAULT_TWITTER_API_BASE;
use crate::seen::DEFAULT_SEEN_STATE_PATH;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
    Testing,
}

impl AppEnv {
    /// Unknown values fall back to development.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => AppEnv::Production,
            "testing" | "test" => AppEnv::Testing,
            _ => AppEnv::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, AppEnv::Production)
    }
}

#[derive(Debug)]
pub struct GeminiConfig {
    pub api_key: Option<SecretString>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug)]
pub struct NoteConfig {
    pub email: Option<String>,
    pub password: Option<SecretString>,
    pub base_url: String,
}

#[derive(Debug)]
pub struct TwitterConfig {
    /// OAuth 2.0 user-context access token with `tweet.write`.
    pub bearer_token: Option<SecretString>,
    pub base_url: String,
}

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub run_on_start: bool,
    pub max_items_per_tick: usize,
}

/// Everything the process needs, read once at startup.
#[derive(Debug)]
pub struct AppConfig {
    pub env: AppEnv,
    pub feeds: Vec<String>,
    pub gemini: GeminiConfig,
    pub note: NoteConfig,
    pub twitter: TwitterConfig,
    pub scheduler: SchedulerConfig,
    pub seen_state_path: PathBuf,
    pub cors_origins: Vec<String>,
    pub http_timeout_secs: u64,
}

fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or(name: &str, default: &str) -> String {
    env_string(name).unwrap_or_else(|| default.to_string())
}

fn env_secret(name: &str) -> Option<SecretString> {
    env_string(name).map(SecretString::from)
}

fn env_bool(name: &str, default: bool) -> Result<bool> {
    match env_string(name) {
        None => Ok(default),
        Some(v) => match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => bail!("{name} must be a boolean, got '{other}'"),
        },
    }
}

fn env_u64(name: &str, default: u64, min: u64) -> Result<u64> {
    match env_string(name) {
        None => Ok(default),
        Some(v) => {
            let n: u64 = v
                .parse()
                .with_context(|| format!("{name} must be an unsigned integer, got '{v}'"))?;
            Ok(n.max(min))
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let feeds = load_feeds_default().context("loading feed list")?;

        let cfg = Self {
            env: AppEnv::parse(&env_or("APP_ENV", "development")),
            feeds,
            gemini: GeminiConfig {
                api_key: env_secret("GEMINI_API_KEY"),
                model: env_or("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
                base_url: env_or("GEMINI_API_BASE", DEFAULT_GEMINI_API_BASE),
            },
            note: NoteConfig {
                email: env_string("NOTE_EMAIL"),
                password: env_secret("NOTE_PASSWORD"),
                base_url: env_or("NOTE_BASE_URL", DEFAULT_NOTE_BASE_URL),
            },
            twitter: TwitterConfig {
                bearer_token: env_secret("TWITTER_BEARER_TOKEN"),
                base_url: env_or("TWITTER_API_BASE", DEFAULT_TWITTER_API_BASE),
            },
            scheduler: SchedulerConfig {
                enabled: env_bool("PIPELINE_SCHEDULER_ENABLED", true)?,
                interval_secs: env_u64("PIPELINE_INTERVAL_SECS", 3600, 60)?,
                run_on_start: env_bool("PIPELINE_RUN_ON_START", false)?,
                max_items_per_tick: env_u64("PIPELINE_MAX_ITEMS_PER_TICK", 1, 1)? as usize,
            },
            seen_state_path: PathBuf::from(env_or("SEEN_STATE_PATH", DEFAULT_SEEN_STATE_PATH)),
            cors_origins: env_string("CORS_ORIGINS")
                .map(|v| split_csv(&v))
                .unwrap_or_default(),
            http_timeout_secs: env_u64("HTTP_TIMEOUT_SECS", 30, 1)?,
        };
        cfg.log_summary();
        Ok(cfg)
    }

    /// Safe diagnostics: presence of secrets only, never their values.
    pub fn log_summary(&self) {
        tracing::info!(
            env = ?self.env,
            feeds = self.feeds.len(),
            gemini_key = self.gemini.api_key.is_some(),
            gemini_model = %self.gemini.model,
            note_login = self.note.email.is_some() && self.note.password.is_some(),
            twitter_token = self.twitter.bearer_token.is_some(),
            scheduler = self.scheduler.enabled,
            interval_secs = self.scheduler.interval_secs,
            max_items_per_tick = self.scheduler.max_items_per_tick,
            seen_state = %self.seen_state_path.display(),
            "configuration loaded"
        );
    }
}
