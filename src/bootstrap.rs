// src/bootstrap.rs
//! Wires configuration into concrete providers, publishers and shared state.

use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::api::AppState;
use crate::config::AppConfig;
use crate::generate::gemini::GeminiGenerator;
use crate::generate::{DisabledGenerator, DynGenerator};
use crate::history::History;
use crate::ingest::providers::rss::RssFeedProvider;
use crate::ingest::scheduler::{spawn_pipeline_scheduler, PipelineSchedulerCfg};
use crate::ingest::types::FeedProvider;
use crate::ingest::NewsFetcher;
use crate::metrics::Metrics;
use crate::pipeline::Pipeline;
use crate::publish::note::NoteSession;
use crate::publish::session::SessionPublisher;
use crate::publish::twitter::TwitterPublisher;
use crate::publish::{DisabledPrimary, DisabledSecondary, DynPrimary, DynSecondary};
use crate::seen::SeenStore;

pub const HISTORY_CAPACITY: usize = 500;

fn reshare(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_string())
}

pub fn build_fetcher(cfg: &AppConfig) -> Result<NewsFetcher> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("ai-news-publisher/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(cfg.http_timeout_secs))
        .build()
        .context("building feed HTTP client")?;

    let providers: Vec<Box<dyn FeedProvider>> = cfg
        .feeds
        .iter()
        .map(|url| Box::new(RssFeedProvider::from_url(url, client.clone())) as Box<dyn FeedProvider>)
        .collect();
    Ok(NewsFetcher::new(providers))
}

pub fn build_generator(cfg: &AppConfig) -> Result<DynGenerator> {
    match &cfg.gemini.api_key {
        Some(key) => {
            let generator = GeminiGenerator::new(reshare(key), cfg.http_timeout_secs.max(60))
                .context("building Gemini HTTP client")?
                .with_model(&cfg.gemini.model)
                .with_base_url(&cfg.gemini.base_url);
            Ok(Arc::new(generator))
        }
        None => {
            warn!("GEMINI_API_KEY not set; article generation will fail");
            Ok(Arc::new(DisabledGenerator))
        }
    }
}

pub fn build_primary(cfg: &AppConfig) -> Result<DynPrimary> {
    match (&cfg.note.email, &cfg.note.password) {
        (Some(email), Some(password)) => {
            let session = NoteSession::new(email, reshare(password), cfg.http_timeout_secs)
                .context("building note HTTP client")?
                .with_base_url(&cfg.note.base_url);
            Ok(Arc::new(SessionPublisher::new(session)))
        }
        _ => {
            warn!("NOTE_EMAIL / NOTE_PASSWORD not set; primary publishing will fail");
            Ok(Arc::new(DisabledPrimary))
        }
    }
}

pub fn build_secondary(cfg: &AppConfig) -> Result<DynSecondary> {
    match &cfg.twitter.bearer_token {
        Some(token) => {
            let publisher = TwitterPublisher::new(reshare(token), cfg.http_timeout_secs)
                .context("building X HTTP client")?
                .with_base_url(&cfg.twitter.base_url);
            Ok(Arc::new(publisher))
        }
        None => {
            warn!("TWITTER_BEARER_TOKEN not set; announcements will fail");
            Ok(Arc::new(DisabledSecondary))
        }
    }
}

/// Build the shared state the router and the scheduler run on.
pub fn build_state(cfg: &AppConfig) -> Result<AppState> {
    let pipeline = Pipeline::new(
        build_fetcher(cfg)?,
        build_generator(cfg)?,
        build_primary(cfg)?,
        build_secondary(cfg)?,
    )
    .with_max_items_per_tick(cfg.scheduler.max_items_per_tick);

    let seen = SeenStore::load(&cfg.seen_state_path)
        .with_context(|| format!("loading seen-set from {}", cfg.seen_state_path.display()))?;
    info!(
        seen = seen.len(),
        feeds = ?pipeline.fetcher().provider_names(),
        generator = pipeline.generator().name(),
        primary = pipeline.primary().name(),
        secondary = pipeline.secondary().name(),
        "pipeline assembled"
    );

    Ok(AppState {
        pipeline: Arc::new(pipeline),
        seen: Arc::new(Mutex::new(seen)),
        history: Arc::new(History::with_capacity(HISTORY_CAPACITY)),
        metrics: Some(Metrics::init().handle),
    })
}

/// Start the periodic pipeline if enabled.
pub fn start_scheduler(cfg: &AppConfig, state: &AppState) {
    if !cfg.scheduler.enabled {
        info!("pipeline scheduler disabled");
        return;
    }
    spawn_pipeline_scheduler(
        PipelineSchedulerCfg {
            interval_secs: cfg.scheduler.interval_secs,
            run_on_start: cfg.scheduler.run_on_start,
        },
        state.pipeline.clone(),
        state.seen.clone(),
        state.history.clone(),
    );
}
