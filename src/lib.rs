// src/lib.rs
// Public library surface for the binary and the integration tests.

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod generate;
pub mod history;
pub mod ingest;
pub mod metrics;
pub mod pipeline;
pub mod publish;
pub mod seen;
pub mod stubs;

pub use crate::api::{router, AppState};
pub use crate::pipeline::{Pipeline, RunReport, Trigger};

use axum::Router;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{AppConfig, AppEnv};

/// Install the global subscriber. Compact output in development and testing,
/// JSON lines in production. `RUST_LOG` overrides the default filter.
/// Safe to call twice; the second call is a no-op.
pub fn init_tracing(env: AppEnv) {
    let default_filter = match env {
        AppEnv::Development => "ai_news_publisher=debug,info",
        AppEnv::Production | AppEnv::Testing => "info",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let registry = tracing_subscriber::registry().with(filter);
    let res = if env.is_production() {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Build shared state, start the scheduler and return the router.
/// Call this from the Shuttle entrypoint after tracing init.
pub fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let state = bootstrap::build_state(cfg)?;
    bootstrap::start_scheduler(cfg, &state);
    Ok(router(state, &cfg.cors_origins))
}
