//! AI News Publisher — Binary Entrypoint
//! Boots the Axum HTTP server and the periodic fetch → generate → publish
//! → share pipeline.
//!
//! See `README.md` for configuration.

use ai_news_publisher::config::{AppConfig, AppEnv};
use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    let env = AppEnv::parse(&std::env::var("APP_ENV").unwrap_or_default());
    ai_news_publisher::init_tracing(env);

    let cfg = AppConfig::from_env()?;
    let router = ai_news_publisher::build_app(&cfg)?;

    Ok(router.into())
}
