use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::error::StageError;
use crate::generate::Article;
use crate::history::History;
use crate::ingest::scheduler::run_locked;
use crate::ingest::types::NewsItem;
use crate::metrics::Metrics;
use crate::pipeline::{Pipeline, Trigger};
use crate::seen::SeenStore;

const RECENT_RUNS: usize = 10;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    /// Dedup state; every pipeline run and stage call holding session or
    /// seen-set state goes through this lock.
    pub seen: Arc<Mutex<SeenStore>>,
    pub history: Arc<History>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// State without a metrics endpoint, as tests build it.
    pub fn new(pipeline: Pipeline, seen: SeenStore) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            seen: Arc::new(Mutex::new(seen)),
            history: Arc::new(History::with_capacity(100)),
            metrics: None,
        }
    }
}

/// Routes, JSON fallback, security headers and CORS. Empty `cors_origins`
/// means permissive CORS.
pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    let metrics = state.metrics.clone();

    let mut app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/v1/fetch_news", get(fetch_news))
        .route("/api/v1/generate", post(generate))
        .route("/api/v1/post_note", post(post_note))
        .route("/api/v1/post_twitter", post(post_twitter))
        .route("/api/v1/run", post(run_now))
        .route("/api/v1/runs", get(recent_runs))
        .with_state(state);

    if let Some(handle) = metrics {
        app = app.merge(Metrics { handle }.router());
    }

    app.fallback(not_found)
        .layer(cors_layer(cors_origins))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'self'"),
        ))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::very_permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({ "status": "error", "message": message.into() })),
    )
        .into_response()
}

async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

#[derive(Deserialize)]
struct ArticleReq {
    title: Option<String>,
    content: Option<String>,
}

#[derive(Deserialize)]
struct ShareReq {
    title: Option<String>,
    url: Option<String>,
}

fn required(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn article_fields(body: Result<Json<ArticleReq>, JsonRejection>) -> Option<(String, String)> {
    let Json(req) = body.ok()?;
    Some((required(req.title)?, required(req.content)?))
}

async fn fetch_news(State(state): State<AppState>) -> Response {
    tracing::info!("fetching news articles");
    let articles: Vec<NewsItem> = {
        let seen = state.seen.lock().await;
        state.pipeline.fetcher().fetch(&seen).await
    };
    tracing::info!(count = articles.len(), "news fetched");
    Json(json!({ "status": "success", "articles": articles })).into_response()
}

async fn generate(
    State(state): State<AppState>,
    body: Result<Json<ArticleReq>, JsonRejection>,
) -> Response {
    let Some((title, content)) = article_fields(body) else {
        tracing::warn!("generate: missing title or content");
        return error_response(StatusCode::BAD_REQUEST, "title and content are required");
    };

    let item = NewsItem::manual(&title, &content);
    match state.pipeline.generator().generate(&item).await {
        Ok(article) => {
            tracing::info!(title = %article.title, "article generated");
            Json(json!({ "status": "success", "article": article })).into_response()
        }
        Err(e) => {
            tracing::error!(stage = %e.stage(), error = %e, "article generation failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.reason())
        }
    }
}

async fn post_note(
    State(state): State<AppState>,
    body: Result<Json<ArticleReq>, JsonRejection>,
) -> Response {
    let Some((title, content)) = article_fields(body) else {
        tracing::warn!("post_note: missing title or content");
        return error_response(StatusCode::BAD_REQUEST, "title and content are required");
    };

    let article = Article {
        source_item_id: NewsItem::manual(&title, &content).id,
        title,
        body: content,
    };
    let result = {
        let _guard = state.seen.lock().await;
        state.pipeline.primary().publish(&article).await
    };
    match result {
        Ok(url) if !url.trim().is_empty() => {
            Json(json!({ "status": "success", "note_url": url })).into_response()
        }
        Ok(_) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to post article"),
        Err(e) => {
            tracing::error!(stage = %e.stage(), error = %e, "manual primary post failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.reason())
        }
    }
}

async fn post_twitter(
    State(state): State<AppState>,
    body: Result<Json<ShareReq>, JsonRejection>,
) -> Response {
    let fields = body
        .ok()
        .and_then(|Json(req)| Some((required(req.title)?, required(req.url)?)));
    let Some((title, url)) = fields else {
        tracing::warn!("post_twitter: missing title or url");
        return error_response(StatusCode::BAD_REQUEST, "title and url are required");
    };

    let result = {
        let _guard = state.seen.lock().await;
        state.pipeline.secondary().share(&title, &url).await
    };
    match result {
        Ok(()) => Json(json!({ "status": "success", "message": "Tweet posted successfully" }))
            .into_response(),
        Err(e) => {
            tracing::error!(stage = %e.stage(), error = %e, "manual announcement failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.reason())
        }
    }
}

async fn run_now(State(state): State<AppState>) -> Response {
    let report = run_locked(&state.pipeline, &state.seen, &state.history, Trigger::Manual).await;
    Json(json!({ "status": "success", "report": report })).into_response()
}

async fn recent_runs(State(state): State<AppState>) -> Response {
    let runs = state.history.snapshot_last_n(RECENT_RUNS);
    Json(json!({ "status": "success", "runs": runs })).into_response()
}
