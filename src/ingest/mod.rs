// src/ingest/mod.rs
pub mod config;
pub mod providers;
pub mod scheduler;
pub mod types;

use crate::ingest::types::{FeedProvider, NewsItem};
use crate::seen::SeenStore;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use std::collections::HashSet;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("news_fetched_total", "Items parsed from feeds.");
        describe_counter!(
            "news_skipped_seen_total",
            "Items dropped because they are already in the seen-set."
        );
        describe_counter!(
            "news_skipped_duplicate_total",
            "Items dropped because the same id appeared earlier in the fetch."
        );
        describe_counter!("feed_errors_total", "Feed fetch/parse errors.");
        describe_histogram!("feed_parse_ms", "Feed parse time in milliseconds.");
        describe_counter!("pipeline_runs_total", "Pipeline ticks executed.");
        describe_counter!("pipeline_items_total", "Items processed, by outcome.");
        describe_counter!(
            "pipeline_stage_failures_total",
            "Stage failures, by stage."
        );
        describe_histogram!("generation_duration_ms", "Article generation latency.");
        describe_gauge!(
            "pipeline_last_run_ts",
            "Unix ts when the pipeline last ran."
        );
    });
}

/// Normalize feed text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 4) Length cap: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}

/// Drop items already seen and repeated ids within one fetch (first wins).
/// Returns (kept, skipped_seen, skipped_duplicate).
pub fn filter_unseen(items: Vec<NewsItem>, seen: &SeenStore) -> (Vec<NewsItem>, usize, usize) {
    let mut in_batch: HashSet<String> = HashSet::new();
    let mut keep = Vec::with_capacity(items.len());
    let mut skipped_seen = 0usize;
    let mut skipped_dup = 0usize;

    for it in items {
        if seen.contains(&it.id) {
            skipped_seen += 1;
            continue;
        }
        if !in_batch.insert(it.id.clone()) {
            skipped_dup += 1;
            continue;
        }
        keep.push(it);
    }

    (keep, skipped_seen, skipped_dup)
}

/// Reads every configured feed, in order, and yields the items not yet seen.
pub struct NewsFetcher {
    providers: Vec<Box<dyn FeedProvider>>,
}

impl NewsFetcher {
    pub fn new(providers: Vec<Box<dyn FeedProvider>>) -> Self {
        Self { providers }
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Feed order, then document order. A failing feed is logged and skipped.
    /// Marking items seen is the caller's job.
    pub async fn fetch(&self, seen: &SeenStore) -> Vec<NewsItem> {
        ensure_metrics_described();

        let mut raw = Vec::new();
        for p in &self.providers {
            match p.fetch_latest().await {
                Ok(mut v) => {
                    tracing::debug!(feed = p.name(), count = v.len(), "feed fetched");
                    raw.append(&mut v);
                }
                Err(e) => {
                    tracing::warn!(error = %e, feed = p.name(), "feed error");
                    counter!("feed_errors_total", "kind" => e.kind()).increment(1);
                }
            }
        }

        let (kept, skipped_seen, skipped_dup) = filter_unseen(raw, seen);

        counter!("news_fetched_total").increment(kept.len() as u64);
        counter!("news_skipped_seen_total").increment(skipped_seen as u64);
        counter!("news_skipped_duplicate_total").increment(skipped_dup as u64);
        tracing::info!(
            target: "ingest",
            kept = kept.len(),
            skipped_seen,
            skipped_dup,
            "fetch finished"
        );

        kept
    }
}
