//! # Publish Pipeline
//! Drives each fetched news item through
//! `Fetched → Generated → Published → Shared → Done`, with `Failed(stage, reason)`
//! reachable from every non-terminal state.
//!
//! Policy:
//! - one item at a time, no retries inside a run;
//! - the item id enters the seen-set the moment the primary post succeeds,
//!   before the announcement is attempted, so the primary platform never gets
//!   the same item twice;
//! - a failed announcement is a soft failure: the item stays seen;
//! - items failing earlier stay unseen and are fetched again next tick.

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::error::{Stage, StageError};
use crate::generate::{Article, DynGenerator};
use crate::ingest::types::NewsItem;
use crate::ingest::{ensure_metrics_described, NewsFetcher};
use crate::publish::{DynPrimary, DynSecondary, Platform, PublishResult, PublishStatus};
use crate::seen::SeenStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Scheduled,
    Manual,
}

impl Trigger {
    fn as_str(&self) -> &'static str {
        match self {
            Trigger::Scheduled => "scheduled",
            Trigger::Manual => "manual",
        }
    }
}

/// Per-item state. Every state owns what the next transition needs.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    Fetched {
        item: NewsItem,
    },
    Generated {
        item: NewsItem,
        article: Article,
    },
    Published {
        item: NewsItem,
        article: Article,
        url: String,
    },
    Shared {
        item: NewsItem,
        article: Article,
        url: String,
    },
    Done {
        item: NewsItem,
        article: Article,
        url: String,
    },
    Failed {
        item: NewsItem,
        stage: Stage,
        reason: String,
    },
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done { .. } | PipelineState::Failed { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            PipelineState::Fetched { .. } => "fetched",
            PipelineState::Generated { .. } => "generated",
            PipelineState::Published { .. } => "published",
            PipelineState::Shared { .. } => "shared",
            PipelineState::Done { .. } => "done",
            PipelineState::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    Done,
    Failed {
        stage: Stage,
        reason: String,
        /// Primary post exists; only the announcement failed.
        soft: bool,
    },
}

/// Summary of one item's trip through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub item_id: String,
    pub title: String,
    pub article_title: Option<String>,
    #[serde(flatten)]
    pub status: ItemStatus,
    pub published_url: Option<String>,
    pub marked_seen: bool,
    pub results: Vec<PublishResult>,
}

impl ItemOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self.status, ItemStatus::Done)
    }

    pub fn failed_stage(&self) -> Option<Stage> {
        match &self.status {
            ItemStatus::Failed { stage, .. } => Some(*stage),
            ItemStatus::Done => None,
        }
    }

    pub fn is_soft_failure(&self) -> bool {
        matches!(self.status, ItemStatus::Failed { soft: true, .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub trigger: Trigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// New (unseen) items the fetcher returned.
    pub fetched: usize,
    /// Unseen items not attempted this tick because the cap was reached.
    pub deferred: usize,
    pub outcomes: Vec<ItemOutcome>,
}

impl RunReport {
    pub fn done_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_done()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.done_count()
    }
}

// What happened along the way, collected while stepping.
#[derive(Default)]
struct Progress {
    article_title: Option<String>,
    published_url: Option<String>,
    marked_seen: bool,
    results: Vec<PublishResult>,
}

pub struct Pipeline {
    fetcher: NewsFetcher,
    generator: DynGenerator,
    primary: DynPrimary,
    secondary: DynSecondary,
    max_items_per_tick: usize,
}

impl Pipeline {
    pub fn new(
        fetcher: NewsFetcher,
        generator: DynGenerator,
        primary: DynPrimary,
        secondary: DynSecondary,
    ) -> Self {
        Self {
            fetcher,
            generator,
            primary,
            secondary,
            max_items_per_tick: 1,
        }
    }

    pub fn with_max_items_per_tick(mut self, n: usize) -> Self {
        self.max_items_per_tick = n.max(1);
        self
    }

    pub fn fetcher(&self) -> &NewsFetcher {
        &self.fetcher
    }

    pub fn generator(&self) -> &DynGenerator {
        &self.generator
    }

    pub fn primary(&self) -> &DynPrimary {
        &self.primary
    }

    pub fn secondary(&self) -> &DynSecondary {
        &self.secondary
    }

    pub fn max_items_per_tick(&self) -> usize {
        self.max_items_per_tick
    }

    /// One tick: fetch unseen items and process them sequentially until the
    /// per-tick cap of primary posts is reached. Only items that got a primary
    /// post count against the cap; an item failing before that never stops
    /// the rest of the tick. `seen` is borrowed exclusively for the whole tick.
    pub async fn run_tick(&self, seen: &mut SeenStore, trigger: Trigger) -> RunReport {
        ensure_metrics_described();
        let started_at = Utc::now();

        let items = self.fetcher.fetch(seen).await;
        let fetched = items.len();

        let mut outcomes = Vec::with_capacity(fetched.min(self.max_items_per_tick));
        let mut posted = 0usize;
        for item in items {
            if posted >= self.max_items_per_tick {
                break;
            }
            let outcome = self.process_item(item, seen).await;
            if outcome.marked_seen {
                posted += 1;
            }
            outcomes.push(outcome);
        }
        let deferred = fetched - outcomes.len();

        let finished_at = Utc::now();
        counter!("pipeline_runs_total", "trigger" => trigger.as_str()).increment(1);
        gauge!("pipeline_last_run_ts").set(finished_at.timestamp() as f64);

        let report = RunReport {
            trigger,
            started_at,
            finished_at,
            fetched,
            deferred,
            outcomes,
        };
        tracing::info!(
            target: "pipeline",
            trigger = trigger.as_str(),
            fetched,
            deferred,
            done = report.done_count(),
            failed = report.failed_count(),
            "tick finished"
        );
        report
    }

    /// Run one unseen item to a terminal state.
    pub(crate) async fn process_item(&self, item: NewsItem, seen: &mut SeenStore) -> ItemOutcome {
        let span = tracing::info_span!("item", item_id = %item.id);
        self.drive(item, seen).instrument(span).await
    }

    async fn drive(&self, item: NewsItem, seen: &mut SeenStore) -> ItemOutcome {
        let item_id = item.id.clone();
        let title = item.title.clone();

        let mut progress = Progress::default();
        let mut state = PipelineState::Fetched { item };
        while !state.is_terminal() {
            let from = state.name();
            state = self.step(state, seen, &mut progress).await;
            tracing::debug!(from, to = state.name(), "transition");
        }

        let status = match state {
            PipelineState::Failed { stage, reason, .. } => {
                let soft = stage == Stage::PublishSecondary;
                counter!("pipeline_stage_failures_total", "stage" => stage.as_str()).increment(1);
                if soft {
                    counter!("pipeline_items_total", "outcome" => "soft_failed").increment(1);
                    tracing::warn!(stage = %stage, %reason, "announcement failed; primary post kept, item stays seen");
                } else {
                    counter!("pipeline_items_total", "outcome" => "failed").increment(1);
                    tracing::error!(stage = %stage, %reason, "item failed; eligible again next tick");
                }
                ItemStatus::Failed { stage, reason, soft }
            }
            _ => {
                counter!("pipeline_items_total", "outcome" => "done").increment(1);
                tracing::info!(url = ?progress.published_url, "item done");
                ItemStatus::Done
            }
        };

        ItemOutcome {
            item_id,
            title,
            article_title: progress.article_title,
            status,
            published_url: progress.published_url,
            marked_seen: progress.marked_seen,
            results: progress.results,
        }
    }

    async fn step(
        &self,
        state: PipelineState,
        seen: &mut SeenStore,
        progress: &mut Progress,
    ) -> PipelineState {
        match state {
            PipelineState::Fetched { item } => match self.generator.generate(&item).await {
                Ok(article) => {
                    progress.article_title = Some(article.title.clone());
                    PipelineState::Generated { item, article }
                }
                Err(e) => fail(item, &e),
            },

            PipelineState::Generated { item, article } => {
                match self.primary.publish(&article).await {
                    Ok(url) if !url.trim().is_empty() => {
                        let url = url.trim().to_string();
                        // Recorded before sharing: the primary post must never repeat.
                        match seen.mark_seen(&item.id) {
                            Ok(_) => {}
                            Err(e) => tracing::error!(error = ?e, "persisting seen-set failed; item is marked in memory only"),
                        }
                        progress.marked_seen = true;
                        progress.published_url = Some(url.clone());
                        progress
                            .results
                            .push(PublishResult::success(Platform::Primary, Some(url.clone())));
                        PipelineState::Published { item, article, url }
                    }
                    Ok(_) => {
                        let reason = "primary publisher returned an empty URL".to_string();
                        progress.results.push(PublishResult {
                            platform: Platform::Primary,
                            status: PublishStatus::Failed,
                            published_url: None,
                            error: Some(reason.clone()),
                            timestamp: Utc::now(),
                        });
                        PipelineState::Failed {
                            item,
                            stage: Stage::PublishPrimary,
                            reason,
                        }
                    }
                    Err(e) => {
                        progress
                            .results
                            .push(PublishResult::failed(Platform::Primary, &e));
                        fail(item, &e)
                    }
                }
            }

            PipelineState::Published { item, article, url } => {
                match self.secondary.share(&article.title, &url).await {
                    Ok(()) => {
                        progress
                            .results
                            .push(PublishResult::success(Platform::Secondary, Some(url.clone())));
                        PipelineState::Shared { item, article, url }
                    }
                    Err(e) => {
                        progress
                            .results
                            .push(PublishResult::failed(Platform::Secondary, &e));
                        fail(item, &e)
                    }
                }
            }

            PipelineState::Shared { item, article, url } => PipelineState::Done { item, article, url },

            terminal => terminal,
        }
    }
}

fn fail<E: StageError>(item: NewsItem, err: &E) -> PipelineState {
    PipelineState::Failed {
        item,
        stage: err.stage(),
        reason: err.reason(),
    }
}
