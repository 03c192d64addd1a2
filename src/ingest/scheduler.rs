// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::history::History;
use crate::pipeline::{Pipeline, RunReport, Trigger};
use crate::seen::SeenStore;

#[derive(Clone, Copy, Debug)]
pub struct PipelineSchedulerCfg {
    pub interval_secs: u64,
    pub run_on_start: bool,
}

/// Run one tick while holding the shared seen-set lock, then record it.
/// The scheduler, `/api/v1/run` and the stage endpoints all serialize on
/// this lock, so ticks and manual calls never interleave.
pub async fn run_locked(
    pipeline: &Pipeline,
    seen: &Mutex<SeenStore>,
    history: &History,
    trigger: Trigger,
) -> RunReport {
    let report = {
        let mut guard = seen.lock().await;
        pipeline.run_tick(&mut guard, trigger).await
    };
    history.push(report.clone());
    report
}

/// Spawn the periodic pipeline. Ticks cannot overlap: the loop awaits each
/// run before waiting for the next tick, and missed ticks are skipped.
pub fn spawn_pipeline_scheduler(
    cfg: PipelineSchedulerCfg,
    pipeline: Arc<Pipeline>,
    seen: Arc<Mutex<SeenStore>>,
    history: Arc<History>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = Duration::from_secs(cfg.interval_secs.max(1));
        let start = if cfg.run_on_start {
            Instant::now()
        } else {
            Instant::now() + period
        };
        let mut ticker = interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(
            target: "scheduler",
            interval_secs = cfg.interval_secs,
            run_on_start = cfg.run_on_start,
            "pipeline scheduler started"
        );

        loop {
            ticker.tick().await;
            let report = run_locked(&pipeline, &seen, &history, Trigger::Scheduled).await;
            tracing::info!(
                target: "scheduler",
                fetched = report.fetched,
                done = report.done_count(),
                failed = report.failed_count(),
                deferred = report.deferred,
                "scheduled tick"
            );
        }
    })
}
