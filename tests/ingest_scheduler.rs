// tests/ingest_scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use ai_news_publisher::history::History;
use ai_news_publisher::ingest::scheduler::{spawn_pipeline_scheduler, PipelineSchedulerCfg};
use ai_news_publisher::ingest::NewsFetcher;
use ai_news_publisher::pipeline::{Pipeline, Trigger};
use ai_news_publisher::seen::SeenStore;
use ai_news_publisher::stubs::{
    news_item, RecordingPrimary, RecordingSecondary, ScriptedGenerator, StaticFeed,
};
use tokio::sync::Mutex;

struct Running {
    feed: StaticFeed,
    primary: Arc<RecordingPrimary>,
    seen: Arc<Mutex<SeenStore>>,
    history: Arc<History>,
}

fn start(run_on_start: bool) -> Running {
    let feed = StaticFeed::new("static", vec![news_item("abc", "AI breakthrough")]);
    let primary = Arc::new(RecordingPrimary::returning("https://note.example/abc"));
    let pipeline = Pipeline::new(
        NewsFetcher::new(vec![Box::new(feed.clone())]),
        Arc::new(ScriptedGenerator::ok("T", "B")),
        primary.clone(),
        Arc::new(RecordingSecondary::ok()),
    );
    let seen = Arc::new(Mutex::new(SeenStore::in_memory()));
    let history = Arc::new(History::with_capacity(10));
    spawn_pipeline_scheduler(
        PipelineSchedulerCfg {
            interval_secs: 60,
            run_on_start,
        },
        Arc::new(pipeline),
        seen.clone(),
        history.clone(),
    );
    Running {
        feed,
        primary,
        seen,
        history,
    }
}

#[tokio::test(start_paused = true)]
async fn ticks_on_start_then_every_interval() {
    let r = start(true);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(r.history.len(), 1);
    assert!(r.seen.lock().await.contains("abc"));

    r.feed.set_items(vec![news_item("abc", "AI breakthrough"), news_item("def", "next")]);
    tokio::time::sleep(Duration::from_secs(60)).await;

    let runs = r.history.snapshot_last_n(10);
    assert_eq!(runs.len(), 2);
    assert!(runs.iter().all(|run| run.trigger == Trigger::Scheduled));
    assert_eq!(runs[1].fetched, 1, "only the new item is fetched");
    assert_eq!(r.primary.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn first_tick_waits_a_full_interval_by_default() {
    let r = start(false);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(r.history.is_empty());

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(r.history.len(), 1);
}
