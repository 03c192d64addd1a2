// tests/ingest_dedup.rs
use ai_news_publisher::ingest::filter_unseen;
use ai_news_publisher::seen::SeenStore;
use ai_news_publisher::stubs::news_item;

#[test]
fn seen_and_repeated_ids_are_dropped_first_wins() {
    let mut seen = SeenStore::in_memory();
    seen.mark_seen("old").expect("in-memory mark");

    let mut repeat = news_item("a", "same story, other feed");
    repeat.feed = "second".into();
    let raw = vec![
        news_item("a", "same story"),
        news_item("old", "already published"),
        repeat,
        news_item("b", "fresh"),
    ];

    let (kept, skipped_seen, skipped_dup) = filter_unseen(raw, &seen);
    let ids: Vec<&str> = kept.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(kept[0].title, "same story");
    assert_eq!(skipped_seen, 1);
    assert_eq!(skipped_dup, 1);
}
