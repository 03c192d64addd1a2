// tests/providers_rss.rs
use ai_news_publisher::ingest::providers::rss::RssFeedProvider;
use ai_news_publisher::ingest::types::{derive_item_id, FeedProvider};
use ai_news_publisher::ingest::NewsFetcher;
use ai_news_publisher::seen::SeenStore;
use metrics_exporter_prometheus::PrometheusBuilder;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const AI_XML: &str = include_str!("fixtures/ai_news_rss.xml");

#[tokio::test]
async fn fixture_parses_usable_entries_only() {
    let provider = RssFeedProvider::from_fixture("google-ai", AI_XML);
    let items = provider.fetch_latest().await.expect("fixture parses");

    let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "OpenAI unveils new reasoning model",
            "生成AIの業務活用が加速 国内企業の調査",
            "Chipmakers race to build AI accelerators",
        ]
    );
    assert!(items.iter().all(|i| i.feed == "google-ai"));
}

#[tokio::test]
async fn identity_and_fields_are_derived_from_entries() {
    let items = RssFeedProvider::parse_items_from_str("f", AI_XML).expect("parse");

    let first = &items[0];
    assert_eq!(first.id, derive_item_id("CBMiK2h0dHBzOi8vbmV3cy5leGFtcGxlLmNvbS9vcGVuYWk"));
    assert_eq!(first.source_url, "https://news.example.com/articles/openai-reasoning");
    assert!(first.published_at.is_some());
    assert!(first.summary.contains("Tech Daily"));
    assert!(!first.summary.contains('<'));

    let second = &items[1];
    assert_eq!(second.id, derive_item_id("https://news.example.jp/ai/survey-2025"));
    assert_eq!(second.summary, "国内企業の 6割 が生成AIを導入済み。");

    assert!(items[2].published_at.is_none(), "bad pubDate is dropped, not fatal");
}

#[tokio::test]
async fn malformed_document_is_a_parse_error() {
    let provider = RssFeedProvider::from_fixture("broken", "<rss><channel><item>");
    let err = provider.fetch_latest().await.unwrap_err();
    assert!(err.to_string().starts_with("Parse error"), "got {err}");
}

#[tokio::test]
async fn http_feed_is_downloaded_and_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rss"))
        .respond_with(ResponseTemplate::new(200).set_body_string(AI_XML))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/rss", server.uri());
    let provider = RssFeedProvider::from_url(&url, reqwest::Client::new());
    let items = provider.fetch_latest().await.expect("download ok");
    assert_eq!(items.len(), 3);
    assert_eq!(provider.name(), url);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rss"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let provider = RssFeedProvider::from_url(&format!("{}/rss", server.uri()), reqwest::Client::new());
    let err = provider.fetch_latest().await.unwrap_err();
    assert_eq!(err.to_string(), "HTTP error: status 404");
}

#[tokio::test]
async fn server_errors_are_retried_up_to_the_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rss"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let provider = RssFeedProvider::from_url(&format!("{}/rss", server.uri()), reqwest::Client::new())
        .with_retries(2);
    assert!(provider.fetch_latest().await.is_err());
}

#[tokio::test]
async fn failing_feed_does_not_hide_the_others() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let fetcher = NewsFetcher::new(vec![
        Box::new(RssFeedProvider::from_url(&format!("{}/down", server.uri()), reqwest::Client::new())),
        Box::new(RssFeedProvider::from_fixture("ok", AI_XML)),
    ]);
    let items = fetcher.fetch(&SeenStore::in_memory()).await;
    assert_eq!(items.len(), 3);
}

#[tokio::test]
async fn feed_errors_are_counted_once_with_their_kind() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    let _local = metrics::set_default_local_recorder(&recorder);

    let fetcher = NewsFetcher::new(vec![
        Box::new(RssFeedProvider::from_url(&format!("{}/down", server.uri()), reqwest::Client::new())),
        Box::new(RssFeedProvider::from_fixture("broken", "<html><body>")),
    ]);
    assert!(fetcher.fetch(&SeenStore::in_memory()).await.is_empty());

    let rendered = handle.render();
    let series: Vec<&str> = rendered
        .lines()
        .filter(|l| l.starts_with("feed_errors_total"))
        .collect();
    assert_eq!(series.len(), 2, "got:\n{rendered}");
    assert!(series.contains(&r#"feed_errors_total{kind="http"} 1"#), "got:\n{rendered}");
    assert!(series.contains(&r#"feed_errors_total{kind="parse"} 1"#), "got:\n{rendered}");
}

#[tokio::test]
async fn seen_and_duplicate_items_are_filtered() {
    let fetcher = NewsFetcher::new(vec![
        Box::new(RssFeedProvider::from_fixture("a", AI_XML)),
        Box::new(RssFeedProvider::from_fixture("b", AI_XML)),
    ]);
    let mut seen = SeenStore::in_memory();
    seen.mark_seen(&derive_item_id("https://news.example.jp/ai/survey-2025"))
        .expect("in-memory mark");

    let items = fetcher.fetch(&seen).await;
    assert_eq!(items.len(), 2, "second feed repeats the first, one item is seen");
    assert!(items.iter().all(|i| i.feed == "a"));
}
