// tests/ingest_config.rs
use ai_news_publisher::ingest::config::load_feeds_from;
use std::fs;
use std::path::Path;

#[test]
fn parse_toml_and_json_paths() {
    let dir = tempfile::tempdir().unwrap();

    let p_toml = dir.path().join("feeds.toml");
    fs::write(
        &p_toml,
        r#"
feeds = [" https://b.example/rss ", "", "https://a.example/rss", "https://b.example/rss"]
"#,
    )
    .unwrap();
    let v = load_feeds_from(&p_toml).unwrap();
    assert_eq!(
        v,
        vec!["https://b.example/rss".to_string(), "https://a.example/rss".to_string()]
    );

    let p_json = dir.path().join("feeds.json");
    fs::write(&p_json, r#"["https://c.example/rss"," https://a.example/rss  ", ""]"#).unwrap();
    let vj = load_feeds_from(&p_json).unwrap();
    assert_eq!(
        vj,
        vec!["https://c.example/rss".to_string(), "https://a.example/rss".to_string()]
    );
}

#[test]
fn unsupported_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("feeds.txt");
    fs::write(&p, "https://a.example/rss").unwrap();
    assert!(load_feeds_from(&p).is_err());
}

#[test]
fn shipped_feed_list_parses() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/feeds.toml");
    let feeds = load_feeds_from(&path).unwrap();
    assert_eq!(feeds.len(), 2);
    assert!(feeds.iter().all(|f| f.starts_with("https://")));
}
