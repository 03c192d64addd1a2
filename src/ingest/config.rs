// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const ENV_URLS: &str = "RSS_FEED_URLS";
const ENV_PATH: &str = "FEEDS_CONFIG_PATH";

/// Used when nothing is configured.
pub const DEFAULT_FEEDS: &[&str] = &[
    "https://news.google.com/rss/search?q=AI&hl=ja&gl=JP&ceid=JP:ja",
    "https://gigazine.net/news/rss_2.0/",
];

/// Load feed URLs from an explicit path. Supports TOML (`feeds = [...]`) or a JSON array.
pub fn load_feeds_from(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading feeds from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_feeds(&content, ext.as_str())
}

/// Resolve the feed list:
/// 1) $RSS_FEED_URLS (comma separated)
/// 2) $FEEDS_CONFIG_PATH
/// 3) config/feeds.toml
/// 4) config/feeds.json
/// 5) built-in defaults
pub fn load_feeds_default() -> Result<Vec<String>> {
    if let Ok(raw) = std::env::var(ENV_URLS) {
        let list = split_csv(&raw);
        if !list.is_empty() {
            return Ok(list);
        }
    }
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_feeds_from(&pb);
        } else {
            return Err(anyhow!("FEEDS_CONFIG_PATH points to non-existent path"));
        }
    }
    for candidate in ["config/feeds.toml", "config/feeds.json"] {
        let p = PathBuf::from(candidate);
        if p.exists() {
            return load_feeds_from(&p);
        }
    }
    tracing::warn!("no feeds configured, using default RSS feeds");
    Ok(DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect())
}

/// Comma-separated list, trimmed, empties dropped, order kept.
pub fn split_csv(raw: &str) -> Vec<String> {
    clean_list(raw.split(',').map(str::to_string).collect())
}

fn parse_feeds(s: &str, hint_ext: &str) -> Result<Vec<String>> {
    // Try TOML first if hinted or content looks like toml.
    let try_toml = hint_ext == "toml" || s.contains("feeds");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported feeds file format"))
}

fn parse_toml(s: &str) -> Result<Vec<String>> {
    #[derive(serde::Deserialize)]
    struct TomlFeeds {
        feeds: Vec<String>,
    }
    let v: TomlFeeds = toml::from_str(s)?;
    Ok(clean_list(v.feeds))
}

fn parse_json(s: &str) -> Result<Vec<String>> {
    let v: Vec<String> = serde_json::from_str(s)?;
    Ok(clean_list(v))
}

// Feed order matters (it is the processing order), so dedup keeps first occurrence.
fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && !out.iter().any(|o| o == t) {
            out.push(t.to_string());
        }
    }
    out
}
