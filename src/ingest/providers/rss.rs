// src/ingest/providers/rss.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::histogram;
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use crate::error::FetchError;
use crate::ingest::normalize_text;
use crate::ingest::types::{derive_item_id, FeedProvider, NewsItem};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    guid: Option<Guid>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Guid {
    #[serde(rename = "$text", default)]
    value: String,
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    if let Ok(odt) = OffsetDateTime::parse(ts, &Rfc2822) {
        return DateTime::from_timestamp(odt.unix_timestamp(), 0);
    }
    // obsolete zone names (GMT, EST, ...)
    DateTime::parse_from_rfc2822(ts)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// RSS 2.0 provider, reading either a live URL or an in-memory document.
pub struct RssFeedProvider {
    name: String,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        url: String,
        client: reqwest::Client,
        max_retries: u8,
    },
}

impl RssFeedProvider {
    pub fn from_fixture(name: &str, xml: &str) -> Self {
        Self {
            name: name.to_string(),
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    pub fn from_url(url: &str, client: reqwest::Client) -> Self {
        Self {
            name: url.to_string(),
            mode: Mode::Http {
                url: url.to_string(),
                client,
                max_retries: 3,
            },
        }
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        if let Mode::Http { max_retries, .. } = &mut self.mode {
            *max_retries = retries.max(1);
        }
        self
    }

    /// Parse an RSS document. Entries without a title, or without both a
    /// GUID and a link, are skipped.
    pub fn parse_items_from_str(feed: &str, s: &str) -> Result<Vec<NewsItem>, FetchError> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(s);
        let rss: Rss = from_str(&xml_clean).map_err(|e| FetchError::Parse(e.to_string()))?;
        let fetched_at = Utc::now();

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let title = normalize_text(it.title.as_deref().unwrap_or_default());
            if title.is_empty() {
                continue;
            }
            let link = it
                .link
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty());
            let guid = it
                .guid
                .map(|g| g.value.trim().to_string())
                .filter(|g| !g.is_empty());
            let Some(key) = guid.as_deref().or(link.as_deref()) else {
                tracing::debug!(feed, %title, "entry without guid or link skipped");
                continue;
            };

            out.push(NewsItem {
                id: derive_item_id(key),
                summary: normalize_text(it.description.as_deref().unwrap_or_default()),
                source_url: link.clone().unwrap_or_else(|| key.to_string()),
                feed: feed.to_string(),
                published_at: it.pub_date.as_deref().and_then(parse_rfc2822),
                fetched_at,
                title,
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("feed_parse_ms").record(ms);
        Ok(out)
    }

    async fn download(url: &str, client: &reqwest::Client, max_retries: u8) -> Result<String, FetchError> {
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let err = match client.get(url).send().await {
                Ok(rsp) if rsp.status().is_success() => return Ok(rsp.text().await?),
                Ok(rsp) if rsp.status().is_server_error() => {
                    FetchError::HttpStatus(rsp.status().as_u16())
                }
                Ok(rsp) => return Err(FetchError::HttpStatus(rsp.status().as_u16())),
                Err(e) => FetchError::Network(e),
            };
            if attempt >= max_retries {
                return Err(err);
            }
            tracing::debug!(error = %err, url, attempt, "feed download failed, backing off");
            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
        }
    }
}

#[async_trait]
impl FeedProvider for RssFeedProvider {
    async fn fetch_latest(&self) -> Result<Vec<NewsItem>, FetchError> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_items_from_str(&self.name, s),
            Mode::Http {
                url,
                client,
                max_retries,
            } => {
                let body = Self::download(url, client, *max_retries).await?;
                Self::parse_items_from_str(&self.name, &body)
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guid_wins_over_link_for_identity() {
        let xml = r#"<rss version="2.0"><channel><title>t</title>
            <item><title>A</title><link>https://e.com/a?utm=1</link>
              <guid isPermaLink="false">tag:e.com,2024:a</guid></item>
            <item><title>B</title><link>https://e.com/b</link></item>
            </channel></rss>"#;
        let items = RssFeedProvider::parse_items_from_str("t", xml).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, derive_item_id("tag:e.com,2024:a"));
        assert_eq!(items[0].source_url, "https://e.com/a?utm=1");
        assert_eq!(items[1].id, derive_item_id("https://e.com/b"));
    }

    #[test]
    fn entries_without_identity_or_title_are_skipped() {
        let xml = r#"<rss><channel>
            <item><title>No link</title></item>
            <item><link>https://e.com/untitled</link></item>
            <item><title>Ok</title><link>https://e.com/ok</link></item>
            </channel></rss>"#;
        let items = RssFeedProvider::parse_items_from_str("t", xml).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Ok");
    }

    #[test]
    fn pub_date_parses_rfc2822() {
        let dt = parse_rfc2822("Tue, 10 Jun 2025 08:30:00 GMT").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-06-10T08:30:00+00:00");
        assert!(parse_rfc2822("yesterday").is_none());
    }

    #[test]
    fn empty_channel_is_not_an_error() {
        let items = RssFeedProvider::parse_items_from_str("t", "<rss><channel></channel></rss>")
            .unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = RssFeedProvider::parse_items_from_str("t", "<html><body>").unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }
}
