//! Article generation: provider abstraction, response shaping and the
//! disabled fallback used when no API key is configured.

pub mod gemini;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::GenerationError;
use crate::ingest::types::NewsItem;

/// Long-form content derived from a news item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    pub body: String,
    pub source_item_id: String,
}

#[async_trait::async_trait]
pub trait ArticleGenerator: Send + Sync {
    async fn generate(&self, item: &NewsItem) -> Result<Article, GenerationError>;
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

pub type DynGenerator = Arc<dyn ArticleGenerator>;

/// Fails every call; used when GEMINI_API_KEY is absent.
pub struct DisabledGenerator;

#[async_trait::async_trait]
impl ArticleGenerator for DisabledGenerator {
    async fn generate(&self, _item: &NewsItem) -> Result<Article, GenerationError> {
        Err(GenerationError::NotConfigured)
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Split model output into title (first non-empty line) and body (the rest).
/// Markdown heading/emphasis markers and a leading `Title:` label are removed
/// from the title. Both parts must be non-empty.
pub fn parse_article(raw: &str, source_item_id: &str) -> Result<Article, GenerationError> {
    let text = strip_code_fence(raw.trim());
    if text.is_empty() {
        return Err(GenerationError::EmptyContent);
    }

    let mut lines = text.lines();
    let title_line = lines
        .by_ref()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default();
    let title = clean_title(title_line);
    let body = lines.collect::<Vec<_>>().join("\n").trim().to_string();

    if title.is_empty() {
        return Err(GenerationError::Malformed("missing title".into()));
    }
    if body.is_empty() {
        return Err(GenerationError::Malformed("missing body".into()));
    }

    Ok(Article {
        title,
        body,
        source_item_id: source_item_id.to_string(),
    })
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    // drop the language tag line
    let rest = rest.split_once('\n').map(|(_, r)| r).unwrap_or_default();
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn clean_title(line: &str) -> String {
    let decoration = |c: char| c == '*' || c == '_' || c == '"' || c == '「' || c == '」';
    let mut t = line.trim_start_matches('#').trim().trim_matches(decoration).trim();
    for label in ["Title:", "title:", "タイトル:", "タイトル："] {
        if let Some(rest) = t.strip_prefix(label) {
            t = rest.trim();
        }
    }
    t.trim_matches(decoration).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_becomes_title_rest_is_body() {
        let a = parse_article(
            "\n# AI Breakthrough: What It Means\n\nIntro.\n\nDetails.\n",
            "abc",
        )
        .unwrap();
        assert_eq!(a.title, "AI Breakthrough: What It Means");
        assert_eq!(a.body, "Intro.\n\nDetails.");
        assert_eq!(a.source_item_id, "abc");
    }

    #[test]
    fn labels_and_emphasis_are_removed() {
        let a = parse_article("**Title: New model**\nbody", "x").unwrap();
        assert_eq!(a.title, "New model");
        let b = parse_article("タイトル：「生成AIの最前線」\n本文", "x").unwrap();
        assert_eq!(b.title, "生成AIの最前線");
    }

    #[test]
    fn fenced_output_is_unwrapped() {
        let a = parse_article("```markdown\n# T\nB\n```", "x").unwrap();
        assert_eq!(a.title, "T");
        assert_eq!(a.body, "B");
    }

    #[test]
    fn shape_validation() {
        assert!(matches!(
            parse_article("   \n ", "x"),
            Err(GenerationError::EmptyContent)
        ));
        assert!(matches!(
            parse_article("# Only a title", "x"),
            Err(GenerationError::Malformed(_))
        ));
        assert!(matches!(
            parse_article("#\nbody", "x"),
            Err(GenerationError::Malformed(_))
        ));
    }
}
