// src/publish/note.rs
//! note has no public posting API. This session signs in with the account's
//! email/password, keeps the session cookie in reqwest's jar, then creates a
//! draft and publishes it through the same endpoints the web editor uses.

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::session::PostingSession;
use crate::error::{AuthError, PrimaryPublishError, SubmissionError};
use crate::generate::Article;

pub const DEFAULT_NOTE_BASE_URL: &str = "https://note.com";

pub struct NoteSession {
    http: reqwest::Client,
    base_url: String,
    email: String,
    password: SecretString,
    urlname: Option<String>,
    logged_in: bool,
}

impl NoteSession {
    /// The client must keep its cookie jar: sign-in state lives there.
    pub fn new(
        email: &str,
        password: SecretString,
        timeout_secs: u64,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: build_http(timeout_secs)?,
            base_url: DEFAULT_NOTE_BASE_URL.to_string(),
            email: email.to_string(),
            password,
            urlname: None,
            logged_in: false,
        })
    }

    pub fn with_base_url(mut self, base: &str) -> Self {
        self.base_url = base.trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn public_url(&self, key: &str) -> String {
        match &self.urlname {
            Some(user) => format!("{}/{}/n/{}", self.base_url, user, key),
            None => format!("{}/n/{}", self.base_url, key),
        }
    }
}

fn build_http(timeout_secs: u64) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .cookie_store(true)
        .user_agent(concat!("ai-news-publisher/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}

#[derive(Deserialize)]
struct SignInResp {
    data: Option<SignInData>,
}
#[derive(Deserialize)]
struct SignInData {
    urlname: Option<String>,
}

#[derive(Deserialize)]
struct DraftResp {
    data: DraftData,
}
#[derive(Deserialize)]
struct DraftData {
    id: u64,
    key: String,
}

#[derive(Deserialize)]
struct PublishResp {
    data: Option<PublishData>,
}
#[derive(Deserialize)]
struct PublishData {
    note_url: Option<String>,
}

/// Paragraphs (blank-line separated) become `<p>`, markdown headings `<h3>`;
/// all text is HTML-escaped.
pub fn body_to_html(body: &str) -> String {
    let mut out = String::with_capacity(body.len() + 64);
    for block in body.split("\n\n").map(str::trim).filter(|b| !b.is_empty()) {
        if block.starts_with('#') && !block.contains('\n') {
            let text = block.trim_start_matches('#').trim();
            out.push_str("<h3>");
            out.push_str(&html_escape::encode_text(text));
            out.push_str("</h3>");
            continue;
        }
        let lines: Vec<String> = block
            .lines()
            .map(|l| html_escape::encode_text(l.trim()).to_string())
            .collect();
        out.push_str("<p>");
        out.push_str(&lines.join("<br>"));
        out.push_str("</p>");
    }
    out
}

async fn rejection(resp: reqwest::Response) -> PrimaryPublishError {
    let status = resp.status();
    let message = resp.text().await.unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return AuthError(format!("session rejected with status {}", status.as_u16())).into();
    }
    SubmissionError::Rejected {
        status: status.as_u16(),
        message: message.chars().take(300).collect(),
    }
    .into()
}

fn transport(e: reqwest::Error) -> PrimaryPublishError {
    if e.is_timeout() {
        SubmissionError::Timeout.into()
    } else {
        SubmissionError::Other(e.to_string()).into()
    }
}

#[async_trait::async_trait]
impl PostingSession for NoteSession {
    async fn login(&mut self) -> Result<(), AuthError> {
        let resp = self
            .http
            .post(self.url("/api/v1/sessions/sign_in"))
            .json(&json!({
                "login": self.email,
                "password": self.password.expose_secret(),
            }))
            .send()
            .await
            .map_err(|e| AuthError(format!("sign-in request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AuthError(format!(
                "sign-in rejected with status {}",
                status.as_u16()
            )));
        }
        let body: SignInResp = resp
            .json()
            .await
            .map_err(|e| AuthError(format!("unexpected sign-in response: {e}")))?;
        let Some(data) = body.data else {
            return Err(AuthError("sign-in response carried no session".into()));
        };
        self.urlname = data.urlname.filter(|u| !u.is_empty());
        self.logged_in = true;
        tracing::info!(urlname = ?self.urlname, "note session established");
        Ok(())
    }

    async fn submit_post(&mut self, article: &Article) -> Result<String, PrimaryPublishError> {
        let html = body_to_html(&article.body);

        let resp = self
            .http
            .post(self.url("/api/v1/text_notes"))
            .json(&json!({
                "name": article.title,
                "body": html,
                "template_key": null,
            }))
            .send()
            .await
            .map_err(transport)?;
        if !resp.status().is_success() {
            return Err(rejection(resp).await);
        }
        let draft: DraftResp = resp
            .json()
            .await
            .map_err(|e| SubmissionError::Other(format!("unexpected draft response: {e}")))?;
        tracing::debug!(draft_id = draft.data.id, key = %draft.data.key, "note draft created");

        let resp = self
            .http
            .put(self.url(&format!("/api/v1/text_notes/{}", draft.data.id)))
            .json(&json!({
                "name": article.title,
                "body": html,
                "status": "published",
            }))
            .send()
            .await
            .map_err(transport)?;
        if !resp.status().is_success() {
            return Err(rejection(resp).await);
        }
        let published: PublishResp = resp.json().await.unwrap_or(PublishResp { data: None });

        Ok(published
            .data
            .and_then(|d| d.note_url)
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| self.public_url(&draft.data.key)))
    }

    fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    fn invalidate(&mut self) {
        self.logged_in = false;
    }

    fn platform(&self) -> &'static str {
        "note"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_html_escapes_and_structures() {
        let html = body_to_html("## Intro\n\nA <b> & C\nnext line\n\n\nEnd");
        assert_eq!(
            html,
            "<h3>Intro</h3><p>A &lt;b&gt; &amp; C<br>next line</p><p>End</p>"
        );
    }

    #[test]
    fn public_url_uses_urlname_when_known() {
        let mut s = NoteSession::new("a@b.c", SecretString::from("pw".to_string()), 5)
            .expect("http client")
            .with_base_url("https://note.example/");
        assert_eq!(s.public_url("n1"), "https://note.example/n/n1");
        s.urlname = Some("writer".into());
        assert_eq!(s.public_url("n1"), "https://note.example/writer/n/n1");
    }
}
