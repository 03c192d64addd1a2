// src/publish/session.rs
//! Capability interface for platforms that only accept posts from a logged-in
//! session, plus the publisher that drives one such session.

use tokio::sync::Mutex;

use super::PrimaryPublisher;
use crate::error::{AuthError, PrimaryPublishError};
use crate::generate::Article;

#[async_trait::async_trait]
pub trait PostingSession: Send {
    async fn login(&mut self) -> Result<(), AuthError>;
    /// Submit and publish; returns the public URL of the post.
    async fn submit_post(&mut self, article: &Article) -> Result<String, PrimaryPublishError>;
    fn is_logged_in(&self) -> bool;
    /// Forget the current login so the next call signs in again.
    fn invalidate(&mut self);
    fn platform(&self) -> &'static str;
}

/// Owns exactly one session; the mutex keeps a single operation in flight.
pub struct SessionPublisher<S> {
    session: Mutex<S>,
    name: &'static str,
}

impl<S: PostingSession> SessionPublisher<S> {
    pub fn new(session: S) -> Self {
        let name = session.platform();
        Self {
            session: Mutex::new(session),
            name,
        }
    }
}

#[async_trait::async_trait]
impl<S: PostingSession + 'static> PrimaryPublisher for SessionPublisher<S> {
    async fn publish(&self, article: &Article) -> Result<String, PrimaryPublishError> {
        let mut session = self.session.lock().await;
        if !session.is_logged_in() {
            tracing::info!(platform = self.name, "signing in");
            session.login().await?;
        }
        match session.submit_post(article).await {
            Ok(url) => {
                tracing::info!(platform = self.name, %url, title = %article.title, "article published");
                Ok(url)
            }
            Err(e) => {
                if e.is_auth() {
                    session.invalidate();
                }
                Err(e)
            }
        }
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
