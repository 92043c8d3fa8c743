use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crate::types::{Article, NewArticle};
use crate::Result;

#[async_trait]
pub trait ArticleStorage: Send + Sync {
    /// True if an article with this journal and title is already stored
    async fn exists(&self, journal: &str, title: &str) -> Result<bool>;

    /// Insert a pending article. Returns false when (journal, title) already exists
    async fn insert_if_absent(&self, article: &NewArticle) -> Result<bool>;

    /// All pending articles in ascending id order
    async fn pending(&self) -> Result<Vec<Article>>;

    /// Set the pushed marker of a pending article. Returns false if the article
    /// is missing or was already delivered; an existing marker is never touched
    async fn mark_delivered(&self, id: i64, at: DateTime<Utc>) -> Result<bool>;

    /// Every stored article in ascending id order
    async fn list(&self) -> Result<Vec<Article>>;
}
