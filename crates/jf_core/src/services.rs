use async_trait::async_trait;
use crate::types::{BestEffort, FeedEntry};
use crate::Result;

#[async_trait]
pub trait FeedReader: Send + Sync {
    /// Fetch and parse the feed at `url`
    async fn read(&self, url: &str) -> Result<Vec<FeedEntry>>;
}

#[async_trait]
pub trait ImageResolver: Send + Sync {
    /// Find a representative image on the page at `page_url`
    async fn resolve(&self, page_url: &str) -> BestEffort<String>;
}

#[async_trait]
pub trait Translator: Send + Sync {
    fn name(&self) -> &str;

    async fn translate(&self, text: &str) -> Result<String>;
}

#[async_trait]
pub trait Messenger: Send + Sync {
    /// Deliver markdown-formatted text to `chat_id`
    async fn send_markdown(&self, chat_id: &str, text: &str) -> Result<()>;
}
