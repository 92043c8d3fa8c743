use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jf_core::{Article, ArticleStorage, NewArticle, Result};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryStore {
    articles: Vec<Article>,
    next_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            articles: Vec::new(),
            next_id: 1,
        }
    }

    pub fn exists(&self, journal: &str, title: &str) -> bool {
        self.articles
            .iter()
            .any(|a| a.journal == journal && a.title == title)
    }

    pub fn insert_if_absent(&mut self, article: &NewArticle) -> bool {
        if self.exists(&article.journal, &article.title) {
            return false;
        }
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        self.articles.push(Article::from_new(id, article.clone()));
        true
    }

    pub fn mark_delivered(&mut self, id: i64, at: DateTime<Utc>) -> bool {
        let Some(slot) = self.articles.iter_mut().find(|a| a.id == id) else {
            return false;
        };
        match slot.clone().mark_delivered(at) {
            Ok(delivered) => {
                *slot = delivered;
                true
            }
            Err(_) => false,
        }
    }
}

/// Store kept entirely in memory; same semantics as the SQLite backend.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(MemoryStore::new())),
        }
    }
}

#[async_trait]
impl ArticleStorage for InMemoryStorage {
    async fn exists(&self, journal: &str, title: &str) -> Result<bool> {
        Ok(self.store.read().await.exists(journal, title))
    }

    async fn insert_if_absent(&self, article: &NewArticle) -> Result<bool> {
        Ok(self.store.write().await.insert_if_absent(article))
    }

    async fn pending(&self) -> Result<Vec<Article>> {
        let store = self.store.read().await;
        Ok(store.articles.iter().filter(|a| a.is_pending()).cloned().collect())
    }

    async fn mark_delivered(&self, id: i64, at: DateTime<Utc>) -> Result<bool> {
        Ok(self.store.write().await.mark_delivered(id, at))
    }

    async fn list(&self) -> Result<Vec<Article>> {
        Ok(self.store.read().await.articles.clone())
    }
}
