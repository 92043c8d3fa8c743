use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jf_core::types::{format_pushed_time, parse_pushed_time};
use jf_core::{Article, ArticleStorage, Error, NewArticle, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqliteRow};
use sqlx::Row;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        journal TEXT,
        title TEXT,
        link TEXT,
        summary TEXT,
        image_url TEXT,
        published_time TEXT,
        pushed_time TEXT
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_articles_journal_title
    ON articles (journal, title)
    "#,
];

const SELECT_COLUMNS: &str =
    "SELECT id, journal, title, link, summary, image_url, published_time, pushed_time FROM articles";

const PENDING_FILTER: &str = "(pushed_time = '' OR pushed_time IS NULL)";

pub struct SQLiteStorage {
    pool: Arc<SqlitePool>,
    db_path: PathBuf,
}

impl SQLiteStorage {
    /// Opens (and creates if needed) the database file, then applies the schema.
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| Error::Database(format!("Failed to connect to database: {}", e)))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Database(format!("Failed to run migration {}: {}", i, e)))?;
        }

        tracing::debug!("Opened article store at {}", db_path.display());

        Ok(Self {
            pool: Arc::new(pool),
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn get_db_path(&self) -> &PathBuf {
        &self.db_path
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn select(&self, filter: Option<&str>) -> Result<Vec<Article>> {
        let query = match filter {
            Some(filter) => format!("{} WHERE {} ORDER BY id ASC", SELECT_COLUMNS, filter),
            None => format!("{} ORDER BY id ASC", SELECT_COLUMNS),
        };

        let rows = sqlx::query(&query)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to load articles: {}", e)))?;

        rows.iter().map(row_to_article).collect()
    }
}

fn row_to_article(row: &SqliteRow) -> Result<Article> {
    let get_text = |column: &str| -> Result<Option<String>> {
        row.try_get::<Option<String>, _>(column)
            .map_err(|e| Error::Database(format!("Failed to read column {}: {}", column, e)))
    };

    let id: i64 = row
        .try_get("id")
        .map_err(|e| Error::Database(format!("Failed to read column id: {}", e)))?;

    Ok(Article {
        id,
        journal: get_text("journal")?.unwrap_or_default(),
        title: get_text("title")?.unwrap_or_default(),
        link: get_text("link")?.unwrap_or_default(),
        summary: get_text("summary")?.unwrap_or_default(),
        image_url: get_text("image_url")?.filter(|url| !url.is_empty()),
        published_time: get_text("published_time")?.unwrap_or_default(),
        delivery: parse_pushed_time(get_text("pushed_time")?.as_deref())?,
    })
}

#[async_trait]
impl ArticleStorage for SQLiteStorage {
    async fn exists(&self, journal: &str, title: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE journal = ? AND title = ?")
            .bind(journal)
            .bind(title)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to check for existing article: {}", e)))?;

        Ok(count > 0)
    }

    async fn insert_if_absent(&self, article: &NewArticle) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO articles
            (journal, title, link, summary, image_url, published_time, pushed_time)
            VALUES (?, ?, ?, ?, ?, ?, '')
            "#,
        )
        .bind(&article.journal)
        .bind(&article.title)
        .bind(&article.link)
        .bind(&article.summary)
        .bind(article.image_url.as_deref())
        .bind(&article.published_time)
        .execute(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to store article: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn pending(&self) -> Result<Vec<Article>> {
        self.select(Some(PENDING_FILTER)).await
    }

    async fn mark_delivered(&self, id: i64, at: DateTime<Utc>) -> Result<bool> {
        let query = format!("UPDATE articles SET pushed_time = ? WHERE id = ? AND {}", PENDING_FILTER);
        let result = sqlx::query(&query)
            .bind(format_pushed_time(&at))
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to update pushed_time: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<Article>> {
        self.select(None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use jf_core::DeliveryState;
    use tempfile::tempdir;

    fn new_article(journal: &str, title: &str) -> NewArticle {
        NewArticle {
            journal: journal.to_string(),
            title: title.to_string(),
            link: format!("https://example.com/{}", title.replace(' ', "-")),
            summary: "### Abstract\n\nWe prove things.".to_string(),
            image_url: None,
            published_time: "Tue, 02 Jan 2024 10:00:00 +0000".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_is_idempotent() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("test.db");
        let storage = SQLiteStorage::open(&db_path).await.unwrap();

        let article = new_article("JAMS", "Foo Bar");
        assert!(!storage.exists("JAMS", "Foo Bar").await.unwrap());
        assert!(storage.insert_if_absent(&article).await.unwrap());
        assert!(storage.exists("JAMS", "Foo Bar").await.unwrap());
        assert!(!storage.insert_if_absent(&article).await.unwrap());

        // same title under another journal is a different article
        assert!(storage.insert_if_absent(&new_article("Acta Mathematica", "Foo Bar")).await.unwrap());

        let all = storage.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|a| a.is_pending()));
        assert!(all[0].id < all[1].id);
        storage.close().await;
    }

    #[tokio::test]
    async fn test_pending_and_mark_delivered() {
        let temp_dir = tempdir().unwrap();
        let storage = SQLiteStorage::open(&temp_dir.path().join("test.db")).await.unwrap();

        storage.insert_if_absent(&new_article("JAMS", "First")).await.unwrap();
        storage.insert_if_absent(&new_article("JAMS", "Second")).await.unwrap();

        let pending = storage.pending().await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].title, "First");

        let at = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        assert!(storage.mark_delivered(pending[0].id, at).await.unwrap());

        // the marker is never overwritten
        let later = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert!(!storage.mark_delivered(pending[0].id, later).await.unwrap());
        assert!(!storage.mark_delivered(9999, later).await.unwrap());

        let pending = storage.pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].title, "Second");

        let all = storage.list().await.unwrap();
        assert_eq!(all[0].delivery, DeliveryState::Delivered { pushed_at: at });
        assert_eq!(all[0].pushed_time().as_deref(), Some("2024-05-06 07:08:09"));
    }

    #[tokio::test]
    async fn test_reopen_keeps_rows() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let storage = SQLiteStorage::open(&db_path).await.unwrap();
        storage.insert_if_absent(&new_article("JAMS", "Persistent")).await.unwrap();
        storage.close().await;

        let storage = SQLiteStorage::open(&db_path).await.unwrap();
        assert!(storage.exists("JAMS", "Persistent").await.unwrap());
        assert_eq!(storage.get_db_path(), &db_path);
    }

    #[tokio::test]
    async fn test_null_pushed_time_counts_as_pending() {
        let temp_dir = tempdir().unwrap();
        let storage = SQLiteStorage::open(&temp_dir.path().join("test.db")).await.unwrap();

        sqlx::query("INSERT INTO articles (journal, title, link, summary) VALUES ('JAMS', 'Legacy', 'https://x/1', NULL)")
            .execute(&*storage.pool)
            .await
            .unwrap();

        let pending = storage.pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].summary, "");
        assert_eq!(pending[0].image_url, None);
    }
}
