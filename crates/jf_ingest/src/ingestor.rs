use std::sync::Arc;

use jf_core::http::build_client;
use jf_core::logging::Logger;
use jf_core::{
    ArticleStorage, BestEffort, Config, Error, FeedEntry, FeedReader, FeedSource, ImageResolver,
    NewArticle, Result,
};

use crate::feed::FeedFetcher;
use crate::image::PageImageResolver;
use crate::markdown::html_to_markdown;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    New,
    Duplicate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceReport {
    pub journal: String,
    pub new: usize,
    pub duplicates: usize,
    pub failed_entries: usize,
}

#[derive(Debug, Default)]
pub struct IngestReport {
    pub sources: Vec<SourceReport>,
    /// (journal, reason) for every feed that could not be read
    pub failed_sources: Vec<(String, String)>,
}

impl IngestReport {
    pub fn new_articles(&self) -> usize {
        self.sources.iter().map(|s| s.new).sum()
    }
}

/// Pulls configured feeds and stores entries it has not seen before.
pub struct Ingestor {
    storage: Arc<dyn ArticleStorage>,
    reader: Arc<dyn FeedReader>,
    images: Arc<dyn ImageResolver>,
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Feed(format!("entry has no {}", field)))
}

impl Ingestor {
    pub fn new(
        storage: Arc<dyn ArticleStorage>,
        reader: Arc<dyn FeedReader>,
        images: Arc<dyn ImageResolver>,
    ) -> Self {
        Self {
            storage,
            reader,
            images,
        }
    }

    /// Wires the HTTP feed reader and page image resolver from `config`.
    pub fn from_config(storage: Arc<dyn ArticleStorage>, config: &Config) -> Result<Self> {
        let client = build_client()?;
        Ok(Self::new(
            storage,
            Arc::new(FeedFetcher::new(client.clone())),
            Arc::new(PageImageResolver::new(client, config.image_timeout)),
        ))
    }

    /// Processes every source in order. A failing source is logged and
    /// recorded, never propagated.
    pub async fn run(&self, sources: &[FeedSource]) -> IngestReport {
        let mut report = IngestReport::default();

        for source in sources {
            let logger = Logger::new().with_new_prefixes(format!("[{}]", source.journal));
            logger.info("fetching rss feed");

            match self.ingest_source(source, &logger).await {
                Ok(source_report) => {
                    logger.info(&format!(
                        "{} new, {} already stored, {} failed",
                        source_report.new, source_report.duplicates, source_report.failed_entries
                    ));
                    report.sources.push(source_report);
                }
                Err(e) => {
                    logger.error(&format!("fetch rss feed failed: {}", e));
                    report.failed_sources.push((source.journal.clone(), e.to_string()));
                }
            }
        }

        report
    }

    pub async fn ingest_source(&self, source: &FeedSource, logger: &Logger) -> Result<SourceReport> {
        let entries = self.reader.read(&source.url).await?;
        let mut report = SourceReport {
            journal: source.journal.clone(),
            ..Default::default()
        };

        for entry in entries {
            match self.ingest_entry(&source.journal, entry, logger).await {
                Ok(EntryStatus::New) => report.new += 1,
                Ok(EntryStatus::Duplicate) => report.duplicates += 1,
                Err(e) => {
                    logger.error(&format!("deal entry failed: {}", e));
                    report.failed_entries += 1;
                }
            }
        }

        Ok(report)
    }

    pub async fn ingest_entry(&self, journal: &str, entry: FeedEntry, logger: &Logger) -> Result<EntryStatus> {
        let title = required(entry.title.clone(), "title")?;
        let link = required(entry.link.clone(), "link")?;
        // kept as the feed wrote it, parseable or not
        let published_time = entry
            .published
            .clone()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| Error::Feed("entry has no published time".to_string()))?;
        let raw_summary = entry.summary.as_deref().map(str::trim).unwrap_or_default();

        if self.storage.exists(journal, &title).await? {
            logger.debug(&format!("skipping known article {}", title));
            return Ok(EntryStatus::Duplicate);
        }

        logger.info(&format!("{} ({})", title, published_time));
        let summary = html_to_markdown(raw_summary);

        let image = self.resolve_image(&entry, &link, logger).await;
        if let Some(reason) = image.failure() {
            logger.warn(&format!("no image for {}: {}", title, reason));
        }
        let image_url = image.into_option();
        logger.info(&format!("image_url: {}", image_url.as_deref().unwrap_or("none")));

        let article = NewArticle {
            journal: journal.to_string(),
            title,
            link,
            summary,
            image_url,
            published_time,
        };

        if self.storage.insert_if_absent(&article).await? {
            Ok(EntryStatus::New)
        } else {
            logger.warn(&format!("{} was stored concurrently, ignoring", article.title));
            Ok(EntryStatus::Duplicate)
        }
    }

    /// Feed media first; otherwise scrape the article page.
    pub async fn resolve_image(&self, entry: &FeedEntry, link: &str, logger: &Logger) -> BestEffort<String> {
        if let Some(url) = entry.media_image() {
            return BestEffort::Hit(url.to_string());
        }
        logger.info(&format!("no image in feed, extracting from {}", link));
        self.images.resolve(link).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use jf_storage::InMemoryStorage;
    use reqwest::Client;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct StaticFeeds {
        feeds: HashMap<String, Vec<FeedEntry>>,
    }

    impl StaticFeeds {
        fn with(mut self, url: &str, entries: Vec<FeedEntry>) -> Self {
            self.feeds.insert(url.to_string(), entries);
            self
        }
    }

    #[async_trait]
    impl FeedReader for StaticFeeds {
        async fn read(&self, url: &str) -> Result<Vec<FeedEntry>> {
            self.feeds
                .get(url)
                .cloned()
                .ok_or_else(|| Error::Feed(format!("connection refused: {}", url)))
        }
    }

    struct CountingImages {
        outcome: BestEffort<String>,
        calls: AtomicUsize,
    }

    impl CountingImages {
        fn new(outcome: BestEffort<String>) -> Self {
            Self {
                outcome,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ImageResolver for CountingImages {
        async fn resolve(&self, _page_url: &str) -> BestEffort<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    fn entry(title: &str, link: &str) -> FeedEntry {
        FeedEntry {
            title: Some(title.to_string()),
            link: Some(link.to_string()),
            summary: Some("<p>We study <em>things</em>.</p>".to_string()),
            published: Some("Wed, 10 Jan 2024 10:00:00 +0000".to_string()),
            ..Default::default()
        }
    }

    fn ingestor(
        storage: &InMemoryStorage,
        feeds: StaticFeeds,
        images: Arc<CountingImages>,
    ) -> Ingestor {
        Ingestor::new(Arc::new(storage.clone()), Arc::new(feeds), images)
    }

    #[tokio::test]
    async fn test_new_entry_is_stored_pending_with_scraped_image() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<img src="/logo.png" width="80" height="40"><img src="/fig1.png" width="640" height="480">"#,
            ))
            .mount(&server)
            .await;

        let link = format!("{}/1", server.uri());
        let mut foo = entry("Foo Bar", &link);
        foo.summary = None;
        let feeds = StaticFeeds::default().with("https://feeds/jams", vec![foo]);

        let storage = InMemoryStorage::new();
        let ingestor = Ingestor::new(
            Arc::new(storage.clone()),
            Arc::new(feeds),
            Arc::new(PageImageResolver::new(Client::new(), Duration::from_secs(5))),
        );

        let report = ingestor.run(&[FeedSource::new("JAMS", "https://feeds/jams")]).await;
        assert_eq!(report.new_articles(), 1);

        let stored = storage.list().await.unwrap();
        assert_eq!(stored.len(), 1);
        let article = &stored[0];
        assert!(article.is_pending());
        assert_eq!(article.journal, "JAMS");
        assert_eq!(article.title, "Foo Bar");
        assert_eq!(article.link, link);
        assert_eq!(article.summary, "");
        assert_eq!(article.image_url, Some(format!("{}/fig1.png", server.uri())));
    }

    #[tokio::test]
    async fn test_second_run_adds_nothing() {
        let storage = InMemoryStorage::new();
        let images = Arc::new(CountingImages::new(BestEffort::Miss));
        let feeds = StaticFeeds::default().with(
            "https://feeds/acta",
            vec![entry("A", "https://x/a"), entry(" A ", "https://x/a2"), entry("B", "https://x/b")],
        );
        let ingestor = ingestor(&storage, feeds, images.clone());
        let sources = [FeedSource::new("Acta Mathematica", "https://feeds/acta")];

        let first = ingestor.run(&sources).await;
        assert_eq!(first.sources[0].new, 2);
        assert_eq!(first.sources[0].duplicates, 1);

        let second = ingestor.run(&sources).await;
        assert_eq!(second.new_articles(), 0);
        assert_eq!(second.sources[0].duplicates, 3);

        let stored = storage.list().await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].summary, "We study *things*.");
        // duplicates are detected before any image lookup
        assert_eq!(images.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failing_source_does_not_stop_others() {
        let storage = InMemoryStorage::new();
        let feeds = StaticFeeds::default().with("https://feeds/b", vec![entry("Only", "https://x/only")]);
        let ingestor = ingestor(&storage, feeds, Arc::new(CountingImages::new(BestEffort::Miss)));

        let report = ingestor
            .run(&[
                FeedSource::new("Source A", "https://feeds/a"),
                FeedSource::new("Source B", "https://feeds/b"),
            ])
            .await;

        assert_eq!(report.failed_sources.len(), 1);
        assert_eq!(report.failed_sources[0].0, "Source A");
        assert_eq!(report.new_articles(), 1);

        let stored = storage.list().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].journal, "Source B");
    }

    #[tokio::test]
    async fn test_bad_entry_does_not_stop_feed() {
        let storage = InMemoryStorage::new();
        let mut no_link = entry("Broken", "");
        no_link.link = None;
        let mut no_date = entry("Undated", "https://x/undated");
        no_date.published = None;
        let feeds = StaticFeeds::default().with(
            "https://feeds/annals",
            vec![no_link, no_date, entry("Good", "https://x/good")],
        );
        let ingestor = ingestor(&storage, feeds, Arc::new(CountingImages::new(BestEffort::Miss)));

        let report = ingestor
            .run(&[FeedSource::new("Annals of Mathematics", "https://feeds/annals")])
            .await;

        assert_eq!(report.sources[0].failed_entries, 2);
        assert_eq!(report.sources[0].new, 1);
        let stored = storage.list().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].title, "Good");
    }

    #[tokio::test]
    async fn test_published_time_is_stored_as_given() {
        let storage = InMemoryStorage::new();
        let mut loose = entry("Loose date", "https://x/loose");
        loose.published = Some("10 January 2024".to_string());
        let feeds = StaticFeeds::default().with("https://feeds/jams", vec![loose]);
        let ingestor = ingestor(&storage, feeds, Arc::new(CountingImages::new(BestEffort::Miss)));

        let report = ingestor.run(&[FeedSource::new("JAMS", "https://feeds/jams")]).await;
        assert_eq!(report.sources[0].failed_entries, 0);
        assert_eq!(storage.list().await.unwrap()[0].published_time, "10 January 2024");
    }

    #[tokio::test]
    async fn test_feed_media_wins_over_scraping() {
        let storage = InMemoryStorage::new();
        let images = Arc::new(CountingImages::new(BestEffort::Hit("https://scraped/x.png".to_string())));
        let mut with_media = entry("Illustrated", "https://x/ill");
        with_media.media_thumbnails = vec!["https://media/thumb.png".to_string()];
        let feeds = StaticFeeds::default().with("https://feeds/inv", vec![with_media]);
        let ingestor = ingestor(&storage, feeds, images.clone());

        ingestor.run(&[FeedSource::new("Inventiones Mathematicae", "https://feeds/inv")]).await;

        let stored = storage.list().await.unwrap();
        assert_eq!(stored[0].image_url.as_deref(), Some("https://media/thumb.png"));
        assert_eq!(images.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_image_failure_degrades_to_none() {
        let storage = InMemoryStorage::new();
        let images = Arc::new(CountingImages::new(BestEffort::Failed("timed out".to_string())));
        let feeds = StaticFeeds::default().with("https://feeds/jams", vec![entry("Slow page", "https://x/slow")]);
        let ingestor = ingestor(&storage, feeds, images.clone());

        let logger = Logger::new();
        let outcome = ingestor
            .resolve_image(&entry("Slow page", "https://x/slow"), "https://x/slow", &logger)
            .await;
        assert_eq!(outcome.failure(), Some("timed out"));

        let report = ingestor.run(&[FeedSource::new("JAMS", "https://feeds/jams")]).await;
        assert_eq!(report.new_articles(), 1);
        assert_eq!(storage.list().await.unwrap()[0].image_url, None);
    }
}
