use async_trait::async_trait;
use feed_rs::model::{Entry, Link};
use jf_core::{Error, FeedEntry, FeedReader, Result};
use reqwest::Client;
use rss::extension::Extension;
use rss::{Channel, Item};

const MEDIA_PREFIX: &str = "media";

/// Reads feeds over HTTP. RSS 2.0 documents go through `rss`, which keeps
/// dates as the text the feed published; anything else (Atom, JSON Feed,
/// RSS 1.0) falls back to feed-rs.
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn parse(body: &[u8]) -> Result<Vec<FeedEntry>> {
        match Channel::read_from(body) {
            Ok(channel) => Ok(channel.items().iter().map(rss_item_to_entry).collect()),
            Err(rss_error) => {
                tracing::debug!("Not an RSS 2.0 document ({}), trying other formats", rss_error);
                let feed = feed_rs::parser::parse(body)
                    .map_err(|e| Error::Feed(format!("Failed to parse feed: {}", e)))?;
                Ok(feed.entries.into_iter().map(to_feed_entry).collect())
            }
        }
    }
}

fn media_urls<'a>(extensions: impl Iterator<Item = &'a Extension>) -> Vec<String> {
    extensions
        .filter_map(|ext| ext.attrs().get("url"))
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .collect()
}

fn rss_item_to_entry(item: &Item) -> FeedEntry {
    let media = item.extensions().get(MEDIA_PREFIX);
    let named = |name: &str| media.and_then(|m| m.get(name)).into_iter().flatten();

    let media_content = media_urls(named("content"));
    // media:content may carry its own thumbnails as children
    let nested_thumbnails = named("content")
        .filter_map(|content| content.children().get("thumbnail"))
        .flatten();
    let media_thumbnails = media_urls(named("thumbnail").chain(nested_thumbnails));

    let published = item
        .pub_date()
        .map(str::to_string)
        .or_else(|| {
            item.dublin_core_ext()
                .and_then(|dc| dc.dates().first().cloned())
        });

    FeedEntry {
        title: item.title().map(str::to_string),
        link: item.link().map(str::to_string),
        summary: item.description().or(item.content()).map(str::to_string),
        published,
        media_content,
        media_thumbnails,
    }
}

fn is_alternate(link: &Link) -> bool {
    link.rel.as_deref().map_or(true, |rel| rel == "alternate")
}

fn to_feed_entry(entry: Entry) -> FeedEntry {
    let media_content = entry
        .media
        .iter()
        .flat_map(|media| media.content.iter())
        .filter_map(|content| content.url.as_ref().map(|url| url.to_string()))
        .collect();

    let media_thumbnails = entry
        .media
        .iter()
        .flat_map(|media| media.thumbnails.iter())
        .map(|thumbnail| thumbnail.image.uri.clone())
        .collect();

    let link = entry
        .links
        .iter()
        .find(|link| is_alternate(link))
        .or_else(|| entry.links.first())
        .map(|link| link.href.clone());

    FeedEntry {
        title: entry.title.map(|t| t.content),
        link,
        summary: entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body)),
        // feed-rs only keeps parsed timestamps
        published: entry.published.or(entry.updated).map(|at| at.to_rfc3339()),
        media_content,
        media_thumbnails,
    }
}

#[async_trait]
impl FeedReader for FeedFetcher {
    async fn read(&self, url: &str) -> Result<Vec<FeedEntry>> {
        let response = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::Feed(format!("Feed request failed: {}", e)))?;
        let body = response.bytes().await?;

        let entries = Self::parse(&body[..])?;
        tracing::debug!("Read {} entries from {}", entries.len(), url);
        Ok(entries)
    }
}
