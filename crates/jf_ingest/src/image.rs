use async_trait::async_trait;
use jf_core::{BestEffort, Error, ImageResolver, Result};
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

pub const MIN_WIDTH: u32 = 300;
pub const MIN_HEIGHT: u32 = 200;

/// A missing attribute counts as 0; anything present must be an integer.
fn dimension(value: Option<&str>, name: &str) -> Result<u32> {
    match value {
        None => Ok(0),
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .map_err(|_| Error::Scraping(format!("image {} {:?} is not a number", name, raw))),
    }
}

/// First `<img>` in document order that declares at least 300x200, with
/// relative sources resolved against `page_url`. Inline data URIs are skipped.
/// A malformed width or height aborts the scan.
pub fn select_image(html: &str, page_url: &str) -> Result<Option<String>> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("img").map_err(|e| Error::Scraping(format!("{:?}", e)))?;
    let base = Url::parse(page_url).ok();

    for img in document.select(&selector) {
        let element = img.value();
        let width = dimension(element.attr("width"), "width")?;
        let height = dimension(element.attr("height"), "height")?;
        if width < MIN_WIDTH || height < MIN_HEIGHT {
            continue;
        }

        let Some(src) = element.attr("src").map(str::trim).filter(|s| !s.is_empty()) else {
            continue;
        };

        if src.starts_with("data:image") {
            continue;
        }

        if src.starts_with("http") {
            return Ok(Some(src.to_string()));
        }

        match base.as_ref().map(|base| base.join(src)) {
            Some(Ok(resolved)) => return Ok(Some(resolved.to_string())),
            _ => tracing::debug!("Cannot resolve image source {} against {}", src, page_url),
        }
    }

    Ok(None)
}

/// Scrapes the article page for a representative image.
#[derive(Debug, Clone)]
pub struct PageImageResolver {
    client: Client,
    timeout: Duration,
}

impl PageImageResolver {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    async fn fetch_page(&self, page_url: &str) -> Result<String> {
        let html = self
            .client
            .get(page_url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(html)
    }
}

#[async_trait]
impl ImageResolver for PageImageResolver {
    async fn resolve(&self, page_url: &str) -> BestEffort<String> {
        match self
            .fetch_page(page_url)
            .await
            .and_then(|html| select_image(&html, page_url))
        {
            Ok(found) => found.into(),
            Err(e) => {
                let reason = format!("extract image from {} failed: {}", page_url, e);
                tracing::error!("{}", reason);
                BestEffort::Failed(reason)
            }
        }
    }
}
