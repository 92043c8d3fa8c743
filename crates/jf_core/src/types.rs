use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Stored format of the pushed marker, always UTC.
pub const PUSHED_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_pushed_time(at: &DateTime<Utc>) -> String {
    at.format(PUSHED_TIME_FORMAT).to_string()
}

/// Decodes a stored pushed marker. Empty means the article is still pending.
pub fn parse_pushed_time(raw: Option<&str>) -> Result<DeliveryState> {
    match raw.map(str::trim) {
        None | Some("") => Ok(DeliveryState::Pending),
        Some(value) => NaiveDateTime::parse_from_str(value, PUSHED_TIME_FORMAT)
            .map(|naive| DeliveryState::Delivered {
                pushed_at: naive.and_utc(),
            })
            .map_err(|e| Error::Database(format!("Invalid pushed_time '{}': {}", value, e))),
    }
}

/// A configured feed endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub journal: String,
    pub url: String,
}

impl FeedSource {
    pub fn new(journal: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            journal: journal.into(),
            url: url.into(),
        }
    }
}

/// One entry as handed over by a feed reader, before any validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub summary: Option<String>,
    pub published: Option<String>,
    pub media_content: Vec<String>,
    pub media_thumbnails: Vec<String>,
}

impl FeedEntry {
    /// First media attachment, content before thumbnails.
    pub fn media_image(&self) -> Option<&str> {
        self.media_content
            .first()
            .or_else(|| self.media_thumbnails.first())
            .map(String::as_str)
            .filter(|url| !url.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewArticle {
    pub journal: String,
    pub title: String,
    pub link: String,
    pub summary: String,
    pub image_url: Option<String>,
    pub published_time: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryState {
    Pending,
    Delivered { pushed_at: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub journal: String,
    pub title: String,
    pub link: String,
    pub summary: String,
    pub image_url: Option<String>,
    pub published_time: String,
    pub delivery: DeliveryState,
}

impl Article {
    pub fn from_new(id: i64, article: NewArticle) -> Self {
        Self {
            id,
            journal: article.journal,
            title: article.title,
            link: article.link,
            summary: article.summary,
            image_url: article.image_url,
            published_time: article.published_time,
            delivery: DeliveryState::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.delivery, DeliveryState::Pending)
    }

    pub fn pushed_time(&self) -> Option<String> {
        match &self.delivery {
            DeliveryState::Pending => None,
            DeliveryState::Delivered { pushed_at } => Some(format_pushed_time(pushed_at)),
        }
    }

    /// Pending -> Delivered. There is no way back.
    pub fn mark_delivered(mut self, at: DateTime<Utc>) -> Result<Self> {
        if let DeliveryState::Delivered { pushed_at } = self.delivery {
            return Err(Error::InvalidTransition(format!(
                "article {} was already delivered at {}",
                self.id,
                format_pushed_time(&pushed_at)
            )));
        }
        self.delivery = DeliveryState::Delivered { pushed_at: at };
        Ok(self)
    }
}

/// Outcome of an operation allowed to degrade instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BestEffort<T> {
    Hit(T),
    Miss,
    Failed(String),
}

impl<T> BestEffort<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            BestEffort::Hit(value) => Some(value),
            BestEffort::Miss | BestEffort::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            BestEffort::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, BestEffort::Hit(_))
    }
}

impl<T> From<Option<T>> for BestEffort<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(BestEffort::Miss, BestEffort::Hit)
    }
}
