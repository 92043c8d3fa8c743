use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::FeedSource;
use crate::{Error, Result};

pub const DEFAULT_DB_PATH: &str = "math_journals.db";
pub const DEFAULT_CHAT_ID: &str = "@topmathjournals";
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TRANSLATION_MODEL: &str = "o1";
pub const DEFAULT_IMAGE_TIMEOUT_SECS: u64 = 5;

const DEFAULT_FEEDS: &[(&str, &str)] = &[
    ("Annals of Mathematics", "https://annals.math.princeton.edu/rss.xml"),
    ("JAMS", "https://www.ams.org/rss/jams.xml"),
    (
        "Inventiones Mathematicae",
        "https://link.springer.com/search.rss?facet-journal-id=222&channel-name=Inventiones+Mathematicae",
    ),
    ("Acta Mathematica", "https://www.mittag-leffler.se/rss.xml"),
];

pub fn default_feeds() -> Vec<FeedSource> {
    DEFAULT_FEEDS
        .iter()
        .map(|(journal, url)| FeedSource::new(*journal, *url))
        .collect()
}

/// Runtime settings, built once per process and handed to each job.
#[derive(Clone)]
pub struct Config {
    pub feeds: Vec<FeedSource>,
    pub db_path: PathBuf,
    pub chat_id: String,
    pub telegram_bot_token: Option<String>,
    pub telegram_api_url: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub translation_model: String,
    pub image_timeout: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("feeds", &self.feeds)
            .field("db_path", &self.db_path)
            .field("chat_id", &self.chat_id)
            .field("telegram_bot_token", &self.telegram_bot_token.as_deref().map(|_| "<redacted>"))
            .field("telegram_api_url", &self.telegram_api_url)
            .field("openai_api_key", &self.openai_api_key.as_deref().map(|_| "<redacted>"))
            .field("openai_base_url", &self.openai_base_url)
            .field("translation_model", &self.translation_model)
            .field("image_timeout", &self.image_timeout)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feeds: default_feeds(),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            chat_id: DEFAULT_CHAT_ID.to_string(),
            telegram_bot_token: None,
            telegram_api_url: DEFAULT_TELEGRAM_API_URL.to_string(),
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            translation_model: DEFAULT_TRANSLATION_MODEL.to_string(),
            image_timeout: Duration::from_secs(DEFAULT_IMAGE_TIMEOUT_SECS),
        }
    }
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let feeds = match get("JF_FEEDS_FILE") {
            Some(path) => load_feeds(Path::new(&path))?,
            None => defaults.feeds,
        };

        let image_timeout = match get("JF_IMAGE_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(raw.parse::<u64>().map_err(|e| {
                Error::Config(format!("JF_IMAGE_TIMEOUT_SECS must be a number of seconds: {}", e))
            })?),
            None => defaults.image_timeout,
        };

        Ok(Self {
            feeds,
            db_path: get("JF_DB_PATH").map(PathBuf::from).unwrap_or(defaults.db_path),
            chat_id: get("TELEGRAM_CHAT_ID").unwrap_or(defaults.chat_id),
            telegram_bot_token: get("TELEGRAM_BOT_TOKEN"),
            telegram_api_url: get("TELEGRAM_API_URL").unwrap_or(defaults.telegram_api_url),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            translation_model: get("JF_TRANSLATION_MODEL").unwrap_or(defaults.translation_model),
            image_timeout,
        })
    }

    pub fn require_telegram_token(&self) -> Result<&str> {
        self.telegram_bot_token
            .as_deref()
            .ok_or_else(|| Error::Config("TELEGRAM_BOT_TOKEN is not set".to_string()))
    }
}

/// Reads a JSON array of `{ "journal": ..., "url": ... }` objects.
pub fn load_feeds(path: &Path) -> Result<Vec<FeedSource>> {
    let raw = std::fs::read_to_string(path)?;
    let feeds: Vec<FeedSource> = serde_json::from_str(&raw)?;
    if feeds.is_empty() {
        return Err(Error::Config(format!("{} lists no feeds", path.display())));
    }
    Ok(feeds)
}
