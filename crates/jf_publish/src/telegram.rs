use async_trait::async_trait;
use jf_core::{Config, Error, Messenger, Result};
use reqwest::{Client, Url};
use std::fmt;
use teloxide::prelude::*;
use teloxide::types::{ParseMode, Recipient};

/// Numeric ids address a chat directly; anything else is a channel username.
pub fn recipient(chat_id: &str) -> Recipient {
    match chat_id.trim().parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) => Recipient::ChannelUsername(chat_id.trim().to_string()),
    }
}

// Messages are composed in the legacy Markdown dialect.
#[allow(deprecated)]
fn parse_mode() -> ParseMode {
    ParseMode::Markdown
}

/// Sends messages through the Telegram Bot API.
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(client: Client, api_url: &str, token: &str) -> Result<Self> {
        let api_url = Url::parse(api_url)
            .map_err(|e| Error::Config(format!("invalid Telegram API URL {}: {}", api_url, e)))?;
        Ok(Self {
            bot: Bot::with_client(token, client).set_api_url(api_url),
        })
    }

    pub fn from_config(client: Client, config: &Config) -> Result<Self> {
        let token = config.require_telegram_token()?;
        Self::new(client, &config.telegram_api_url, token)
    }

    /// Request errors can echo the method URL, which carries the token.
    fn redact(&self, message: String) -> String {
        message.replace(self.bot.token(), "<redacted>")
    }
}

impl fmt::Debug for TelegramMessenger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramMessenger")
            .field("api_url", &self.bot.api_url().as_str())
            .field("token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_markdown(&self, chat_id: &str, text: &str) -> Result<()> {
        self.bot
            .send_message(recipient(chat_id), text)
            .parse_mode(parse_mode())
            .await
            .map(|_| ())
            .map_err(|e| Error::Delivery(self.redact(format!("Telegram send failed: {}", e))))
    }
}
