use std::sync::Arc;

use chrono::Utc;
use jf_core::http::build_client;
use jf_core::types::format_pushed_time;
use jf_core::{ArticleStorage, BestEffort, Config, Messenger, Result, Translator};

use crate::message::compose_message;
use crate::telegram::TelegramMessenger;
use crate::translate::OpenAiTranslator;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub untranslated: usize,
}

/// Delivers pending articles one at a time and records each delivery.
pub struct Publisher {
    storage: Arc<dyn ArticleStorage>,
    translator: Arc<dyn Translator>,
    messenger: Arc<dyn Messenger>,
    chat_id: String,
}

impl Publisher {
    pub fn new(
        storage: Arc<dyn ArticleStorage>,
        translator: Arc<dyn Translator>,
        messenger: Arc<dyn Messenger>,
        chat_id: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            translator,
            messenger,
            chat_id: chat_id.into(),
        }
    }

    /// Wires the OpenAI translator and Telegram messenger from `config`.
    pub fn from_config(storage: Arc<dyn ArticleStorage>, config: &Config) -> Result<Self> {
        let client = build_client()?;
        let messenger = TelegramMessenger::from_config(client.clone(), config)?;
        let translator = OpenAiTranslator::from_config(client, config);
        Ok(Self::new(
            storage,
            Arc::new(translator),
            Arc::new(messenger),
            config.chat_id.clone(),
        ))
    }

    pub async fn translate_title(&self, title: &str) -> BestEffort<String> {
        match self.translator.translate(title).await {
            Ok(translated) => BestEffort::Hit(translated),
            Err(e) => {
                let reason = format!("failed to translate title with {}: {}", self.translator.name(), e);
                tracing::error!("{}", reason);
                BestEffort::Failed(reason)
            }
        }
    }

    /// A delivery error aborts the run; articles already sent keep their marker.
    pub async fn run(&self) -> Result<PublishReport> {
        let articles = self.storage.pending().await?;
        let mut report = PublishReport::default();

        if articles.is_empty() {
            tracing::info!("no new articles to push");
            return Ok(report);
        }

        for article in articles {
            tracing::info!("pushing {}", article.title);

            let translated = self.translate_title(&article.title).await;
            if !translated.is_hit() {
                report.untranslated += 1;
            }
            let translated = translated.into_option();

            let message = compose_message(&article, translated.as_deref());
            self.messenger.send_markdown(&self.chat_id, &message).await?;

            let pushed_at = Utc::now();
            if self.storage.mark_delivered(article.id, pushed_at).await? {
                tracing::info!("pushed {} at {}", article.title, format_pushed_time(&pushed_at));
            } else {
                tracing::warn!("article {} was already marked as pushed", article.id);
            }
            report.delivered += 1;
        }

        Ok(report)
    }
}
