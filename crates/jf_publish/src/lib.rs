pub mod message;
pub mod publisher;
pub mod telegram;
pub mod translate;

pub use message::{compose_message, normalize_summary};
pub use publisher::{PublishReport, Publisher};
pub use telegram::TelegramMessenger;
pub use translate::OpenAiTranslator;

pub mod prelude {
    pub use super::publisher::{PublishReport, Publisher};
    pub use jf_core::{Article, Error, Result};
}
