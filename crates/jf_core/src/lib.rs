pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod services;
pub mod storage;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use services::{FeedReader, ImageResolver, Messenger, Translator};
pub use storage::ArticleStorage;
pub use types::{Article, BestEffort, DeliveryState, FeedEntry, FeedSource, NewArticle};

pub mod prelude {
    pub use super::{
        Article, ArticleStorage, BestEffort, Config, DeliveryState, Error, FeedEntry,
        FeedReader, FeedSource, ImageResolver, Messenger, NewArticle, Result, Translator,
    };
}
