pub mod feed;
pub mod image;
pub mod ingestor;
pub mod markdown;

pub use feed::FeedFetcher;
pub use image::{select_image, PageImageResolver};
pub use ingestor::{EntryStatus, IngestReport, Ingestor, SourceReport};
pub use markdown::html_to_markdown;

pub mod prelude {
    pub use super::ingestor::{IngestReport, Ingestor};
    pub use jf_core::{FeedSource, Result, Error};
}
