pub mod backends;

pub use backends::*;

pub mod prelude {
    pub use super::backends::*;
    pub use jf_core::ArticleStorage;
}
