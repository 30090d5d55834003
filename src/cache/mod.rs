//! On-disk image cache + bootloader registry (§4.E).

pub mod bootloader;
pub mod store;

pub use store::ImageCache;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("index capacity exceeded")]
    IndexSizeExceeded,
    #[error("cache entry already exists")]
    EntryExists,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
