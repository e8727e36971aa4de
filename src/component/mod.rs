//! 功能元件模組
//!
//! 每個子模組實現一個獨立的功能，包含主要邏輯和專用工具

pub mod cache_cleaner;
pub mod thumbnail_cache;

pub use cache_cleaner::CacheCleaner;
pub use thumbnail_cache::ThumbnailCacheGenerator;
