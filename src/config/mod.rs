pub mod load;
pub mod save;
pub mod types;

pub use types::{
    CacheKeying, Config, DEFAULT_CACHE_DIR_NAME, Distribution, GenerationParameters, Language,
    MAX_QUALITY, MAX_RECENT_PATHS, MIN_QUALITY, ScanOptions, UserSettings, resolve_cache_root,
};
