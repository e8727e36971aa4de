//! 快取清理元件
//!
//! 刪除選取的影片與其縮圖快取，或清空整個快取根目錄。

mod main;

pub use main::{CacheCleaner, PurgeResult, purge_videos};
