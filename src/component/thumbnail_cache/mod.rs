//! 影片縮圖快取元件
//!
//! 批次流程：
//! 1. 掃描資料夾（大小、時長、排除規則）
//! 2. 檢查快取是否仍符合目前的產生參數
//! 3. 讀取時長並依分布取樣時間點
//! 4. 依序擷取縮圖（多種命令變體，全部失敗時使用替代圖）
//! 5. 寫入快取 manifest

mod batch_coordinator;
mod main;

pub use batch_coordinator::{
    BatchCallbacks, BatchCoordinator, BatchEvent, BatchHandle, BatchState, DEFAULT_CONCURRENCY,
    VideoThumbnails, dispatch_events,
};
pub use main::{GenerationSummary, ThumbnailCacheGenerator};
