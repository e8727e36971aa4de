mod cache_store;
mod duration_probe;
mod fs_helpers;
mod media_tool;
mod path_hasher;
mod thumbnail_extractor;
mod timestamp_sampler;
mod video_scanner;

pub use cache_store::{CacheManifest, CacheStore};
pub use duration_probe::{PROBE_TIMEOUT, get_duration, parse_duration, probe_args, probe_duration};
pub use fs_helpers::{bytes_to_mb, remove_dir_tolerant, validate_directory_exists};
pub use media_tool::{FfmpegTool, MediaTool, ToolOutput};
pub use path_hasher::path_cache_key;
pub use thumbnail_extractor::{
    CommandTrace, EXTRACTION_TIMEOUT, ExtractionStrategy, FilterMode, MIN_THUMBNAIL_BYTES,
    OutputMode, STRATEGIES, SeekPlacement, ThumbnailExtractor, ThumbnailResult, ThumbnailTask,
    create_thumbnail_tasks, thumbnail_file_name, write_placeholder,
};
pub use timestamp_sampler::{sample_timestamps, sample_timestamps_with_rng};
pub use video_scanner::{ExclusionFilter, VideoEntry, VideoScanner, scan_videos};
