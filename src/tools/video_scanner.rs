use crate::config::{DEFAULT_CACHE_DIR_NAME, ScanOptions};
use crate::tools::duration_probe::{PROBE_TIMEOUT, parse_duration, probe_args};
use crate::tools::fs_helpers::{bytes_to_mb, validate_directory_exists};
use crate::tools::media_tool::MediaTool;
use anyhow::Result;
use log::{debug, info, trace, warn};
use rayon::prelude::*;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;
use walkdir::{DirEntry, WalkDir};

/// 掃描結果：影片路徑與前端顯示/排序用的資訊
#[derive(Debug, Clone)]
pub struct VideoEntry {
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub duration_seconds: f64,
}

enum ExclusionPattern {
    Regex(Regex),
    Substring(String),
}

impl ExclusionPattern {
    fn matches(&self, target: &str) -> bool {
        match self {
            Self::Regex(regex) => regex.is_match(target),
            Self::Substring(word) => target.contains(word.as_str()),
        }
    }
}

/// 排除規則（套用在資料夾與檔案）
pub struct ExclusionFilter {
    patterns: Vec<ExclusionPattern>,
    match_full_path: bool,
}

impl ExclusionFilter {
    /// 建立排除規則；無效的正規表示式記錄後略過
    #[must_use]
    pub fn new(patterns: &[String], use_regex: bool, match_full_path: bool) -> Self {
        let patterns = patterns
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .filter_map(|p| {
                if !use_regex {
                    return Some(ExclusionPattern::Substring(p.to_string()));
                }
                match Regex::new(p) {
                    Ok(regex) => Some(ExclusionPattern::Regex(regex)),
                    Err(e) => {
                        warn!("無效的排除規則 '{p}'，略過: {e}");
                        None
                    }
                }
            })
            .collect();

        Self {
            patterns,
            match_full_path,
        }
    }

    #[must_use]
    pub fn from_options(options: &ScanOptions) -> Self {
        Self::new(
            &options.excluded_patterns,
            options.use_regex,
            options.match_full_path,
        )
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    #[must_use]
    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let target = if self.match_full_path {
            path.to_string_lossy()
        } else {
            path.file_name()
                .map_or_else(|| path.to_string_lossy(), |name| name.to_string_lossy())
        };
        self.patterns.iter().any(|p| p.matches(&target))
    }
}

/// 影片掃描器
///
/// 遞迴走訪資料夾，略過快取資料夾與符合排除規則的項目，
/// 再以外部工具確認檔案是可讀取時長的影片。
pub struct VideoScanner<'a> {
    tool: &'a dyn MediaTool,
    options: &'a ScanOptions,
    exclusion: ExclusionFilter,
    pruned_dir_names: Vec<String>,
}

impl<'a> VideoScanner<'a> {
    #[must_use]
    pub fn new(tool: &'a dyn MediaTool, options: &'a ScanOptions) -> Self {
        Self {
            tool,
            options,
            exclusion: ExclusionFilter::from_options(options),
            pruned_dir_names: vec![DEFAULT_CACHE_DIR_NAME.to_string()],
        }
    }

    /// 額外略過指定名稱的資料夾（例如自訂的快取資料夾）
    #[must_use]
    pub fn with_pruned_dir(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.is_empty() && !self.pruned_dir_names.contains(&name) {
            self.pruned_dir_names.push(name);
        }
        self
    }

    pub fn scan(&self, root: &Path, shutdown_signal: &AtomicBool) -> Result<Vec<VideoEntry>> {
        validate_directory_exists(root)?;
        debug!("掃描資料夾: {}", root.display());

        let candidates: Vec<DirEntry> = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !self.should_skip(entry))
            .take_while(|_| !shutdown_signal.load(Ordering::SeqCst))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!("無法讀取項目: {e}");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .collect();

        // 依走訪順序輸出（rayon 的 collect 保留順序）
        let videos: Vec<VideoEntry> = candidates
            .par_iter()
            .filter_map(|entry| {
                if shutdown_signal.load(Ordering::SeqCst) {
                    return None;
                }
                self.check_candidate(entry)
            })
            .collect();

        info!("共偵測到 {} 部影片: {}", videos.len(), root.display());
        Ok(videos)
    }

    fn should_skip(&self, entry: &DirEntry) -> bool {
        if entry.file_type().is_dir() {
            let name = entry.file_name().to_string_lossy();
            if self.pruned_dir_names.iter().any(|pruned| *pruned == name) {
                trace!("略過快取資料夾: {}", entry.path().display());
                return true;
            }
        }
        if self.exclusion.is_excluded(entry.path()) {
            debug!("符合排除規則: {}", entry.path().display());
            return true;
        }
        false
    }

    /// 大小與時長都符合條件才視為影片
    fn check_candidate(&self, entry: &DirEntry) -> Option<VideoEntry> {
        let path = entry.path();
        let metadata = entry.metadata().ok()?;
        let size = metadata.len();

        let size_mb = bytes_to_mb(size);
        if size_mb < self.options.min_size_mb {
            debug!(
                "過濾 {}: 大小 {size_mb:.2} MB < {} MB",
                path.display(),
                self.options.min_size_mb
            );
            return None;
        }

        let output = match self.tool.run(&probe_args(path), PROBE_TIMEOUT) {
            Ok(output) => output,
            Err(e) => {
                debug!("過濾 {}: 無法執行 {}: {e:#}", path.display(), self.tool.program());
                return None;
            }
        };

        let Some(duration) = parse_duration(&output.stderr) else {
            debug!("過濾 {}: 不是影片或無法讀取時長", path.display());
            return None;
        };

        if duration < self.options.min_duration_seconds {
            debug!(
                "過濾 {}: 時長 {duration:.2}s < {}s",
                path.display(),
                self.options.min_duration_seconds
            );
            return None;
        }

        debug!(
            "符合條件 {}: {size_mb:.2} MB, {duration:.2}s",
            path.display()
        );

        Some(VideoEntry {
            path: path.to_path_buf(),
            size,
            modified: metadata.modified().ok(),
            duration_seconds: duration,
        })
    }
}

/// 掃描影片檔案，回傳符合條件的影片（走訪順序）
pub fn scan_videos(
    root: &Path,
    options: &ScanOptions,
    tool: &dyn MediaTool,
    shutdown_signal: &AtomicBool,
) -> Result<Vec<VideoEntry>> {
    VideoScanner::new(tool, options).scan(root, shutdown_signal)
}
