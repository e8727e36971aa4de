use anyhow::{Result, bail};
use log::warn;
use std::fs;
use std::path::Path;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

pub fn validate_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("路徑不存在: {}", path.display());
    }
    if !path.is_dir() {
        bail!("路徑不是資料夾: {}", path.display());
    }
    Ok(())
}

/// 遞迴刪除資料夾，失敗時只記錄警告
///
/// 回傳是否確實刪除了資料夾。
pub fn remove_dir_tolerant(path: &Path) -> bool {
    if !path.exists() {
        return false;
    }
    match fs::remove_dir_all(path) {
        Ok(()) => true,
        Err(e) => {
            warn!("無法刪除資料夾 {}: {e}", path.display());
            false
        }
    }
}

/// 刪除檔案，不存在或失敗都不回報
pub fn remove_file_quietly(path: &Path) {
    if path.exists()
        && let Err(e) = fs::remove_file(path)
    {
        warn!("無法刪除檔案 {}: {e}", path.display());
    }
}

#[must_use]
pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}
