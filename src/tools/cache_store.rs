//! 縮圖快取
//!
//! 快取根目錄下每部影片一個子資料夾，內含 `<影片檔名>.json` manifest
//! 與 `thumb_NNN.jpg` 縮圖。manifest 只由這裡讀寫。

use crate::config::{CacheKeying, Distribution, GenerationParameters, resolve_cache_root};
use crate::tools::fs_helpers::remove_dir_tolerant;
use crate::tools::path_hasher::path_cache_key;
use anyhow::{Context, Result, bail};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

/// 每部影片的快取 manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheManifest {
    pub thumbnails: Vec<String>,
    pub timestamps: Vec<f64>,
    /// 與 `thumbnails` 一一對應；舊版快取沒有此欄位時視為全部為真實畫面
    #[serde(default)]
    pub is_placeholder: Vec<bool>,
    pub duration: f64,
    #[serde(flatten)]
    pub parameters: GenerationParameters,
}

impl CacheManifest {
    /// 每張縮圖是否為替代圖，長度與 `thumbnails` 相同
    #[must_use]
    pub fn placeholder_flags(&self) -> Vec<bool> {
        let mut flags = self.is_placeholder.clone();
        flags.resize(self.thumbnails.len(), false);
        flags
    }

    fn invalid_reason(&self, params: &GenerationParameters, video_dir: &Path) -> Option<String> {
        if self.parameters != *params {
            return Some("產生參數不同".to_string());
        }
        if self.thumbnails.is_empty() {
            return Some("沒有縮圖".to_string());
        }
        if self.thumbnails.len() != self.timestamps.len() {
            return Some(format!(
                "縮圖數量 {} 與時間點數量 {} 不符",
                self.thumbnails.len(),
                self.timestamps.len()
            ));
        }
        if let Some(name) = self.thumbnails.iter().find(|name| !is_plain_file_name(name)) {
            return Some(format!("縮圖檔名不在快取資料夾內: {name}"));
        }
        self.thumbnails
            .iter()
            .find(|name| !video_dir.join(name).is_file())
            .map(|name| format!("縮圖檔案不存在: {name}"))
    }
}

/// 只接受單一一般路徑元件（不含目錄、`..` 或絕對路徑）
fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
    keying: CacheKeying,
}

impl CacheStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, keying: CacheKeying) -> Self {
        Self {
            root: root.into(),
            keying,
        }
    }

    /// 由設定建立；空白路徑使用工作目錄下的 `cache`
    #[must_use]
    pub fn from_setting(cache_dir: &str, keying: CacheKeying) -> Self {
        Self::new(resolve_cache_root(cache_dir), keying)
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 快取根目錄的資料夾名稱，掃描時需略過
    #[must_use]
    pub fn root_dir_name(&self) -> Option<String> {
        self.root
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
    }

    /// 影片專屬的快取子資料夾（不建立）
    #[must_use]
    pub fn video_cache_dir(&self, video: &Path) -> PathBuf {
        let name = video_file_name(video);
        match self.keying {
            CacheKeying::FileName => self.root.join(name),
            CacheKeying::PathHash => self.root.join(format!("{name}-{}", path_cache_key(video))),
        }
    }

    fn manifest_path(&self, video: &Path) -> PathBuf {
        self.video_cache_dir(video)
            .join(format!("{}.json", video_file_name(video)))
    }

    /// 取得 manifest 路徑，並確保子資料夾存在
    pub fn get_manifest_path(&self, video: &Path) -> Result<PathBuf> {
        let dir = self.video_cache_dir(video);
        fs::create_dir_all(&dir)
            .with_context(|| format!("無法建立快取資料夾: {}", dir.display()))?;
        Ok(self.manifest_path(video))
    }

    /// 讀取 manifest；不存在時回傳 `None`，內容損毀時回傳錯誤
    pub fn read(&self, video: &Path) -> Result<Option<CacheManifest>> {
        let path = self.manifest_path(video);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("無法讀取快取檔案: {}", path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("無法解析快取檔案: {}", path.display()))?;

        // 設定檔的分布模型可寬鬆退回 uniform，快取必須完全相符
        let token = value.get("distribution").and_then(serde_json::Value::as_str);
        if token.and_then(Distribution::parse_token).is_none() {
            bail!(
                "快取檔案的分布模型無效 {:?}: {}",
                token.unwrap_or_default(),
                path.display()
            );
        }

        let manifest = serde_json::from_value(value)
            .with_context(|| format!("無法解析快取檔案: {}", path.display()))?;

        Ok(Some(manifest))
    }

    /// 回傳符合目前參數的 manifest
    ///
    /// 只要 manifest 存在但無效（損毀、缺欄位、參數不同、縮圖遺失），
    /// 就會清除整個影片快取資料夾。
    pub fn load_valid(&self, video: &Path, params: &GenerationParameters) -> Option<CacheManifest> {
        let manifest = match self.read(video) {
            Ok(Some(manifest)) => manifest,
            Ok(None) => return None,
            Err(e) => {
                warn!("快取損毀，清除中 {}: {e:#}", video.display());
                self.clear(video);
                return None;
            }
        };

        let video_dir = self.video_cache_dir(video);
        if let Some(reason) = manifest.invalid_reason(params, &video_dir) {
            debug!("快取無效 {}: {reason}", video.display());
            self.clear(video);
            return None;
        }

        debug!("快取有效: {}", video.display());
        Some(manifest)
    }

    #[must_use]
    pub fn is_valid(&self, video: &Path, params: &GenerationParameters) -> bool {
        self.load_valid(video, params).is_some()
    }

    /// 刪除影片快取資料夾；失敗只記錄不回報
    pub fn clear(&self, video: &Path) {
        let dir = self.video_cache_dir(video);
        if remove_dir_tolerant(&dir) {
            debug!("已清除快取資料夾: {}", dir.display());
        }
    }

    /// 寫入 manifest（先寫暫存檔再改名，覆蓋舊檔）
    pub fn write(&self, video: &Path, manifest: &CacheManifest) -> Result<()> {
        let path = self.get_manifest_path(video)?;
        let content =
            serde_json::to_string_pretty(manifest).with_context(|| "無法序列化快取 manifest")?;

        let temp_path = path.with_file_name(format!(".{}.tmp", Uuid::new_v4()));
        fs::write(&temp_path, content)
            .with_context(|| format!("無法寫入快取檔案: {}", temp_path.display()))?;

        if let Err(e) = fs::rename(&temp_path, &path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e).with_context(|| format!("無法寫入快取檔案: {}", path.display()));
        }

        debug!("已寫入快取: {}", path.display());
        Ok(())
    }

    /// 刪除影片檔案與其快取
    pub fn purge_video(&self, video: &Path) -> Result<()> {
        if video.exists() {
            fs::remove_file(video)
                .with_context(|| format!("無法刪除影片: {}", video.display()))?;
            info!("已刪除影片: {}", video.display());
        }
        self.clear(video);
        Ok(())
    }

    /// 清除快取根目錄下所有影片快取，回傳刪除的資料夾數
    pub fn clear_all(&self) -> Result<usize> {
        if !self.root.exists() {
            return Ok(0);
        }

        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("無法讀取快取根目錄: {}", self.root.display()))?;

        let removed = entries
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
            .filter(|entry| remove_dir_tolerant(&entry.path()))
            .count();

        info!("已清除 {removed} 個影片快取: {}", self.root.display());
        Ok(removed)
    }
}

fn video_file_name(video: &Path) -> String {
    video
        .file_name()
        .map_or_else(|| "video".to_string(), |n| n.to_string_lossy().to_string())
}
