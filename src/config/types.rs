use log::warn;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;

/// 最近使用路徑的保留數量
pub const MAX_RECENT_PATHS: usize = 5;

/// 預設快取資料夾名稱（位於工作目錄下）
pub const DEFAULT_CACHE_DIR_NAME: &str = "cache";

/// 編碼品質範圍（ffmpeg qscale，數字越小品質越高）
pub const MIN_QUALITY: u8 = 1;
pub const MAX_QUALITY: u8 = 31;

/// 縮圖時間點分布模型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Distribution {
    Uniform,
    Triangular,
    #[default]
    Normal,
}

impl Distribution {
    pub const ALL: [Self; 3] = [Self::Uniform, Self::Triangular, Self::Normal];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uniform => "uniform",
            Self::Triangular => "triangular",
            Self::Normal => "normal",
        }
    }

    /// 嚴格解析穩定字串，只接受 `as_str` 產生的值
    #[must_use]
    pub fn parse_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == token)
    }

    /// 從字串解析分布模型，無法辨識時退回 `Uniform`
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        let normalized = token.trim().to_lowercase();
        Self::parse_token(&normalized).unwrap_or_else(|| {
            warn!("未知的分布模型 '{normalized}'，改用 uniform");
            Self::Uniform
        })
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// 以穩定的小寫字串序列化
impl Serialize for Distribution {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

// 反序列化時不報錯，未知值一律退回 Uniform
impl<'de> Deserialize<'de> for Distribution {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        Ok(Self::from_token(&token))
    }
}

/// 縮圖產生參數
///
/// 快取 manifest 會完整複製這些欄位，任何一個欄位不同都代表快取失效。
/// 序列化名稱沿用既有快取檔的欄位名稱。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParameters {
    #[serde(rename = "thumbnails_per_video")]
    pub thumbnail_count: usize,
    pub thumbnail_width: u32,
    #[serde(rename = "thumbnail_quality")]
    pub quality: u8,
    #[serde(rename = "peak_pos")]
    pub peak_position: f64,
    pub concentration: f64,
    pub distribution: Distribution,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            thumbnail_count: 18,
            thumbnail_width: 320,
            quality: 4,
            peak_position: 0.5,
            concentration: 0.2,
            distribution: Distribution::Normal,
        }
    }
}

impl GenerationParameters {
    /// 回傳正規化後的參數：品質夾在 [1, 31]，寬度至少 1，峰值夾在 [0, 1]
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.quality = self.quality.clamp(MIN_QUALITY, MAX_QUALITY);
        self.thumbnail_width = self.thumbnail_width.max(1);
        if !self.peak_position.is_finite() {
            self.peak_position = 0.5;
        }
        self.peak_position = self.peak_position.clamp(0.0, 1.0);
        if !self.concentration.is_finite() || self.concentration < 0.0 {
            self.concentration = 0.0;
        }
        self
    }

    /// 替代圖高度，固定 16:9
    #[must_use]
    pub fn thumbnail_height(&self) -> u32 {
        (u64::from(self.thumbnail_width) * 9 / 16).max(1) as u32
    }
}

/// 掃描過濾條件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    pub min_size_mb: f64,
    pub min_duration_seconds: f64,
    pub excluded_patterns: Vec<String>,
    pub use_regex: bool,
    pub match_full_path: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            min_size_mb: 0.0,
            min_duration_seconds: 0.0,
            excluded_patterns: Vec::new(),
            use_regex: false,
            match_full_path: false,
        }
    }
}

impl ScanOptions {
    /// 將逗號分隔的排除字串拆成模式清單
    #[must_use]
    pub fn parse_excluded_words(input: &str) -> Vec<String> {
        input
            .split(',')
            .map(str::trim)
            .filter(|word| !word.is_empty())
            .map(ToString::to_string)
            .collect()
    }

    #[must_use]
    pub fn excluded_words_display(&self) -> String {
        self.excluded_patterns.join(", ")
    }
}

/// 每部影片的快取子資料夾命名方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKeying {
    /// 以影片檔名命名（不同資料夾的同名影片會共用快取）
    #[default]
    FileName,
    /// 以檔名加上完整路徑雜湊命名
    PathHash,
}

impl fmt::Display for CacheKeying {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileName => write!(f, "file_name"),
            Self::PathHash => write!(f, "path_hash"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en-US")]
    EnUs,
    #[serde(rename = "zh-TW")]
    ZhTw,
}

impl Language {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EnUs => "en-US",
            Self::ZhTw => "zh-TW",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnUs => write!(f, "English"),
            Self::ZhTw => write!(f, "繁體中文"),
        }
    }
}

/// 使用者設定（settings.json）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub cache_dir: String,
    pub default_folder: String,
    pub recent_paths: Vec<String>,
    pub generation: GenerationParameters,
    pub scan: ScanOptions,
    pub concurrent_videos: usize,
    pub cache_keying: CacheKeying,
    pub tool_path: String,
    pub language: Language,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            cache_dir: String::new(),
            default_folder: String::new(),
            recent_paths: Vec::new(),
            generation: GenerationParameters::default(),
            scan: ScanOptions::default(),
            concurrent_videos: 4,
            cache_keying: CacheKeying::FileName,
            tool_path: "ffmpeg".to_string(),
            language: Language::EnUs,
        }
    }
}

impl UserSettings {
    /// 快取根目錄：未設定時使用工作目錄下的 `cache`
    #[must_use]
    pub fn cache_root(&self) -> PathBuf {
        resolve_cache_root(&self.cache_dir)
    }

    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.concurrent_videos.max(1)
    }
}

#[must_use]
pub fn resolve_cache_root(cache_dir: &str) -> PathBuf {
    let trimmed = cache_dir.trim();
    if trimmed.is_empty() {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(DEFAULT_CACHE_DIR_NAME)
    } else {
        PathBuf::from(trimmed)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub settings: UserSettings,
}
