use crate::config::types::{Config, UserSettings};
use anyhow::{Context, Result};
use log::warn;
use std::fs;
use std::path::Path;

/// 設定檔位於工作目錄
pub const SETTINGS_FILE: &str = "settings.json";

impl Config {
    pub fn new() -> Result<Self> {
        let settings = match Self::load_settings(Path::new(SETTINGS_FILE)) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("設定檔無法使用，改用預設值: {e:#}");
                UserSettings::default()
            }
        };

        Ok(Self { settings })
    }

    pub fn load_settings(path: &Path) -> Result<UserSettings> {
        if !path.exists() {
            return Ok(UserSettings::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;

        let mut settings: UserSettings = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))?;
        settings.generation = settings.generation.normalized();

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_nonexistent_settings() {
        let settings = Config::load_settings(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings, UserSettings::default());
    }

    #[test]
    fn test_load_settings_clamps_quality() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(SETTINGS_FILE);
        fs::write(
            &path,
            r#"{"generation": {"thumbnails_per_video": 4, "thumbnail_width": 200, "thumbnail_quality": 80, "peak_pos": 0.5, "concentration": 0.2, "distribution": "normal"}}"#,
        )
        .unwrap();

        let settings = Config::load_settings(&path).unwrap();
        assert_eq!(settings.generation.quality, 31);
    }

    #[test]
    fn test_load_corrupt_settings_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(SETTINGS_FILE);
        fs::write(&path, "{ not json").unwrap();

        assert!(Config::load_settings(&path).is_err());
    }
}
