use crate::config::Config;
use crate::tools::{
    CacheStore, FfmpegTool, VideoEntry, VideoScanner, bytes_to_mb, validate_directory_exists,
};
use anyhow::Result;
use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, MultiSelect, Select};
use log::{error, info};
use rust_i18n::t;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 刪除影片的結果
#[derive(Debug, Default)]
pub struct PurgeResult {
    pub removed: usize,
    pub failed: Vec<(PathBuf, String)>,
}

/// 刪除影片檔案與其快取，單一失敗不影響其他影片
pub fn purge_videos(
    cache: &CacheStore,
    videos: &[PathBuf],
    shutdown_signal: &AtomicBool,
) -> PurgeResult {
    let mut result = PurgeResult::default();

    for video in videos {
        if shutdown_signal.load(Ordering::SeqCst) {
            break;
        }
        match cache.purge_video(video) {
            Ok(()) => result.removed += 1,
            Err(e) => {
                error!("刪除影片失敗 {}: {e:#}", video.display());
                result.failed.push((video.clone(), format!("{e:#}")));
            }
        }
    }

    info!("已刪除 {} 部影片，失敗 {}", result.removed, result.failed.len());
    result
}

pub struct CacheCleaner<'a> {
    config: &'a Config,
    shutdown_signal: Arc<AtomicBool>,
}

impl<'a> CacheCleaner<'a> {
    pub const fn new(config: &'a Config, shutdown_signal: Arc<AtomicBool>) -> Self {
        Self {
            config,
            shutdown_signal,
        }
    }

    fn cache_store(&self) -> CacheStore {
        let settings = &self.config.settings;
        CacheStore::from_setting(&settings.cache_dir, settings.cache_keying)
    }

    pub fn run(&self) -> Result<()> {
        println!("{}", style(t!("cleaner.title")).cyan().bold());

        let options = vec![
            t!("cleaner.opt_delete_videos"),
            t!("cleaner.opt_clear_all"),
            t!("cleaner.back"),
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(t!("cleaner.prompt"))
            .items(&options)
            .default(0)
            .interact_opt()?;

        match selection {
            Some(0) => self.delete_videos(),
            Some(1) => self.clear_all(),
            _ => Ok(()),
        }
    }

    fn delete_videos(&self) -> Result<()> {
        let path: String = Input::new()
            .with_prompt(t!("cleaner.input_folder"))
            .interact_text()?;
        let folder = PathBuf::from(path.trim());
        validate_directory_exists(&folder)?;

        self.shutdown_signal.store(false, Ordering::SeqCst);

        println!("{}", style(t!("generator.scanning")).dim());
        let cache = self.cache_store();
        let videos = self.scan(&folder, &cache)?;

        if videos.is_empty() {
            println!("{}", style(t!("cleaner.no_videos")).yellow());
            return Ok(());
        }

        let items: Vec<String> = videos
            .iter()
            .map(|v| {
                let cached = if cache.video_cache_dir(&v.path).exists() {
                    t!("cleaner.cached").to_string()
                } else {
                    String::new()
                };
                format!(
                    "{} ({:.1} MB, {:.0}s) {cached}",
                    v.path.display(),
                    bytes_to_mb(v.size),
                    v.duration_seconds
                )
            })
            .collect();

        let chosen = MultiSelect::with_theme(&ColorfulTheme::default())
            .with_prompt(t!("cleaner.select_videos"))
            .items(&items)
            .interact_opt()?;

        let Some(chosen) = chosen.filter(|c| !c.is_empty()) else {
            return Ok(());
        };

        let confirm = Confirm::new()
            .with_prompt(t!("cleaner.confirm_delete", count = chosen.len()))
            .default(false)
            .interact()?;
        if !confirm {
            return Ok(());
        }

        let selected: Vec<PathBuf> = chosen.into_iter().map(|i| videos[i].path.clone()).collect();
        let result = purge_videos(&cache, &selected, &self.shutdown_signal);

        println!(
            "{}",
            style(t!("cleaner.deleted", count = result.removed)).green()
        );
        for (video, message) in &result.failed {
            println!("  {} {}: {message}", style("✗").red(), video.display());
        }

        Ok(())
    }

    fn scan(&self, folder: &Path, cache: &CacheStore) -> Result<Vec<VideoEntry>> {
        let settings = &self.config.settings;
        let tool = FfmpegTool::new(&settings.tool_path);
        let mut scanner = VideoScanner::new(&tool, &settings.scan);
        if let Some(name) = cache.root_dir_name() {
            scanner = scanner.with_pruned_dir(name);
        }
        scanner.scan(folder, &self.shutdown_signal)
    }

    fn clear_all(&self) -> Result<()> {
        let cache = self.cache_store();

        let confirm = Confirm::new()
            .with_prompt(t!("cleaner.confirm_clear", path = cache.root().display()))
            .default(false)
            .interact()?;
        if !confirm {
            return Ok(());
        }

        let removed = cache.clear_all()?;
        println!("{}", style(t!("cleaner.cleared", count = removed)).green());
        Ok(())
    }
}
