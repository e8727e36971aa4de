use super::batch_coordinator::{BatchCoordinator, BatchEvent, BatchState, VideoThumbnails};
use crate::config::Config;
use crate::config::save::{add_recent_path, save_settings};
use crate::tools::validate_directory_exists;
use anyhow::Result;
use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use log::{Level, info, log_enabled, trace, warn};
use rust_i18n::t;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// 批次產生結果
#[derive(Debug, Default)]
pub struct GenerationSummary {
    pub total_videos: usize,
    pub generated: usize,
    pub from_cache: usize,
    pub unusable: usize,
    pub placeholders: usize,
    pub failed: usize,
}

impl GenerationSummary {
    fn record(&mut self, thumbnails: &VideoThumbnails) {
        if thumbnails.is_empty() {
            self.unusable += 1;
        } else if thumbnails.from_cache {
            self.from_cache += 1;
        } else {
            self.generated += 1;
        }
        self.placeholders += thumbnails.placeholder_count();
    }
}

/// 縮圖快取產生器（互動介面）
pub struct ThumbnailCacheGenerator<'a> {
    config: &'a mut Config,
    shutdown_signal: Arc<AtomicBool>,
}

impl<'a> ThumbnailCacheGenerator<'a> {
    pub fn new(config: &'a mut Config, shutdown_signal: Arc<AtomicBool>) -> Self {
        Self {
            config,
            shutdown_signal,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        println!("{}", style(t!("generator.title")).cyan().bold());

        let Some(folder) = self.prompt_folder()? else {
            return Ok(());
        };
        validate_directory_exists(&folder)?;

        let folder_text = folder.to_string_lossy().to_string();
        add_recent_path(&mut self.config.settings, &folder_text);
        if let Err(e) = save_settings(&self.config.settings) {
            warn!("無法儲存最近使用的路徑: {e:#}");
        }

        // 上一次批次的中斷不影響這一次
        self.shutdown_signal.store(false, Ordering::SeqCst);

        let settings = &self.config.settings;
        println!(
            "{} {}",
            style(t!("generator.cache_dir")).dim(),
            settings.cache_root().display()
        );

        let coordinator = BatchCoordinator::from_settings(settings, Arc::clone(&self.shutdown_signal))
            .with_command_trace(log_enabled!(Level::Trace));
        let handle = coordinator.start(folder, settings.scan.clone());

        let summary = Self::consume_events(&handle.events, settings.generation.thumbnail_count);
        let state = handle.wait();

        Self::print_summary(&summary, state);
        Ok(())
    }

    /// 選擇資料夾：最近使用的路徑或手動輸入；ESC 回傳 `None`
    fn prompt_folder(&self) -> Result<Option<PathBuf>> {
        let recent = &self.config.settings.recent_paths;

        if !recent.is_empty() {
            let mut items: Vec<String> = recent.clone();
            items.push(t!("generator.enter_new_path").to_string());

            let selection = Select::with_theme(&ColorfulTheme::default())
                .with_prompt(t!("generator.select_folder"))
                .items(&items)
                .default(0)
                .interact_opt()?;

            match selection {
                Some(index) if index < recent.len() => {
                    return Ok(Some(PathBuf::from(&recent[index])));
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        let path: String = Input::new()
            .with_prompt(t!("generator.input_folder"))
            .with_initial_text(self.config.settings.default_folder.clone())
            .interact_text()?;

        let path = path.trim();
        if path.is_empty() {
            return Ok(None);
        }
        Ok(Some(PathBuf::from(path)))
    }

    fn consume_events(
        events: &crossbeam_channel::Receiver<BatchEvent>,
        thumbnails_per_video: usize,
    ) -> GenerationSummary {
        let mut summary = GenerationSummary::default();
        let mut video_percent: HashMap<PathBuf, f64> = HashMap::new();

        let spinner = ProgressBar::new_spinner();
        spinner.set_message(t!("generator.scanning").to_string());
        spinner.enable_steady_tick(Duration::from_millis(120));

        let mut progress_bar: Option<ProgressBar> = None;

        for event in events {
            match event {
                BatchEvent::StateChanged(state) => trace!("批次狀態: {state:?}"),
                BatchEvent::ScanCompleted {
                    total_videos,
                    total_thumbnails,
                } => {
                    spinner.finish_and_clear();
                    summary.total_videos = total_videos;
                    println!(
                        "{}",
                        style(t!("generator.found_videos", count = total_videos)).green()
                    );
                    progress_bar = Some(Self::create_progress_bar(total_thumbnails));
                }
                BatchEvent::Progress {
                    video_path,
                    percent,
                } => {
                    video_percent.insert(video_path, percent);
                    Self::update_position(progress_bar.as_ref(), &video_percent, thumbnails_per_video);
                }
                BatchEvent::Command(trace) => trace!("[{}] {}", trace.strategy, trace.command),
                BatchEvent::VideoUpdated(thumbnails) => {
                    summary.record(&thumbnails);
                    let line = Self::describe_video(&thumbnails);
                    match progress_bar.as_ref() {
                        Some(bar) => bar.println(line),
                        None => println!("{line}"),
                    }
                    video_percent.insert(thumbnails.video_path, 100.0);
                    Self::update_position(progress_bar.as_ref(), &video_percent, thumbnails_per_video);
                }
                BatchEvent::VideoError {
                    video_path,
                    message,
                } => {
                    summary.failed += 1;
                    let line = format!(
                        "  {} {}: {message}",
                        style("✗").red(),
                        video_path.display()
                    );
                    match progress_bar.as_ref() {
                        Some(bar) => bar.println(line),
                        None => println!("{line}"),
                    }
                    video_percent.insert(video_path, 100.0);
                    Self::update_position(progress_bar.as_ref(), &video_percent, thumbnails_per_video);
                }
                BatchEvent::Completed { state } => {
                    info!("批次完成: {state:?}");
                    break;
                }
            }
        }

        spinner.finish_and_clear();
        if let Some(bar) = progress_bar {
            bar.finish_and_clear();
        }

        summary
    }

    fn create_progress_bar(total_thumbnails: usize) -> ProgressBar {
        let progress_bar = ProgressBar::new(total_thumbnails as u64);
        if let Ok(progress_style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
        {
            progress_bar.set_style(progress_style.progress_chars("#>-"));
        }
        progress_bar
    }

    /// 各影片百分比加總成整體進度（以縮圖張數計）
    fn update_position(
        progress_bar: Option<&ProgressBar>,
        video_percent: &HashMap<PathBuf, f64>,
        thumbnails_per_video: usize,
    ) {
        let Some(bar) = progress_bar else {
            return;
        };
        let done: f64 = video_percent
            .values()
            .map(|percent| percent / 100.0 * thumbnails_per_video as f64)
            .sum();
        bar.set_position(done.round() as u64);
    }

    fn describe_video(thumbnails: &VideoThumbnails) -> String {
        let name = thumbnails
            .video_path
            .file_name()
            .map_or_else(|| thumbnails.video_path.to_string_lossy(), |n| n.to_string_lossy());

        if thumbnails.is_empty() {
            return format!("  {} {name} {}", style("⤳").dim(), t!("generator.unusable"));
        }

        let source = if thumbnails.from_cache {
            t!("generator.from_cache")
        } else {
            t!("generator.generated")
        };
        let mut line = format!(
            "  {} {name} ({:.1}s) {} × {source}",
            style("✓").green(),
            thumbnails.duration,
            thumbnails.thumbnails.len()
        );
        let placeholders = thumbnails.placeholder_count();
        if placeholders > 0 {
            line.push_str(&format!(
                " {}",
                style(t!("generator.placeholders", count = placeholders)).yellow()
            ));
        }
        line
    }

    fn print_summary(summary: &GenerationSummary, state: BatchState) {
        println!();
        println!("{}", style(t!("generator.summary_title")).cyan().bold());
        println!("  {} {}", t!("generator.summary_total"), summary.total_videos);
        println!(
            "  {} {}",
            t!("generator.summary_generated"),
            style(summary.generated).green()
        );
        println!("  {} {}", t!("generator.summary_cached"), summary.from_cache);

        if summary.unusable > 0 {
            println!(
                "  {} {}",
                t!("generator.summary_unusable"),
                style(summary.unusable).yellow()
            );
        }
        if summary.placeholders > 0 {
            println!(
                "  {} {}",
                t!("generator.summary_placeholders"),
                style(summary.placeholders).yellow()
            );
        }
        if summary.failed > 0 {
            println!(
                "  {} {}",
                t!("generator.summary_failed"),
                style(summary.failed).red()
            );
        }
        if state == BatchState::Cancelled {
            println!("{}", style(t!("generator.cancelled")).yellow());
        }

        info!(
            "縮圖產生完成 - 產生: {}, 快取: {}, 無法使用: {}, 失敗: {}",
            summary.generated, summary.from_cache, summary.unusable, summary.failed
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thumbnails(count: usize, from_cache: bool, placeholders: usize) -> VideoThumbnails {
        VideoThumbnails {
            video_path: PathBuf::from("/videos/a.mp4"),
            thumbnails: (0..count).map(|i| format!("thumb_{i:03}.jpg")).collect(),
            timestamps: (0..count).map(|i| i as f64).collect(),
            duration: 10.0,
            placeholders: (0..count).map(|i| i < placeholders).collect(),
            from_cache,
        }
    }

    #[test]
    fn test_summary_record() {
        let mut summary = GenerationSummary::default();
        summary.record(&thumbnails(3, false, 1));
        summary.record(&thumbnails(3, true, 0));
        summary.record(&thumbnails(0, false, 0));

        assert_eq!(summary.generated, 1);
        assert_eq!(summary.from_cache, 1);
        assert_eq!(summary.unusable, 1);
        assert_eq!(summary.placeholders, 1);
    }

    #[test]
    fn test_update_position_aggregates_videos() {
        let bar = ProgressBar::hidden();
        bar.set_length(20);
        let mut percent = HashMap::new();
        percent.insert(PathBuf::from("/a.mp4"), 100.0);
        percent.insert(PathBuf::from("/b.mp4"), 50.0);

        ThumbnailCacheGenerator::update_position(Some(&bar), &percent, 10);

        assert_eq!(bar.position(), 15);
    }
}
