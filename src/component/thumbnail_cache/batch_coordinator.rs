//! 批次縮圖產生
//!
//! 掃描 → 每部影片（快取檢查 → 讀取時長 → 取樣 → 依序擷取）。
//! 工作執行緒只把事件放進 channel，呼叫端在自己的執行緒上消費。

use crate::config::{GenerationParameters, ScanOptions, UserSettings};
use crate::tools::{
    CacheManifest, CacheStore, CommandTrace, FfmpegTool, MediaTool, ThumbnailExtractor,
    VideoScanner, create_thumbnail_tasks, probe_duration, sample_timestamps,
};
use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, info, trace, warn};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Scanning,
    Extracting,
    Complete,
    Cancelled,
}

/// 一部影片的處理結果
#[derive(Debug, Clone, PartialEq)]
pub struct VideoThumbnails {
    pub video_path: PathBuf,
    /// 相對於影片快取資料夾的檔名
    pub thumbnails: Vec<String>,
    pub timestamps: Vec<f64>,
    pub duration: f64,
    pub placeholders: Vec<bool>,
    pub from_cache: bool,
}

impl VideoThumbnails {
    /// 無法使用的影片（讀不到時長或沒有可取樣的時間點）
    fn empty(video_path: &Path, duration: f64) -> Self {
        Self {
            video_path: video_path.to_path_buf(),
            thumbnails: Vec::new(),
            timestamps: Vec::new(),
            duration,
            placeholders: Vec::new(),
            from_cache: false,
        }
    }

    fn from_manifest(video_path: &Path, manifest: CacheManifest, from_cache: bool) -> Self {
        let placeholders = manifest.placeholder_flags();
        Self {
            video_path: video_path.to_path_buf(),
            thumbnails: manifest.thumbnails,
            timestamps: manifest.timestamps,
            duration: manifest.duration,
            placeholders,
            from_cache,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.thumbnails.is_empty()
    }

    #[must_use]
    pub fn placeholder_count(&self) -> usize {
        self.placeholders.iter().filter(|p| **p).count()
    }
}

#[derive(Debug, Clone)]
pub enum BatchEvent {
    StateChanged(BatchState),
    ScanCompleted {
        total_videos: usize,
        total_thumbnails: usize,
    },
    /// 單一影片的完成百分比
    Progress {
        video_path: PathBuf,
        percent: f64,
    },
    Command(CommandTrace),
    VideoUpdated(VideoThumbnails),
    VideoError {
        video_path: PathBuf,
        message: String,
    },
    /// 一定是最後一個事件，且只會送出一次
    Completed {
        state: BatchState,
    },
}

/// 呼叫端的回呼，全部在 `dispatch_events` 的執行緒上執行
#[derive(Default)]
pub struct BatchCallbacks<'a> {
    pub on_state: Option<Box<dyn FnMut(BatchState) + 'a>>,
    pub on_scan: Option<Box<dyn FnMut(usize, usize) + 'a>>,
    pub on_update: Option<Box<dyn FnMut(&VideoThumbnails) + 'a>>,
    pub on_progress: Option<Box<dyn FnMut(&Path, f64) + 'a>>,
    pub on_error: Option<Box<dyn FnMut(&Path, &str) + 'a>>,
    pub on_command: Option<Box<dyn FnMut(&CommandTrace) + 'a>>,
    pub on_complete: Option<Box<dyn FnMut(BatchState) + 'a>>,
}

/// 消費事件直到 `Completed`，回傳批次最終狀態
pub fn dispatch_events(events: &Receiver<BatchEvent>, callbacks: &mut BatchCallbacks<'_>) -> BatchState {
    for event in events {
        match event {
            BatchEvent::StateChanged(state) => {
                if let Some(on_state) = callbacks.on_state.as_mut() {
                    on_state(state);
                }
            }
            BatchEvent::ScanCompleted {
                total_videos,
                total_thumbnails,
            } => {
                if let Some(on_scan) = callbacks.on_scan.as_mut() {
                    on_scan(total_videos, total_thumbnails);
                }
            }
            BatchEvent::Progress {
                video_path,
                percent,
            } => {
                if let Some(on_progress) = callbacks.on_progress.as_mut() {
                    on_progress(&video_path, percent);
                }
            }
            BatchEvent::Command(trace) => {
                if let Some(on_command) = callbacks.on_command.as_mut() {
                    on_command(&trace);
                }
            }
            BatchEvent::VideoUpdated(thumbnails) => {
                if let Some(on_update) = callbacks.on_update.as_mut() {
                    on_update(&thumbnails);
                }
            }
            BatchEvent::VideoError {
                video_path,
                message,
            } => {
                if let Some(on_error) = callbacks.on_error.as_mut() {
                    on_error(&video_path, &message);
                }
            }
            BatchEvent::Completed { state } => {
                if let Some(on_complete) = callbacks.on_complete.as_mut() {
                    on_complete(state);
                }
                return state;
            }
        }
    }

    warn!("批次事件中斷，未收到完成事件");
    BatchState::Cancelled
}

/// 背景執行中的批次
pub struct BatchHandle {
    pub events: Receiver<BatchEvent>,
    join: JoinHandle<BatchState>,
}

impl BatchHandle {
    /// 等待批次結束（不消費事件）
    pub fn wait(self) -> BatchState {
        self.join.join().unwrap_or_else(|_| {
            error!("批次執行緒異常結束");
            BatchState::Cancelled
        })
    }

    /// 在目前執行緒上分派事件直到批次結束
    pub fn dispatch(self, callbacks: &mut BatchCallbacks<'_>) -> BatchState {
        let state = dispatch_events(&self.events, callbacks);
        let _ = self.wait();
        state
    }
}

enum VideoOutcome {
    Finished(VideoThumbnails),
    Failed { video_path: PathBuf, message: String },
    Cancelled(PathBuf),
}

#[derive(Default)]
struct BatchSummary {
    updated: usize,
    failed: usize,
    cancelled: usize,
    discarded: usize,
}

fn emit(events: &Sender<BatchEvent>, event: BatchEvent) {
    if events.send(event).is_err() {
        trace!("事件接收端已關閉");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "未知錯誤".to_string())
}

/// 批次協調器
///
/// 以 `concurrency` 個執行緒的 rayon pool 平行處理影片，
/// 單一影片內的時間點依序擷取，因此同時執行的外部程序數不超過 pool 大小。
pub struct BatchCoordinator {
    tool: Arc<dyn MediaTool>,
    cache: CacheStore,
    params: GenerationParameters,
    concurrency: usize,
    trace_commands: bool,
    shutdown_signal: Arc<AtomicBool>,
}

impl BatchCoordinator {
    #[must_use]
    pub fn new(
        tool: Arc<dyn MediaTool>,
        cache: CacheStore,
        params: GenerationParameters,
        shutdown_signal: Arc<AtomicBool>,
    ) -> Self {
        Self {
            tool,
            cache,
            params: params.normalized(),
            concurrency: DEFAULT_CONCURRENCY,
            trace_commands: true,
            shutdown_signal,
        }
    }

    #[must_use]
    pub fn from_settings(settings: &UserSettings, shutdown_signal: Arc<AtomicBool>) -> Self {
        Self::new(
            Arc::new(FfmpegTool::new(&settings.tool_path)),
            CacheStore::from_setting(&settings.cache_dir, settings.cache_keying),
            settings.generation.clone(),
            shutdown_signal,
        )
        .with_concurrency(settings.worker_count())
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// 是否為每次擷取嘗試送出 `BatchEvent::Command`
    #[must_use]
    pub fn with_command_trace(mut self, enabled: bool) -> Self {
        self.trace_commands = enabled;
        self
    }

    #[must_use]
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    fn is_stopped(&self) -> bool {
        self.shutdown_signal.load(Ordering::SeqCst)
    }

    /// 在背景執行緒掃描並處理資料夾
    #[must_use]
    pub fn start(self, root: PathBuf, scan_options: ScanOptions) -> BatchHandle {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let join = thread::spawn(move || self.run(&root, &scan_options, &sender));
        BatchHandle {
            events: receiver,
            join,
        }
    }

    /// 在背景執行緒處理指定的影片清單
    #[must_use]
    pub fn start_videos(self, videos: Vec<PathBuf>) -> BatchHandle {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let join = thread::spawn(move || {
            emit(&sender, BatchEvent::StateChanged(BatchState::Scanning));
            self.process_videos(&videos, &sender)
        });
        BatchHandle {
            events: receiver,
            join,
        }
    }

    /// 掃描資料夾後處理所有影片
    pub fn run(&self, root: &Path, scan_options: &ScanOptions, events: &Sender<BatchEvent>) -> BatchState {
        emit(events, BatchEvent::StateChanged(BatchState::Scanning));
        info!("開始掃描: {}", root.display());

        let mut scanner = VideoScanner::new(self.tool.as_ref(), scan_options);
        if let Some(name) = self.cache.root_dir_name() {
            scanner = scanner.with_pruned_dir(name);
        }

        let videos = match scanner.scan(root, &self.shutdown_signal) {
            Ok(entries) => entries.into_iter().map(|e| e.path).collect::<Vec<_>>(),
            Err(e) => {
                error!("掃描失敗 {}: {e:#}", root.display());
                emit(
                    events,
                    BatchEvent::VideoError {
                        video_path: root.to_path_buf(),
                        message: format!("{e:#}"),
                    },
                );
                Vec::new()
            }
        };

        self.process_videos(&videos, events)
    }

    /// 處理影片清單；一定會送出一次 `Completed`
    pub fn process_videos(&self, videos: &[PathBuf], events: &Sender<BatchEvent>) -> BatchState {
        let state = if self.is_stopped() {
            BatchState::Cancelled
        } else {
            emit(
                events,
                BatchEvent::ScanCompleted {
                    total_videos: videos.len(),
                    total_thumbnails: videos.len() * self.params.thumbnail_count,
                },
            );
            emit(events, BatchEvent::StateChanged(BatchState::Extracting));
            self.run_pool(videos, events)
        };

        emit(events, BatchEvent::StateChanged(state));
        emit(events, BatchEvent::Completed { state });
        state
    }

    fn run_pool(&self, videos: &[PathBuf], events: &Sender<BatchEvent>) -> BatchState {
        if videos.is_empty() {
            info!("沒有需要處理的影片");
            return BatchState::Complete;
        }

        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.concurrency)
            .thread_name(|i| format!("thumbnail-worker-{i}"))
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                error!("無法建立工作執行緒: {e}");
                for video in videos {
                    emit(
                        events,
                        BatchEvent::VideoError {
                            video_path: video.clone(),
                            message: format!("無法建立工作執行緒: {e}"),
                        },
                    );
                }
                return BatchState::Complete;
            }
        };

        info!(
            "開始處理 {} 部影片（{} 個執行緒）",
            videos.len(),
            self.concurrency
        );

        let (outcome_sender, outcome_receiver) = crossbeam_channel::unbounded();
        let mut summary = BatchSummary::default();

        pool.in_place_scope(|scope| {
            for video in videos {
                let outcome_sender = outcome_sender.clone();
                scope.spawn(move |_| {
                    let _ = outcome_sender.send(self.run_unit(video, events));
                });
            }

            // 每個工作剛好回報一次結果
            for _ in 0..videos.len() {
                let Ok(outcome) = outcome_receiver.recv() else {
                    break;
                };
                self.handle_outcome(outcome, events, &mut summary);
            }
        });

        info!(
            "批次結束 - 完成: {}, 失敗: {}, 取消: {}, 捨棄: {}",
            summary.updated, summary.failed, summary.cancelled, summary.discarded
        );

        if self.is_stopped() {
            BatchState::Cancelled
        } else {
            BatchState::Complete
        }
    }

    fn handle_outcome(&self, outcome: VideoOutcome, events: &Sender<BatchEvent>, summary: &mut BatchSummary) {
        if self.is_stopped() {
            if let VideoOutcome::Cancelled(video_path) = &outcome {
                debug!("已取消: {}", video_path.display());
                summary.cancelled += 1;
            } else {
                summary.discarded += 1;
            }
            return;
        }

        match outcome {
            VideoOutcome::Finished(thumbnails) => {
                summary.updated += 1;
                emit(events, BatchEvent::VideoUpdated(thumbnails));
            }
            VideoOutcome::Failed {
                video_path,
                message,
            } => {
                summary.failed += 1;
                emit(
                    events,
                    BatchEvent::VideoError {
                        video_path,
                        message,
                    },
                );
            }
            VideoOutcome::Cancelled(video_path) => {
                debug!("已取消: {}", video_path.display());
                summary.cancelled += 1;
            }
        }
    }

    /// 單一影片的工作單元，panic 與錯誤都轉成結果回報
    fn run_unit(&self, video: &Path, events: &Sender<BatchEvent>) -> VideoOutcome {
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.process_video(video, events)));

        match result {
            Ok(Ok(Some(thumbnails))) => VideoOutcome::Finished(thumbnails),
            Ok(Ok(None)) => VideoOutcome::Cancelled(video.to_path_buf()),
            Ok(Err(e)) => {
                error!("處理影片失敗 {}: {e:#}", video.display());
                VideoOutcome::Failed {
                    video_path: video.to_path_buf(),
                    message: format!("{e:#}"),
                }
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("處理影片時發生異常 {}: {message}", video.display());
                VideoOutcome::Failed {
                    video_path: video.to_path_buf(),
                    message,
                }
            }
        }
    }

    /// 處理單一影片
    ///
    /// 回傳 `Ok(None)` 表示收到停止信號；讀不到時長的影片回傳空結果而非錯誤。
    pub fn process_video(
        &self,
        video: &Path,
        events: &Sender<BatchEvent>,
    ) -> Result<Option<VideoThumbnails>> {
        if self.is_stopped() {
            return Ok(None);
        }

        if let Some(manifest) = self.cache.load_valid(video, &self.params) {
            debug!("使用快取: {}", video.display());
            emit(
                events,
                BatchEvent::Progress {
                    video_path: video.to_path_buf(),
                    percent: 100.0,
                },
            );
            return Ok(Some(VideoThumbnails::from_manifest(video, manifest, true)));
        }

        let duration = probe_duration(self.tool.as_ref(), video)
            .with_context(|| format!("無法讀取影片時長: {}", video.display()))?;
        if duration <= 0.0 {
            return Ok(Some(VideoThumbnails::empty(video, 0.0)));
        }

        let timestamps = sample_timestamps(duration, &self.params);
        if timestamps.is_empty() {
            return Ok(Some(VideoThumbnails::empty(video, duration)));
        }

        // 重新產生前先清掉舊的資料夾，避免殘留不屬於新 manifest 的檔案
        self.cache.clear(video);
        let result = self.extract_and_store(video, duration, &timestamps, events);

        match result {
            Ok(Some(manifest)) => Ok(Some(VideoThumbnails::from_manifest(video, manifest, false))),
            Ok(None) => {
                debug!("中途停止，清除未完成的快取: {}", video.display());
                self.cache.clear(video);
                Ok(None)
            }
            Err(e) => {
                self.cache.clear(video);
                Err(e)
            }
        }
    }

    fn extract_and_store(
        &self,
        video: &Path,
        duration: f64,
        timestamps: &[f64],
        events: &Sender<BatchEvent>,
    ) -> Result<Option<CacheManifest>> {
        self.cache.get_manifest_path(video)?;
        let tasks = create_thumbnail_tasks(video, timestamps, &self.cache.video_cache_dir(video));

        let observer = |trace: &CommandTrace| emit(events, BatchEvent::Command(trace.clone()));
        let mut extractor = ThumbnailExtractor::new(self.tool.as_ref(), &self.params);
        if self.trace_commands {
            extractor = extractor.with_observer(&observer);
        }

        let Some(results) = extractor.extract_all(&tasks, &self.shutdown_signal, |percent| {
            emit(
                events,
                BatchEvent::Progress {
                    video_path: video.to_path_buf(),
                    percent,
                },
            );
        })?
        else {
            return Ok(None);
        };

        let manifest = CacheManifest {
            thumbnails: results.iter().map(|r| r.filename.clone()).collect(),
            timestamps: results.iter().map(|r| r.timestamp).collect(),
            is_placeholder: results.iter().map(|r| r.is_placeholder).collect(),
            duration,
            parameters: self.params.clone(),
        };

        let placeholders = manifest.is_placeholder.iter().filter(|p| **p).count();
        if placeholders > 0 {
            warn!(
                "{} 有 {placeholders} / {} 張縮圖為替代圖",
                video.display(),
                manifest.thumbnails.len()
            );
        }

        self.cache.write(video, &manifest)?;
        Ok(Some(manifest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheKeying, Distribution};
    use crate::tools::ToolOutput;
    use image::{Rgb, RgbImage};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tempfile::TempDir;

    /// 讀取時長一律回報 100 秒，擷取時寫出真正的 JPEG
    struct FakeFfmpeg {
        probes: AtomicUsize,
        extractions: AtomicUsize,
    }

    impl FakeFfmpeg {
        fn new() -> Self {
            Self {
                probes: AtomicUsize::new(0),
                extractions: AtomicUsize::new(0),
            }
        }
    }

    impl MediaTool for FakeFfmpeg {
        fn program(&self) -> &str {
            "fake-ffmpeg"
        }

        fn run(&self, args: &[String], _timeout: Duration) -> anyhow::Result<ToolOutput> {
            if args.iter().any(|a| a == "-vframes") {
                self.extractions.fetch_add(1, Ordering::SeqCst);
                let output = PathBuf::from(args.last().unwrap());
                RgbImage::from_pixel(32, 18, Rgb([200, 50, 50])).save(&output).unwrap();
                return Ok(ToolOutput {
                    success: true,
                    exit_code: Some(0),
                    ..ToolOutput::default()
                });
            }
            self.probes.fetch_add(1, Ordering::SeqCst);
            Ok(ToolOutput {
                success: false,
                exit_code: Some(1),
                stderr: "  Duration: 00:01:40.00, start: 0.000000".to_string(),
                timed_out: false,
            })
        }
    }

    fn params() -> GenerationParameters {
        GenerationParameters {
            thumbnail_count: 3,
            distribution: Distribution::Uniform,
            ..GenerationParameters::default()
        }
    }

    fn coordinator(tool: Arc<FakeFfmpeg>, cache_root: &Path, stop: bool) -> BatchCoordinator {
        BatchCoordinator::new(
            tool,
            CacheStore::new(cache_root, CacheKeying::FileName),
            params(),
            Arc::new(AtomicBool::new(stop)),
        )
        .with_concurrency(2)
    }

    fn collect(videos: &[PathBuf], coordinator: &BatchCoordinator) -> (BatchState, Vec<BatchEvent>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let state = coordinator.process_videos(videos, &sender);
        drop(sender);
        (state, receiver.iter().collect())
    }

    #[test]
    fn test_process_video_writes_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let tool = Arc::new(FakeFfmpeg::new());
        let coordinator = coordinator(Arc::clone(&tool), &temp_dir.path().join("cache"), false);
        let video = temp_dir.path().join("movie.mp4");

        let (state, events) = collect(&[video.clone()], &coordinator);

        assert_eq!(state, BatchState::Complete);
        let updated: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                BatchEvent::VideoUpdated(t) => Some(t.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].thumbnails, vec!["thumb_000.jpg", "thumb_001.jpg", "thumb_002.jpg"]);
        assert_eq!(updated[0].timestamps, vec![25.0, 50.0, 75.0]);
        assert!(!updated[0].from_cache);
        assert_eq!(updated[0].placeholder_count(), 0);
        assert!(coordinator.cache().is_valid(&video, &params()));
        assert!(matches!(events.last(), Some(BatchEvent::Completed { state: BatchState::Complete })));
    }

    #[test]
    fn test_progress_is_per_video_percentage() {
        let temp_dir = TempDir::new().unwrap();
        let tool = Arc::new(FakeFfmpeg::new());
        let coordinator = coordinator(tool, &temp_dir.path().join("cache"), false);

        let (_, events) = collect(&[temp_dir.path().join("movie.mp4")], &coordinator);

        let progress: Vec<f64> = events
            .iter()
            .filter_map(|e| match e {
                BatchEvent::Progress { percent, .. } => Some(*percent),
                _ => None,
            })
            .collect();
        assert_eq!(progress.len(), 3);
        assert!((progress[2] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_command_trace_can_be_disabled() {
        let temp_dir = TempDir::new().unwrap();
        let tool = Arc::new(FakeFfmpeg::new());
        let coordinator =
            coordinator(tool, &temp_dir.path().join("cache"), false).with_command_trace(false);

        let (_, events) = collect(&[temp_dir.path().join("movie.mp4")], &coordinator);

        assert!(!events.iter().any(|e| matches!(e, BatchEvent::Command(_))));
    }

    #[test]
    fn test_stopped_batch_is_cancelled_without_work() {
        let temp_dir = TempDir::new().unwrap();
        let tool = Arc::new(FakeFfmpeg::new());
        let coordinator = coordinator(Arc::clone(&tool), &temp_dir.path().join("cache"), true);

        let (state, events) = collect(&[temp_dir.path().join("movie.mp4")], &coordinator);

        assert_eq!(state, BatchState::Cancelled);
        assert_eq!(tool.probes.load(Ordering::SeqCst), 0);
        let completed = events
            .iter()
            .filter(|e| matches!(e, BatchEvent::Completed { .. }))
            .count();
        assert_eq!(completed, 1);
    }

    #[test]
    fn test_empty_batch_completes() {
        let temp_dir = TempDir::new().unwrap();
        let coordinator = coordinator(Arc::new(FakeFfmpeg::new()), temp_dir.path(), false);

        let (state, events) = collect(&[], &coordinator);

        assert_eq!(state, BatchState::Complete);
        assert!(matches!(
            events.first(),
            Some(BatchEvent::ScanCompleted {
                total_videos: 0,
                total_thumbnails: 0
            })
        ));
    }

    #[test]
    fn test_dispatch_events_invokes_callbacks() {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let video = PathBuf::from("/videos/a.mp4");
        emit(
            &sender,
            BatchEvent::VideoUpdated(VideoThumbnails::empty(&video, 0.0)),
        );
        emit(
            &sender,
            BatchEvent::VideoError {
                video_path: video.clone(),
                message: "boom".to_string(),
            },
        );
        emit(
            &sender,
            BatchEvent::Completed {
                state: BatchState::Complete,
            },
        );

        let mut updates = 0;
        let mut errors = Vec::new();
        let mut completions = 0;
        let state = {
            let mut callbacks = BatchCallbacks {
                on_update: Some(Box::new(|_| updates += 1)),
                on_error: Some(Box::new(|_, message| errors.push(message.to_string()))),
                on_complete: Some(Box::new(|_| completions += 1)),
                ..BatchCallbacks::default()
            };
            dispatch_events(&receiver, &mut callbacks)
        };

        assert_eq!(state, BatchState::Complete);
        assert_eq!(updates, 1);
        assert_eq!(errors, vec!["boom"]);
        assert_eq!(completions, 1);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }
}
