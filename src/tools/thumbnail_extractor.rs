//! 單一時間點縮圖擷取
//!
//! 依序嘗試 `STRATEGIES` 中的命令變體，第一個產生有效圖片的變體勝出；
//! 全部失敗時寫入灰色替代圖，保證每個時間點都有對應檔案。

use crate::config::GenerationParameters;
use crate::tools::fs_helpers::remove_file_quietly;
use crate::tools::media_tool::MediaTool;
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// 每次擷取嘗試的逾時
pub const EXTRACTION_TIMEOUT: Duration = Duration::from_secs(45);

/// 小於此大小的輸出一律視為失敗
pub const MIN_THUMBNAIL_BYTES: u64 = 100;

/// 替代圖的灰階值
const PLACEHOLDER_GRAY: u8 = 128;

/// 兩段式 seek 的前置緩衝（秒）
const SPLIT_SEEK_PREROLL: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekPlacement {
    /// `-ss` 在 `-i` 前（快速跳到關鍵幀）
    BeforeInput,
    /// `-ss` 在 `-i` 後（逐幀解碼，較慢但精準）
    AfterInput,
    /// 先跳到目標前 0.5 秒，再精準解碼剩下的距離
    Split,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Mjpeg,
    Image2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// `scale=W:-1,format=yuv420p`
    ScaleFormat,
    /// `scale=W:-2`
    ScaleOnly,
}

/// 一種擷取命令變體
#[derive(Debug, Clone, Copy)]
pub struct ExtractionStrategy {
    pub name: &'static str,
    pub hwaccel: Option<&'static str>,
    pub seek: SeekPlacement,
    /// 加在目標時間點上的偏移（秒），用來避開剛好落在關鍵幀邊界
    pub seek_offset: f64,
    pub copyts: bool,
    pub pixel_format: Option<&'static str>,
    pub output: OutputMode,
    pub filter: FilterMode,
    pub drop_audio: bool,
    pub log_level: &'static str,
}

impl ExtractionStrategy {
    const fn software(name: &'static str) -> Self {
        Self {
            name,
            hwaccel: None,
            seek: SeekPlacement::BeforeInput,
            seek_offset: 0.0,
            copyts: false,
            pixel_format: None,
            output: OutputMode::Mjpeg,
            filter: FilterMode::ScaleFormat,
            drop_audio: false,
            log_level: "error",
        }
    }

    /// 組出完整的命令列參數
    #[must_use]
    pub fn build_args(
        &self,
        video_path: &Path,
        timestamp: f64,
        output_path: &Path,
        params: &GenerationParameters,
    ) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            self.log_level.into(),
        ];

        if let Some(hwaccel) = self.hwaccel {
            args.extend(["-hwaccel".to_string(), hwaccel.to_string()]);
        }
        if self.copyts {
            args.push("-copyts".into());
        }

        let target = (timestamp + self.seek_offset).max(0.0);
        let input = video_path.to_string_lossy().to_string();
        match self.seek {
            SeekPlacement::BeforeInput => {
                args.extend(["-ss".to_string(), format_seconds(target), "-i".to_string(), input]);
            }
            SeekPlacement::AfterInput => {
                args.extend(["-i".to_string(), input, "-ss".to_string(), format_seconds(target)]);
            }
            SeekPlacement::Split => {
                let coarse = (target - SPLIT_SEEK_PREROLL).max(0.0);
                args.extend([
                    "-ss".to_string(),
                    format_seconds(coarse),
                    "-i".to_string(),
                    input,
                    "-ss".to_string(),
                    format_seconds(target - coarse),
                ]);
            }
        }

        let width = params.thumbnail_width;
        let filter = match self.filter {
            FilterMode::ScaleFormat => format!("scale={width}:-1,format=yuv420p"),
            FilterMode::ScaleOnly => format!("scale={width}:-2"),
        };
        args.extend(["-vf".to_string(), filter]);

        if let Some(pixel_format) = self.pixel_format {
            args.extend(["-pix_fmt".to_string(), pixel_format.to_string()]);
        }

        args.extend(["-vframes".to_string(), "1".to_string()]);
        if self.drop_audio {
            args.push("-an".into());
        }

        let quality = params.quality.to_string();
        match self.output {
            OutputMode::Mjpeg => {
                args.extend([
                    "-qscale:v".to_string(),
                    quality,
                    "-c:v".to_string(),
                    "mjpeg".to_string(),
                ]);
            }
            OutputMode::Image2 => {
                args.extend([
                    "-f".to_string(),
                    "image2".to_string(),
                    "-qscale:v".to_string(),
                    quality,
                ]);
            }
        }

        args.extend(["-y".to_string(), output_path.to_string_lossy().to_string()]);
        args
    }
}

/// 擷取命令變體，依嘗試順序排列
pub const STRATEGIES: [ExtractionStrategy; 8] = [
    ExtractionStrategy {
        hwaccel: Some("cuda"),
        ..ExtractionStrategy::software("cuda")
    },
    ExtractionStrategy::software("software"),
    ExtractionStrategy {
        seek: SeekPlacement::AfterInput,
        ..ExtractionStrategy::software("seek_after_input")
    },
    ExtractionStrategy {
        copyts: true,
        output: OutputMode::Image2,
        drop_audio: true,
        ..ExtractionStrategy::software("copyts_image2")
    },
    ExtractionStrategy {
        seek: SeekPlacement::Split,
        ..ExtractionStrategy::software("split_seek")
    },
    ExtractionStrategy {
        pixel_format: Some("yuvj420p"),
        ..ExtractionStrategy::software("full_range_pixels")
    },
    ExtractionStrategy {
        seek: SeekPlacement::AfterInput,
        seek_offset: 0.05,
        ..ExtractionStrategy::software("nudged_seek")
    },
    ExtractionStrategy {
        seek: SeekPlacement::AfterInput,
        output: OutputMode::Image2,
        filter: FilterMode::ScaleOnly,
        log_level: "warning",
        ..ExtractionStrategy::software("minimal")
    },
];

fn format_seconds(seconds: f64) -> String {
    format!("{seconds:.3}")
}

/// 每次嘗試前送出的命令紀錄
#[derive(Debug, Clone)]
pub struct CommandTrace {
    pub command: String,
    pub thumbnail_path: PathBuf,
    pub video_path: PathBuf,
    pub strategy: &'static str,
}

/// 縮圖擷取任務
#[derive(Debug, Clone)]
pub struct ThumbnailTask {
    pub video_path: PathBuf,
    pub timestamp: f64,
    pub output_path: PathBuf,
    pub index: usize,
}

/// 縮圖擷取結果
#[derive(Debug, Clone)]
pub struct ThumbnailResult {
    /// 相對於影片快取資料夾的檔名
    pub filename: String,
    pub output_path: PathBuf,
    pub index: usize,
    pub timestamp: f64,
    pub is_placeholder: bool,
    /// 成功的變體名稱；替代圖為 `None`
    pub strategy: Option<&'static str>,
}

#[must_use]
pub fn thumbnail_file_name(index: usize) -> String {
    format!("thumb_{index:03}.jpg")
}

/// 建立縮圖任務列表
#[must_use]
pub fn create_thumbnail_tasks(
    video_path: &Path,
    timestamps: &[f64],
    output_dir: &Path,
) -> Vec<ThumbnailTask> {
    timestamps
        .iter()
        .enumerate()
        .map(|(i, &timestamp)| ThumbnailTask {
            video_path: video_path.to_path_buf(),
            timestamp,
            output_path: output_dir.join(thumbnail_file_name(i)),
            index: i,
        })
        .collect()
}

type CommandObserver<'a> = &'a (dyn Fn(&CommandTrace) + Sync);

pub struct ThumbnailExtractor<'a> {
    tool: &'a dyn MediaTool,
    params: &'a GenerationParameters,
    strategies: &'a [ExtractionStrategy],
    timeout: Duration,
    observer: Option<CommandObserver<'a>>,
}

impl<'a> ThumbnailExtractor<'a> {
    #[must_use]
    pub fn new(tool: &'a dyn MediaTool, params: &'a GenerationParameters) -> Self {
        Self {
            tool,
            params,
            strategies: &STRATEGIES,
            timeout: EXTRACTION_TIMEOUT,
            observer: None,
        }
    }

    #[must_use]
    pub fn with_strategies(mut self, strategies: &'a [ExtractionStrategy]) -> Self {
        self.strategies = strategies;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: CommandObserver<'a>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// 擷取單一縮圖
    ///
    /// 收到停止信號時回傳 `Ok(None)`；`Err` 只會發生在連替代圖都寫不出來時。
    pub fn extract(
        &self,
        task: &ThumbnailTask,
        shutdown_signal: &AtomicBool,
    ) -> Result<Option<ThumbnailResult>> {
        let filename = task
            .output_path
            .file_name()
            .map_or_else(|| thumbnail_file_name(task.index), |n| n.to_string_lossy().to_string());

        for strategy in self.strategies {
            if shutdown_signal.load(Ordering::SeqCst) {
                return Ok(None);
            }

            let args =
                strategy.build_args(&task.video_path, task.timestamp, &task.output_path, self.params);

            if let Some(observer) = self.observer {
                observer(&CommandTrace {
                    command: self.tool.command_line(&args),
                    thumbnail_path: task.output_path.clone(),
                    video_path: task.video_path.clone(),
                    strategy: strategy.name,
                });
            }

            match self.attempt(&args, &task.output_path) {
                Ok(()) => {
                    debug!(
                        "縮圖 {} 擷取成功（{}）: {:.2}s",
                        task.index, strategy.name, task.timestamp
                    );
                    return Ok(Some(ThumbnailResult {
                        filename,
                        output_path: task.output_path.clone(),
                        index: task.index,
                        timestamp: task.timestamp,
                        is_placeholder: false,
                        strategy: Some(strategy.name),
                    }));
                }
                Err(reason) => {
                    debug!(
                        "縮圖 {} 變體 {} 失敗: {reason}",
                        task.index, strategy.name
                    );
                    remove_file_quietly(&task.output_path);
                }
            }
        }

        warn!(
            "所有擷取方式皆失敗，改用替代圖: {} @ {:.2}s",
            task.video_path.display(),
            task.timestamp
        );
        write_placeholder(&task.output_path, self.params)?;

        Ok(Some(ThumbnailResult {
            filename,
            output_path: task.output_path.clone(),
            index: task.index,
            timestamp: task.timestamp,
            is_placeholder: true,
            strategy: None,
        }))
    }

    fn attempt(&self, args: &[String], output_path: &Path) -> std::result::Result<(), String> {
        let output = self
            .tool
            .run(args, self.timeout)
            .map_err(|e| format!("{e:#}"))?;

        if output.timed_out {
            return Err("逾時".to_string());
        }
        if !output.success {
            return Err(format!(
                "結束代碼 {:?}: {}",
                output.exit_code,
                output.stderr_excerpt(200)
            ));
        }
        validate_thumbnail(output_path)
    }

    /// 依序擷取全部時間點，每完成一張回報該影片的進度百分比
    ///
    /// 收到停止信號時回傳 `Ok(None)`。
    pub fn extract_all(
        &self,
        tasks: &[ThumbnailTask],
        shutdown_signal: &AtomicBool,
        mut on_progress: impl FnMut(f64),
    ) -> Result<Option<Vec<ThumbnailResult>>> {
        let total = tasks.len();
        let mut results = Vec::with_capacity(total);

        for (i, task) in tasks.iter().enumerate() {
            let Some(result) = self.extract(task, shutdown_signal)? else {
                return Ok(None);
            };
            results.push(result);
            on_progress((i + 1) as f64 / total as f64 * 100.0);
        }

        Ok(Some(results))
    }
}

/// 輸出檔需存在、大於最小大小且能完整解碼
fn validate_thumbnail(path: &Path) -> std::result::Result<(), String> {
    let size = fs::metadata(path)
        .map_err(|_| "輸出檔案不存在".to_string())?
        .len();
    if size <= MIN_THUMBNAIL_BYTES {
        return Err(format!("輸出檔案過小（{size} bytes）"));
    }
    image::open(path).map_err(|e| format!("輸出檔案不是有效圖片: {e}"))?;
    Ok(())
}

/// 寫入灰色替代圖（寬 × 寬*9/16）
pub fn write_placeholder(path: &Path, params: &GenerationParameters) -> Result<()> {
    let width = params.thumbnail_width.max(1);
    let height = params.thumbnail_height();
    let image = RgbImage::from_pixel(width, height, Rgb([PLACEHOLDER_GRAY; 3]));
    image
        .save(path)
        .with_context(|| format!("無法寫入替代圖: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::media_tool::ToolOutput;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// 前 `failures` 次呼叫失敗，之後寫出真正的 JPEG
    struct FlakyTool {
        failures: usize,
        calls: AtomicUsize,
    }

    impl FlakyTool {
        fn new(failures: usize) -> Self {
            Self {
                failures,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl MediaTool for FlakyTool {
        fn program(&self) -> &str {
            "fake"
        }

        fn run(&self, args: &[String], _timeout: Duration) -> anyhow::Result<ToolOutput> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let output = PathBuf::from(args.last().unwrap());
            if call < self.failures {
                // 有些失敗仍會留下殘缺檔案
                fs::write(&output, b"garbage").unwrap();
                return Ok(ToolOutput {
                    success: true,
                    exit_code: Some(0),
                    ..ToolOutput::default()
                });
            }
            RgbImage::from_pixel(64, 36, Rgb([10, 200, 30])).save(&output).unwrap();
            Ok(ToolOutput {
                success: true,
                exit_code: Some(0),
                ..ToolOutput::default()
            })
        }
    }

    fn task(dir: &Path) -> ThumbnailTask {
        create_thumbnail_tasks(Path::new("/videos/movie.mp4"), &[12.5], dir).remove(0)
    }

    #[test]
    fn test_last_strategy_success_is_real_thumbnail() {
        let temp_dir = TempDir::new().unwrap();
        let tool = FlakyTool::new(STRATEGIES.len() - 1);
        let params = GenerationParameters::default();
        let extractor = ThumbnailExtractor::new(&tool, &params);

        let result = extractor
            .extract(&task(temp_dir.path()), &AtomicBool::new(false))
            .unwrap()
            .unwrap();

        assert!(!result.is_placeholder);
        assert_eq!(result.strategy, Some("minimal"));
        assert_eq!(result.filename, "thumb_000.jpg");
        assert_eq!(tool.calls.load(Ordering::SeqCst), STRATEGIES.len());
        assert_eq!(image::open(&result.output_path).unwrap().to_rgb8().width(), 64);
    }

    #[test]
    fn test_all_strategies_fail_writes_placeholder() {
        let temp_dir = TempDir::new().unwrap();
        let tool = FlakyTool::new(usize::MAX);
        let params = GenerationParameters {
            thumbnail_width: 320,
            ..GenerationParameters::default()
        };
        let extractor = ThumbnailExtractor::new(&tool, &params);

        let result = extractor
            .extract(&task(temp_dir.path()), &AtomicBool::new(false))
            .unwrap()
            .unwrap();

        assert!(result.is_placeholder);
        assert_eq!(result.strategy, None);
        let image = image::open(&result.output_path).unwrap().to_rgb8();
        assert_eq!(image.dimensions(), (320, 180));
        let pixel = image.get_pixel(160, 90);
        for channel in pixel.0 {
            assert!(channel.abs_diff(PLACEHOLDER_GRAY) <= 2);
        }
    }

    #[test]
    fn test_stop_before_first_attempt() {
        let temp_dir = TempDir::new().unwrap();
        let tool = FlakyTool::new(0);
        let params = GenerationParameters::default();
        let extractor = ThumbnailExtractor::new(&tool, &params);

        let result = extractor
            .extract(&task(temp_dir.path()), &AtomicBool::new(true))
            .unwrap();

        assert!(result.is_none());
        assert_eq!(tool.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_observer_sees_each_attempt() {
        let temp_dir = TempDir::new().unwrap();
        let tool = FlakyTool::new(2);
        let params = GenerationParameters::default();
        let seen = Mutex::new(Vec::new());
        let observer = |trace: &CommandTrace| seen.lock().unwrap().push(trace.strategy);
        let extractor = ThumbnailExtractor::new(&tool, &params).with_observer(&observer);

        extractor
            .extract(&task(temp_dir.path()), &AtomicBool::new(false))
            .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["cuda", "software", "seek_after_input"]
        );
    }

    #[test]
    fn test_extract_all_reports_progress() {
        let temp_dir = TempDir::new().unwrap();
        let tool = FlakyTool::new(0);
        let params = GenerationParameters::default();
        let extractor = ThumbnailExtractor::new(&tool, &params);
        let tasks = create_thumbnail_tasks(
            Path::new("/videos/movie.mp4"),
            &[1.0, 2.0, 3.0, 4.0],
            temp_dir.path(),
        );

        let mut progress = Vec::new();
        let results = extractor
            .extract_all(&tasks, &AtomicBool::new(false), |p| progress.push(p))
            .unwrap()
            .unwrap();

        assert_eq!(results.len(), 4);
        assert_eq!(progress, vec![25.0, 50.0, 75.0, 100.0]);
        assert_eq!(results[3].filename, "thumb_003.jpg");
    }

    #[test]
    fn test_validate_rejects_small_and_corrupt_files() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("thumb_000.jpg");
        assert!(validate_thumbnail(&path).is_err());

        fs::write(&path, vec![0u8; 50]).unwrap();
        assert!(validate_thumbnail(&path).is_err());

        fs::write(&path, vec![0xAB; 500]).unwrap();
        assert!(validate_thumbnail(&path).is_err());
    }

    fn render(strategy: &ExtractionStrategy, timestamp: f64) -> String {
        let params = GenerationParameters {
            thumbnail_width: 320,
            quality: 4,
            ..GenerationParameters::default()
        };
        strategy
            .build_args(Path::new("in.mp4"), timestamp, Path::new("out.jpg"), &params)
            .join(" ")
    }

    #[test]
    fn test_strategy_args() {
        let vf = "-vf scale=320:-1,format=yuv420p";
        let expected = [
            format!("-hide_banner -loglevel error -hwaccel cuda -ss 10.000 -i in.mp4 {vf} -vframes 1 -qscale:v 4 -c:v mjpeg -y out.jpg"),
            format!("-hide_banner -loglevel error -ss 10.000 -i in.mp4 {vf} -vframes 1 -qscale:v 4 -c:v mjpeg -y out.jpg"),
            format!("-hide_banner -loglevel error -i in.mp4 -ss 10.000 {vf} -vframes 1 -qscale:v 4 -c:v mjpeg -y out.jpg"),
            format!("-hide_banner -loglevel error -copyts -ss 10.000 -i in.mp4 {vf} -vframes 1 -an -f image2 -qscale:v 4 -y out.jpg"),
            format!("-hide_banner -loglevel error -ss 9.500 -i in.mp4 -ss 0.500 {vf} -vframes 1 -qscale:v 4 -c:v mjpeg -y out.jpg"),
            format!("-hide_banner -loglevel error -ss 10.000 -i in.mp4 {vf} -pix_fmt yuvj420p -vframes 1 -qscale:v 4 -c:v mjpeg -y out.jpg"),
            format!("-hide_banner -loglevel error -i in.mp4 -ss 10.050 {vf} -vframes 1 -qscale:v 4 -c:v mjpeg -y out.jpg"),
            "-hide_banner -loglevel warning -i in.mp4 -ss 10.000 -vf scale=320:-2 -vframes 1 -f image2 -qscale:v 4 -y out.jpg".to_string(),
        ];
        for (strategy, expected) in STRATEGIES.iter().zip(expected) {
            assert_eq!(render(strategy, 10.0), expected, "{}", strategy.name);
        }
    }

    #[test]
    fn test_split_seek_near_start() {
        let args = render(&STRATEGIES[4], 0.2);
        assert!(args.contains("-ss 0.000 -i in.mp4 -ss 0.200"), "{args}");
    }

    #[test]
    fn test_strategy_names_unique() {
        let mut names: Vec<_> = STRATEGIES.iter().map(|s| s.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), STRATEGIES.len());
    }
}
