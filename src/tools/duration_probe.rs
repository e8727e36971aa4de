use crate::tools::media_tool::MediaTool;
use anyhow::Result;
use log::warn;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

/// 讀取時長的逾時
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

// ffmpeg 診斷輸出格式: "  Duration: 00:01:40.05, start: 0.000000, bitrate: ..."
static REGEX_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Duration:\s*(\d+):(\d{1,2}):(\d{1,2}(?:\.\d+)?)").expect("Invalid regex")
});

/// 只讀取中繼資料的參數（不指定輸出檔，ffmpeg 會印出資訊後結束）
#[must_use]
pub fn probe_args(video_path: &Path) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-i".to_string(),
        video_path.to_string_lossy().to_string(),
    ]
}

/// 從 ffmpeg 診斷輸出解析第一個 `Duration: HH:MM:SS.ms`
#[must_use]
pub fn parse_duration(diagnostics: &str) -> Option<f64> {
    let caps = REGEX_DURATION.captures(diagnostics)?;
    let hours: f64 = caps.get(1)?.as_str().parse().ok()?;
    let minutes: f64 = caps.get(2)?.as_str().parse().ok()?;
    let seconds: f64 = caps.get(3)?.as_str().parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// 取得影片時長（秒）
///
/// `Err` 表示工具無法執行；工具有執行但無法解析或逾時則回傳 `Ok(0.0)`，
/// 呼叫端應將 0 視為「不可用」而非長度為零的影片。
pub fn probe_duration(tool: &dyn MediaTool, video_path: &Path) -> Result<f64> {
    let output = tool.run(&probe_args(video_path), PROBE_TIMEOUT)?;

    if output.timed_out {
        warn!("讀取時長逾時: {}", video_path.display());
        return Ok(0.0);
    }

    match parse_duration(&output.stderr) {
        Some(duration) if duration > 0.0 => Ok(duration),
        _ => {
            warn!(
                "無法解析影片時長 {}: {}",
                video_path.display(),
                output.stderr_excerpt(500)
            );
            Ok(0.0)
        }
    }
}

/// 取得影片時長，任何失敗都回傳 0
pub fn get_duration(tool: &dyn MediaTool, video_path: &Path) -> f64 {
    probe_duration(tool, video_path).unwrap_or_else(|e| {
        warn!("無法取得影片時長 {}: {e:#}", video_path.display());
        0.0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::media_tool::ToolOutput;

    struct StubTool {
        stderr: &'static str,
        timed_out: bool,
    }

    impl MediaTool for StubTool {
        fn program(&self) -> &str {
            "stub"
        }

        fn run(&self, _args: &[String], _timeout: Duration) -> Result<ToolOutput> {
            Ok(ToolOutput {
                success: false,
                exit_code: Some(1),
                stderr: self.stderr.to_string(),
                timed_out: self.timed_out,
            })
        }
    }

    struct BrokenTool;

    impl MediaTool for BrokenTool {
        fn program(&self) -> &str {
            "broken"
        }

        fn run(&self, _args: &[String], _timeout: Duration) -> Result<ToolOutput> {
            anyhow::bail!("spawn failed")
        }
    }

    #[test]
    fn test_parse_duration() {
        let output = "Input #0, mov,mp4, from 'a.mp4':\n  Duration: 01:02:03.50, start: 0.000000, bitrate: 1205 kb/s";
        let duration = parse_duration(output).unwrap();
        assert!((duration - 3723.5).abs() < 1e-9);
    }

    #[test]
    fn test_parse_duration_takes_first() {
        let output = "Duration: 00:00:10.00, start\nDuration: 00:05:00.00, start";
        assert!((parse_duration(output).unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_duration_missing_or_na() {
        assert!(parse_duration("Duration: N/A, start: 0.000000").is_none());
        assert!(parse_duration("a.txt: Invalid data found when processing input").is_none());
    }

    #[test]
    fn test_probe_duration_unparseable_is_zero() {
        let tool = StubTool {
            stderr: "Invalid data found when processing input",
            timed_out: false,
        };
        let duration = probe_duration(&tool, Path::new("/videos/a.txt")).unwrap();
        assert!(duration.abs() < f64::EPSILON);
    }

    #[test]
    fn test_probe_duration_timeout_is_zero() {
        let tool = StubTool {
            stderr: "Duration: 00:00:10.00, start",
            timed_out: true,
        };
        let duration = probe_duration(&tool, Path::new("/videos/a.mp4")).unwrap();
        assert!(duration.abs() < f64::EPSILON);
    }

    #[test]
    fn test_probe_duration_tool_missing() {
        assert!(probe_duration(&BrokenTool, Path::new("/videos/a.mp4")).is_err());
        assert!(get_duration(&BrokenTool, Path::new("/videos/a.mp4")).abs() < f64::EPSILON);
    }

    #[test]
    fn test_probe_args_metadata_only() {
        let args = probe_args(Path::new("/videos/a.mp4"));
        assert_eq!(args, vec!["-hide_banner", "-i", "/videos/a.mp4"]);
    }
}
