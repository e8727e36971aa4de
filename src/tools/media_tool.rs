//! 外部媒體工具（ffmpeg）呼叫層
//!
//! 所有對外部程式的呼叫都經過 `MediaTool`，時長解析與縮圖擷取
//! 只依賴這個介面，測試時以假工具取代。

use anyhow::{Context, Result};
use log::{trace, warn};
use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// 輪詢子程序狀態的間隔
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// 外部工具執行結果
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stderr: String,
    pub timed_out: bool,
}

impl ToolOutput {
    /// stderr 前段摘要，用於日誌
    #[must_use]
    pub fn stderr_excerpt(&self, max_chars: usize) -> String {
        self.stderr.trim().chars().take(max_chars).collect()
    }
}

/// 外部媒體工具
///
/// `Err` 只代表工具本身無法啟動；工具執行失敗或逾時以 `ToolOutput` 表示。
pub trait MediaTool: Send + Sync {
    fn program(&self) -> &str;

    fn run(&self, args: &[String], timeout: Duration) -> Result<ToolOutput>;

    /// 組合成可讀的命令列字串（供觀察用）
    fn command_line(&self, args: &[String]) -> String {
        let mut line = self.program().to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// 以子程序執行 ffmpeg
#[derive(Debug, Clone)]
pub struct FfmpegTool {
    program: String,
}

impl Default for FfmpegTool {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegTool {
    #[must_use]
    pub fn new(program: &str) -> Self {
        let program = program.trim();
        Self {
            program: if program.is_empty() {
                "ffmpeg".to_string()
            } else {
                program.to_string()
            },
        }
    }
}

impl MediaTool for FfmpegTool {
    fn program(&self) -> &str {
        &self.program
    }

    fn run(&self, args: &[String], timeout: Duration) -> Result<ToolOutput> {
        trace!("執行: {}", self.command_line(args));

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("無法執行 {}", self.program))?;

        // stderr 由獨立執行緒讀取，避免管線塞滿導致子程序卡住
        let stderr_reader = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut buffer = Vec::new();
                let _ = pipe.read_to_end(&mut buffer);
                String::from_utf8_lossy(&buffer).into_owned()
            })
        });

        let started = Instant::now();
        let (status, timed_out) = loop {
            match child.try_wait() {
                Ok(Some(status)) => break (Some(status), false),
                Ok(None) => {
                    if started.elapsed() >= timeout {
                        warn!(
                            "{} 執行逾時（{:.0}s），終止程序",
                            self.program,
                            timeout.as_secs_f64()
                        );
                        let _ = child.kill();
                        let _ = child.wait();
                        break (None, true);
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    warn!("無法檢查程序狀態: {e}");
                    let _ = child.kill();
                    let _ = child.wait();
                    break (None, false);
                }
            }
        };

        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        Ok(ToolOutput {
            success: status.is_some_and(|s| s.success()),
            exit_code: status.and_then(|s| s.code()),
            stderr,
            timed_out,
        })
    }
}
