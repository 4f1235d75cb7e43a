// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! MJPEG → H.264 MP4 转码 (调用 ffmpeg 命令行)

use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

use crate::error::{Result, SentinelError};

pub trait Transcoder: Send {
    /// 转码生成临时文件,返回其路径。原文件保持不变。
    fn transcode(&self, input: &Path) -> Result<PathBuf>;
}

pub struct FfmpegTranscoder {
    ffmpeg: String,
    framerate: f64,
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg: impl Into<String>, framerate: f64) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            framerate,
        }
    }

    pub fn output_path(input: &Path) -> PathBuf {
        input.with_extension("mp4")
    }

    pub fn command(&self, input: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-y", "-loglevel", "error", "-f", "mjpeg", "-framerate"])
            .arg(format!("{}", self.framerate))
            .arg("-i")
            .arg(input)
            .args(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-movflags", "+faststart"])
            .arg(output);
        cmd
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(&self, input: &Path) -> Result<PathBuf> {
        let output = Self::output_path(input);
        debug!("🎞️  转码: {} → {}", input.display(), output.display());

        let result = self
            .command(input, &output)
            .output()
            .map_err(|e| SentinelError::Transcode(format!("无法运行 {}: {}", self.ffmpeg, e)))?;

        if !result.status.success() {
            // 清理半成品
            let _ = std::fs::remove_file(&output);
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(SentinelError::Transcode(format!(
                "ffmpeg 退出码 {:?}: {}",
                result.status.code(),
                stderr.trim()
            )));
        }
        Ok(output)
    }
}
