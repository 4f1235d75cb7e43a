// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 录像文件写入
//!
//! MJPEG: 逐帧拼接的 JPEG 字节流,文件名 `recording_YYYYmmdd_HHMMSS.mjpeg`。
//! 输出目录在第一次录像时才创建。

use chrono::{DateTime, Local};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{Result, SentinelError};

/// 已打开的录像文件
pub trait VideoWriter: Send {
    fn write_frame(&mut self, jpeg: &[u8]) -> Result<()>;

    fn path(&self) -> &Path;

    fn frames(&self) -> u64;

    /// 刷盘并关闭,返回最终文件路径
    fn finish(self: Box<Self>) -> Result<PathBuf>;
}

/// 按开始时间创建新的录像文件
pub trait RecorderFactory: Send + Sync {
    fn create(&self, started_at: DateTime<Local>) -> Result<Box<dyn VideoWriter>>;
}

pub fn recording_file_name(started_at: &DateTime<Local>) -> String {
    format!("recording_{}.mjpeg", started_at.format("%Y%m%d_%H%M%S"))
}

pub struct MjpegRecorder {
    output_dir: PathBuf,
}

impl MjpegRecorder {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// 同一秒内的多次录像追加序号,不覆盖已有文件
    fn create_unique(&self, started_at: &DateTime<Local>) -> Result<(PathBuf, File)> {
        let base = recording_file_name(started_at);
        let stem = base.trim_end_matches(".mjpeg");
        for n in 0..100u32 {
            let name = if n == 0 {
                base.clone()
            } else {
                format!("{}_{}.mjpeg", stem, n)
            };
            let path = self.output_dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(SentinelError::Recorder(format!(
            "{} 下同名录像文件过多: {}",
            self.output_dir.display(),
            base
        )))
    }
}

impl RecorderFactory for MjpegRecorder {
    fn create(&self, started_at: DateTime<Local>) -> Result<Box<dyn VideoWriter>> {
        std::fs::create_dir_all(&self.output_dir)?;
        let (path, file) = self.create_unique(&started_at)?;
        info!("🎬 录像文件: {}", path.display());
        Ok(Box::new(MjpegWriter {
            path,
            out: BufWriter::new(file),
            frames: 0,
        }))
    }
}

struct MjpegWriter {
    path: PathBuf,
    out: BufWriter<File>,
    frames: u64,
}

impl VideoWriter for MjpegWriter {
    fn write_frame(&mut self, jpeg: &[u8]) -> Result<()> {
        self.out.write_all(jpeg)?;
        self.frames += 1;
        Ok(())
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn frames(&self) -> u64 {
        self.frames
    }

    fn finish(mut self: Box<Self>) -> Result<PathBuf> {
        self.out.flush()?;
        self.out.get_ref().sync_all()?;
        Ok(self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn file_name_follows_timestamp_pattern() {
        assert_eq!(recording_file_name(&start()), "recording_20240309_140507.mjpeg");
    }

    #[test]
    fn creates_directory_lazily_and_concatenates_frames() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested/recordings");
        let recorder = MjpegRecorder::new(&dir);
        assert!(!dir.exists());

        let mut writer = recorder.create(start()).unwrap();
        writer.write_frame(&[0xFF, 0xD8, 0xFF, 0xD9]).unwrap();
        writer.write_frame(&[0xFF, 0xD8, 0x00, 0xFF, 0xD9]).unwrap();
        assert_eq!(writer.frames(), 2);

        let path = writer.finish().unwrap();
        assert_eq!(path, dir.join("recording_20240309_140507.mjpeg"));
        assert_eq!(std::fs::read(&path).unwrap().len(), 9);
    }

    #[test]
    fn same_second_sessions_do_not_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let recorder = MjpegRecorder::new(tmp.path());
        let first = recorder.create(start()).unwrap().finish().unwrap();
        let second = recorder.create(start()).unwrap().finish().unwrap();
        assert_ne!(first, second);
        assert!(second.ends_with("recording_20240309_140507_1.mjpeg"));
    }
}
