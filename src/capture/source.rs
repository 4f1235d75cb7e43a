// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 帧源 (Frame sources)
//!
//! ImageFolderSource: 按文件名顺序读取目录中的图片,可循环播放,
//! 用于没有摄像头的开发机与回放测试。

use image::imageops::FilterType;
use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{Result, SentinelError};

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

pub trait FrameSource: Send {
    /// 打开失败视为致命错误
    fn open(&mut self) -> Result<()>;

    /// 读取下一帧,流结束返回 None
    fn read(&mut self) -> Result<Option<RgbImage>>;

    fn name(&self) -> String;
}

pub struct ImageFolderSource {
    dir: PathBuf,
    width: u32,
    height: u32,
    looping: bool,
    files: Vec<PathBuf>,
    index: usize,
}

impl ImageFolderSource {
    /// width/height 为 0 时保持原尺寸
    pub fn new(dir: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self {
            dir: dir.into(),
            width,
            height,
            looping: true,
            files: Vec::new(),
            index: 0,
        }
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn is_image(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }

    fn load(&self, path: &Path) -> Result<RgbImage> {
        let image = image::open(path)?.to_rgb8();
        if self.width == 0 || self.height == 0 || image.dimensions() == (self.width, self.height) {
            return Ok(image);
        }
        Ok(image::imageops::resize(&image, self.width, self.height, FilterType::Triangle))
    }
}

impl FrameSource for ImageFolderSource {
    fn open(&mut self) -> Result<()> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            SentinelError::SourceUnavailable(format!("{}: {}", self.dir.display(), e))
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && Self::is_image(path))
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(SentinelError::SourceUnavailable(format!(
                "{} 中没有图片",
                self.dir.display()
            )));
        }

        info!("📂 图片源: {} ({}张, 循环={})", self.dir.display(), files.len(), self.looping);
        self.files = files;
        self.index = 0;
        Ok(())
    }

    fn read(&mut self) -> Result<Option<RgbImage>> {
        if self.index >= self.files.len() {
            if !self.looping || self.files.is_empty() {
                return Ok(None);
            }
            self.index = 0;
        }
        let path = self.files[self.index].clone();
        self.index += 1;
        self.load(&path).map(Some)
    }

    fn name(&self) -> String {
        format!("folder:{}", self.dir.display())
    }
}
