// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 检测系统数据结构定义
/// Data structures for the detection pipeline
use chrono::{DateTime, Local};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::{Result, SentinelError};

// ========== 数据结构 ==========

/// 采集帧 (采集线程 → 各槽位,每个槽位持有独立副本)
#[derive(Clone, Debug)]
pub struct Frame {
    pub frame_id: u64,          // 帧序号
    pub captured_at: Instant,   // 单调时钟
    pub timestamp: DateTime<Local>,
    pub rgb_data: Vec<u8>,      // RGB8, 行优先
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn from_image(frame_id: u64, image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            frame_id,
            captured_at: Instant::now(),
            timestamp: Local::now(),
            rgb_data: image.into_raw(),
            width,
            height,
        }
    }

    /// 拷贝出一份 RgbImage (缓冲区尺寸不符时返回 None)
    pub fn to_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.rgb_data.clone())
    }

    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>> {
        let image = self.to_image().ok_or_else(|| {
            SentinelError::Recorder(format!(
                "帧{}缓冲区尺寸不符: {} 字节 vs {}x{}",
                self.frame_id,
                self.rgb_data.len(),
                self.width,
                self.height
            ))
        })?;
        encode_jpeg(&image, quality)
    }
}

/// RGB图像 → JPEG字节
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(image.as_raw().len() / 8);
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    encoder.encode_image(image)?;
    Ok(buf)
}

/// 检测框 (Detection bounding box)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: u32,
}

impl BBox {
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// 裁剪到画面范围内,并保证 x1<=x2, y1<=y2
    pub fn clamped(&self, width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        let (x1, x2) = (self.x1.min(self.x2), self.x1.max(self.x2));
        let (y1, y2) = (self.y1.min(self.y2), self.y1.max(self.y2));
        Self {
            x1: x1.clamp(0.0, w),
            y1: y1.clamp(0.0, h),
            x2: x2.clamp(0.0, w),
            y2: y2.clamp(0.0, h),
            confidence: self.confidence.clamp(0.0, 1.0),
            class_id: self.class_id,
        }
    }
}

/// 检测结果 (检测线程 → 录像/云台/推流), 发布后不可变
#[derive(Clone, Debug, Default)]
pub struct DetectionResult {
    pub frame_id: u64, // 对应的帧序号
    pub width: u32,
    pub height: u32,
    pub bboxes: Vec<BBox>,
    pub inference_ms: f64,
}

impl DetectionResult {
    /// 置信度 >= threshold 的检测框数量
    pub fn count_at_least(&self, threshold: f32) -> usize {
        self.bboxes
            .iter()
            .filter(|b| b.confidence >= threshold)
            .count()
    }

    /// 指定类别中置信度最高且 >= threshold 的检测框
    pub fn best_of_class(&self, class_id: u32, threshold: f32) -> Option<&BBox> {
        self.bboxes
            .iter()
            .filter(|b| b.class_id == class_id && b.confidence >= threshold)
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
    }
}
