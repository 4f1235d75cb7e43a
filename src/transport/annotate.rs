// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 检测框标注 (推流前在帧上绘制检测结果)
use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::Path;

use crate::detection::DetectionResult;
use crate::error::{Result, SentinelError};

// 类别调色板,按 class_id 取模
const PALETTE: [[u8; 3]; 8] = [
    [0, 255, 0],
    [255, 56, 56],
    [255, 157, 151],
    [255, 112, 31],
    [72, 249, 10],
    [0, 194, 255],
    [52, 69, 147],
    [255, 55, 199],
];

const LABEL_SCALE: f32 = 16.0;
const BORDER: i32 = 2;

pub fn class_color(class_id: u32) -> Rgb<u8> {
    Rgb(PALETTE[class_id as usize % PALETTE.len()])
}

#[derive(Default)]
pub struct Annotator {
    font: Option<FontVec>,
}

impl Annotator {
    pub fn new(font: Option<FontVec>) -> Self {
        Self { font }
    }

    /// 加载 TTF/OTF 字体用于绘制标签。没有字体时只画框。
    pub fn with_font_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let font = FontVec::try_from_vec(bytes).map_err(|e| {
            SentinelError::Config(format!("无法加载字体 {}: {}", path.display(), e))
        })?;
        Ok(Self::new(Some(font)))
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// 在图像上绘制检测框与标签。结果尺寸与图像不一致时按比例缩放。
    pub fn annotate(&self, image: &mut RgbImage, result: &DetectionResult) {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return;
        }
        let sx = if result.width > 0 { w as f32 / result.width as f32 } else { 1.0 };
        let sy = if result.height > 0 { h as f32 / result.height as f32 } else { 1.0 };

        for bbox in &result.bboxes {
            let x1 = (bbox.x1 * sx).round() as i32;
            let y1 = (bbox.y1 * sy).round() as i32;
            let bw = ((bbox.width() * sx).round() as i32).max(1) as u32;
            let bh = ((bbox.height() * sy).round() as i32).max(1) as u32;
            let color = class_color(bbox.class_id);

            // 加粗边框
            for t in 0..BORDER {
                let rect = Rect::at(x1 - t, y1 - t).of_size(bw + 2 * t as u32, bh + 2 * t as u32);
                draw_hollow_rect_mut(image, rect, color);
            }

            if let Some(font) = &self.font {
                let label = format!("ID:{} {:.2}", bbox.class_id, bbox.confidence);
                let ty = (y1 - LABEL_SCALE as i32 - BORDER).max(0);
                draw_text_mut(image, color, x1.max(0), ty, PxScale::from(LABEL_SCALE), font, &label);
            }
        }
    }
}
