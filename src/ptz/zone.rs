// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 3×3 区域划分
//!
//! 画面宽高各按 1/3、2/3 切分。目标中心落在角区 → 两次脉冲 (先水平后垂直),
//! 边区 → 一次脉冲, 中心区 → 不动。

use super::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zone {
    /// 水平方向需要的修正 (None = 中间列)
    pub pan: Option<Direction>,
    /// 垂直方向需要的修正 (None = 中间行)
    pub tilt: Option<Direction>,
}

impl Zone {
    pub fn classify(cx: f32, cy: f32, width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        let pan = if cx < w / 3.0 {
            Some(Direction::Left)
        } else if cx > 2.0 * w / 3.0 {
            Some(Direction::Right)
        } else {
            None
        };
        let tilt = if cy < h / 3.0 {
            Some(Direction::Up)
        } else if cy > 2.0 * h / 3.0 {
            Some(Direction::Down)
        } else {
            None
        };
        Self { pan, tilt }
    }

    pub fn is_center(&self) -> bool {
        self.pan.is_none() && self.tilt.is_none()
    }
}

/// 目标中心 → 单轴脉冲序列
pub fn pulse_plan(cx: f32, cy: f32, width: u32, height: u32) -> Vec<Direction> {
    let zone = Zone::classify(cx, cy, width, height);
    zone.pan.into_iter().chain(zone.tilt).collect()
}
