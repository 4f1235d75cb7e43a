// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 检测线程模块
/// Detection stage: detect_frames 槽 → 检测器 → results / overlay 槽
use std::time::Instant;
use tracing::{debug, info, warn};

use super::detector::Detector;
use super::types::{DetectionResult, Frame};
use crate::pipeline::PipelineContext;

pub struct DetectionStage<D: Detector> {
    detector: D,
    display_threshold: f32,

    // 统计
    count: u64,
    failures: u64,
    last: Instant,
}

impl<D: Detector> DetectionStage<D> {
    pub fn new(detector: D, display_threshold: f32) -> Self {
        Self {
            detector,
            display_threshold,
            count: 0,
            failures: 0,
            last: Instant::now(),
        }
    }

    /// 处理一帧。检测失败时返回 None (本帧不发布结果)。
    pub fn process(&mut self, frame: &Frame) -> Option<DetectionResult> {
        let start = Instant::now();
        let raw = match self.detector.detect(frame) {
            Ok(boxes) => boxes,
            Err(e) => {
                self.failures += 1;
                warn!(frame_id = frame.frame_id, "⚠️  检测失败: {}", e);
                return None;
            }
        };
        let inference_ms = start.elapsed().as_secs_f64() * 1000.0;

        // 裁剪到画面内,低于显示阈值的框直接丢弃
        let bboxes: Vec<_> = raw
            .iter()
            .map(|b| b.clamped(frame.width, frame.height))
            .filter(|b| b.confidence >= self.display_threshold)
            .collect();

        if !bboxes.is_empty() {
            debug!(frame_id = frame.frame_id, count = bboxes.len(), "🎯 检测到目标");
        }

        self.count += 1;
        if self.last.elapsed().as_secs_f64() >= 1.0 {
            let elapsed = self.last.elapsed().as_secs_f64();
            info!(
                "📊 推理统计: 处理{}帧 | 实际{:.1}fps | 每帧{:.1}ms | 累计失败{}",
                self.count,
                self.count as f64 / elapsed,
                inference_ms,
                self.failures
            );
            self.last = Instant::now();
            self.count = 0;
        }

        Some(DetectionResult {
            frame_id: frame.frame_id,
            width: frame.width,
            height: frame.height,
            bboxes,
            inference_ms,
        })
    }

    pub fn run(&mut self, ctx: &PipelineContext) {
        info!("🔍 检测线程启动: {}", self.detector.name());

        while ctx.is_running() {
            let Some(frame) = ctx.detect_frames.take() else {
                ctx.shutdown.sleep(ctx.idle_interval);
                continue;
            };

            if let Some(result) = self.process(&frame) {
                ctx.overlay.publish(result.clone());
                ctx.results.publish(result);
            }
        }

        info!("✅ 检测线程退出");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::BBox;
    use crate::testing::ScriptedDetector;
    use image::RgbImage;

    fn frame() -> Frame {
        Frame::from_image(3, RgbImage::new(640, 480))
    }

    #[test]
    fn filters_below_display_threshold_and_clamps() {
        let detector = ScriptedDetector::new(vec![Ok(vec![
            BBox { x1: -5.0, y1: 10.0, x2: 100.0, y2: 900.0, confidence: 0.9, class_id: 0 },
            BBox { x1: 0.0, y1: 0.0, x2: 5.0, y2: 5.0, confidence: 0.1, class_id: 0 },
        ])]);
        let mut stage = DetectionStage::new(detector, 0.25);
        let result = stage.process(&frame()).unwrap();
        assert_eq!(result.frame_id, 3);
        assert_eq!(result.bboxes.len(), 1);
        assert_eq!(result.bboxes[0].x1, 0.0);
        assert_eq!(result.bboxes[0].y2, 480.0);
    }

    #[test]
    fn detector_failure_publishes_nothing_and_next_cycle_proceeds() {
        let detector = ScriptedDetector::new(vec![
            Err(crate::SentinelError::Detector("boom".into())),
            Ok(vec![]),
        ]);
        let mut stage = DetectionStage::new(detector, 0.25);
        assert!(stage.process(&frame()).is_none());
        assert!(stage.process(&frame()).is_some());
    }
}
