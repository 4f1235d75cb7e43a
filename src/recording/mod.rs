// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 录像系统 (Recording System)
///
/// - Hysteresis: 纯状态机 Idle / Armed(n) / Recording
/// - Writer:     MJPEG 录像文件
/// - Controller: 状态机 + 会话 + 通知 + 上传入队
/// - Manager:    results 槽 → 录像控制器 + 云台跟踪
pub mod controller;
pub mod hysteresis;
pub mod writer;

pub use controller::{RecordingController, RecordingSession};
pub use hysteresis::{HysteresisParams, Phase, Transition};
pub use writer::{recording_file_name, MjpegRecorder, RecorderFactory, VideoWriter};

use std::time::{Duration, Instant};
use tracing::info;

use crate::pipeline::PipelineContext;

/// 录像管理线程: 消费检测结果,驱动录像状态机与云台跟踪
pub struct RecordingManager {
    recording_threshold: f32,
    /// 检测停滞超过该时长时,以"无目标"推进状态机,避免录像卡住
    stale_after: Duration,
}

impl RecordingManager {
    pub fn new(recording_threshold: f32, stale_after: Duration) -> Self {
        Self {
            recording_threshold,
            stale_after,
        }
    }

    pub fn run(&self, ctx: &PipelineContext) {
        info!("🎥 录像管理线程启动");
        let mut last_result = Instant::now();

        while ctx.is_running() {
            let Some(result) = ctx.results.take() else {
                if last_result.elapsed() >= self.stale_after {
                    ctx.recorder.on_detections(0, Instant::now());
                    last_result = Instant::now();
                }
                ctx.shutdown.sleep(ctx.idle_interval);
                continue;
            };
            last_result = Instant::now();

            let hits = result.count_at_least(self.recording_threshold);
            ctx.recorder.on_detections(hits, Instant::now());
            if let Some(ptz) = &ctx.ptz {
                ptz.on_result(&result);
            }
        }

        info!("✅ 录像管理线程退出");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ControlAuthority;
    use crate::detection::{BBox, DetectionResult};
    use crate::testing::{LoopbackTransport, MemoryRecorder};
    use crate::upload::UploadQueue;
    use std::sync::Arc;

    fn context(params: HysteresisParams) -> (Arc<PipelineContext>, Arc<RecordingController>) {
        let authority = Arc::new(ControlAuthority::new());
        let transport = Arc::new(LoopbackTransport::connected());
        let uploads = UploadQueue::new();
        let recorder = Arc::new(RecordingController::new(
            params,
            80,
            Box::new(MemoryRecorder::new()),
            authority.clone(),
            transport.clone(),
            uploads.clone(),
        ));
        let ctx = Arc::new(PipelineContext::new(authority, transport, recorder.clone(), None, uploads));
        (ctx, recorder)
    }

    fn publish_hits(ctx: &PipelineContext, count: u64) {
        for frame_id in 0..count {
            ctx.results.publish(DetectionResult {
                frame_id,
                width: 640,
                height: 480,
                bboxes: vec![BBox { x1: 0.0, y1: 0.0, x2: 10.0, y2: 10.0, confidence: 0.9, class_id: 0 }],
                inference_ms: 1.0,
            });
            // 等待管理线程消费
            while !ctx.results.is_empty() {
                std::thread::sleep(Duration::from_millis(2));
            }
        }
    }

    fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while !done() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        done()
    }

    #[test]
    fn qualifying_results_start_a_recording() {
        let (ctx, recorder) = context(HysteresisParams::default());
        let manager = RecordingManager::new(0.6, Duration::from_secs(10));
        let worker_ctx = ctx.clone();
        let handle = std::thread::spawn(move || manager.run(&worker_ctx));

        publish_hits(&ctx, 3);
        assert!(wait_until(Duration::from_secs(2), || recorder.is_recording()));

        ctx.shutdown.trigger();
        handle.join().unwrap();
    }

    #[test]
    fn stalled_detection_closes_open_session() {
        let (ctx, recorder) = context(HysteresisParams {
            required_frames: 3,
            cooldown: Duration::from_millis(20),
            min_duration: Duration::ZERO,
        });
        let manager = RecordingManager::new(0.6, Duration::from_millis(50));
        let worker_ctx = ctx.clone();
        let handle = std::thread::spawn(move || manager.run(&worker_ctx));

        publish_hits(&ctx, 3);
        assert!(wait_until(Duration::from_secs(2), || recorder.is_recording()));

        // 不再发布任何结果
        assert!(wait_until(Duration::from_secs(2), || !recorder.is_recording()));
        assert!(wait_until(Duration::from_secs(1), || ctx.uploads.pending() == 1));

        ctx.shutdown.trigger();
        handle.join().unwrap();
    }
}
