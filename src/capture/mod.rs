// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 采集系统 (Capture System)
///
/// 采集线程: 帧源 → transmit_frames (每帧) / detect_frames (每N帧) / 录像写入
pub mod source;

pub use source::{FrameSource, ImageFolderSource};

use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::detection::Frame;
use crate::pipeline::PipelineContext;

pub struct CaptureLoop<S: FrameSource> {
    source: S,
    period: Duration,
    detect_every: u64,
    next_id: u64,

    // 统计
    count: u64,
    last: Instant,
}

impl<S: FrameSource> CaptureLoop<S> {
    pub fn new(source: S, fps: f64, detect_every: u32) -> Self {
        Self {
            source,
            period: Duration::from_secs_f64(1.0 / fps.max(0.1)),
            detect_every: detect_every.max(1) as u64,
            next_id: 0,
            count: 0,
            last: Instant::now(),
        }
    }

    /// 分发一帧到各个槽位与录像
    pub fn dispatch(&mut self, frame: Frame, ctx: &PipelineContext) {
        if frame.frame_id % self.detect_every == 0 {
            ctx.detect_frames.publish(frame.clone());
        }
        ctx.recorder.append_frame(&frame);
        ctx.transmit_frames.publish(frame);
    }

    pub fn run(&mut self, ctx: &PipelineContext) {
        if let Err(e) = self.source.open() {
            error!("❌ 无法打开视频源 {}: {}", self.source.name(), e);
            ctx.shutdown.trigger();
            return;
        }
        info!("📹 采集线程启动: {} | 每{}帧检测一次", self.source.name(), self.detect_every);

        let mut deadline = Instant::now();
        while ctx.is_running() {
            let image = match self.source.read() {
                Ok(Some(image)) => image,
                Ok(None) => {
                    info!("📹 视频源结束,停止流水线");
                    ctx.shutdown.trigger();
                    break;
                }
                Err(e) => {
                    error!("❌ 读取帧失败,停止流水线: {}", e);
                    ctx.shutdown.trigger();
                    break;
                }
            };

            let frame = Frame::from_image(self.next_id, image);
            self.next_id += 1;
            self.dispatch(frame, ctx);
            self.log_stats();

            // 按目标帧率节拍,落后时不追帧
            deadline += self.period;
            let now = Instant::now();
            if deadline > now {
                ctx.shutdown.sleep(deadline - now);
            } else {
                deadline = now;
            }
        }

        info!("✅ 采集线程退出 (共{}帧)", self.next_id);
    }

    fn log_stats(&mut self) {
        self.count += 1;
        let elapsed = self.last.elapsed().as_secs_f64();
        if elapsed >= 1.0 {
            let fps = self.count as f64 / elapsed;
            if fps < 0.5 / self.period.as_secs_f64() {
                warn!("⚠️  采集帧率偏低: {:.1}fps", fps);
            }
            info!("📊 采集统计: {:.1}fps | 累计{}帧", fps, self.next_id);
            self.count = 0;
            self.last = Instant::now();
        }
    }
}
