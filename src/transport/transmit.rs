// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 推流线程模块
/// Transmit stage: transmit_frames 槽 + overlay 槽 → 标注 → JPEG → base64 → frame 事件
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::annotate::Annotator;
use super::events::OutboundEvent;
use super::Transport;
use crate::detection::{encode_jpeg, DetectionResult, Frame};
use crate::error::{Result, SentinelError};
use crate::pipeline::{PipelineContext, RateLimiter};

/// 连续发送失败时,日志最多每隔这么久打印一次
const ERROR_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// 单帧处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitOutcome {
    Sent,
    Disconnected,
    RateLimited,
    Failed,
}

pub struct TransmitStage {
    limiter: RateLimiter,
    jpeg_quality: u8,
    annotator: Annotator,
    /// 最近一次检测结果,检测比推流慢时复用
    overlay: Option<DetectionResult>,

    error_log: RateLimiter,
    suppressed_errors: u64,

    // 统计
    sent: u64,
    bytes: usize,
    last: Instant,
}

impl TransmitStage {
    pub fn new(max_fps: f64, jpeg_quality: u8, annotator: Annotator) -> Self {
        Self {
            limiter: RateLimiter::per_second(max_fps),
            jpeg_quality,
            annotator,
            overlay: None,
            error_log: RateLimiter::with_interval(ERROR_LOG_INTERVAL),
            suppressed_errors: 0,
            sent: 0,
            bytes: 0,
            last: Instant::now(),
        }
    }

    pub fn update_overlay(&mut self, result: DetectionResult) {
        self.overlay = Some(result);
    }

    /// 标注并编码为 base64 JPEG
    pub fn encode(&self, frame: &Frame) -> Result<String> {
        let mut image = frame.to_image().ok_or_else(|| {
            SentinelError::Transport(format!("帧{}缓冲区尺寸不符", frame.frame_id))
        })?;
        if let Some(overlay) = &self.overlay {
            self.annotator.annotate(&mut image, overlay);
        }
        let jpeg = encode_jpeg(&image, self.jpeg_quality)?;
        Ok(STANDARD.encode(jpeg))
    }

    pub fn process(&mut self, frame: &Frame, transport: &dyn Transport) -> TransmitOutcome {
        if !transport.is_connected() {
            return TransmitOutcome::Disconnected;
        }
        if !self.limiter.try_admit() {
            return TransmitOutcome::RateLimited;
        }

        let result = self
            .encode(frame)
            .and_then(|payload| {
                let size = payload.len();
                transport.send(&OutboundEvent::Frame(payload)).map(|_| size)
            });

        match result {
            Ok(size) => {
                self.sent += 1;
                self.bytes += size;
                self.log_stats();
                TransmitOutcome::Sent
            }
            Err(e) => {
                self.report_error(frame.frame_id, &e);
                TransmitOutcome::Failed
            }
        }
    }

    fn report_error(&mut self, frame_id: u64, e: &SentinelError) {
        if self.error_log.try_admit() {
            warn!(
                frame_id,
                suppressed = self.suppressed_errors,
                "⚠️  推流失败,丢弃该帧: {}",
                e
            );
            self.suppressed_errors = 0;
        } else {
            self.suppressed_errors += 1;
            debug!(frame_id, "推流失败: {}", e);
        }
    }

    fn log_stats(&mut self) {
        let elapsed = self.last.elapsed().as_secs_f64();
        if elapsed >= 1.0 {
            info!(
                "📊 推流统计: {:.1}fps | 平均{:.1}KB/帧",
                self.sent as f64 / elapsed,
                self.bytes as f64 / self.sent.max(1) as f64 / 1024.0
            );
            self.sent = 0;
            self.bytes = 0;
            self.last = Instant::now();
        }
    }

    pub fn run(&mut self, ctx: &PipelineContext) {
        info!("📤 推流线程启动");

        while ctx.is_running() {
            if let Some(result) = ctx.overlay.take() {
                self.update_overlay(result);
            }

            let Some(frame) = ctx.transmit_frames.take() else {
                ctx.shutdown.sleep(ctx.idle_interval);
                continue;
            };
            self.process(&frame, ctx.transport.as_ref());
        }

        info!("✅ 推流线程退出");
    }
}
