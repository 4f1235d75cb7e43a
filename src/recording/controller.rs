// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 录像控制器 (Recording controller)
//!
//! 自动模式: 每个推理周期用达到录像阈值的检测数推进滞回状态机。
//! 手动模式: 自动事件全部忽略,只有持有控制权的客户端能开始/停止。
//! 全系统最多一个录像会话,结束的文件进入上传队列。

use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::hysteresis::{step, HysteresisParams, Phase, Transition};
use super::writer::{RecorderFactory, VideoWriter};
use crate::control::ControlAuthority;
use crate::detection::Frame;
use crate::pipeline::RateLimiter;
use crate::transport::{notify, OutboundEvent, RecordingAction, Transport};
use crate::upload::{UploadQueue, UploadTask};

/// 进行中的录像会话
pub struct RecordingSession {
    pub id: String,
    pub started_at: DateTime<Local>,
    pub path: PathBuf,
    writer: Box<dyn VideoWriter>,
}

impl RecordingSession {
    fn open(factory: &dyn RecorderFactory) -> crate::Result<Self> {
        let started_at = Local::now();
        let writer = factory.create(started_at)?;
        Ok(Self {
            id: format!("{}-{:04x}", started_at.format("%Y%m%d%H%M%S"), rand::random::<u16>()),
            started_at,
            path: writer.path().to_path_buf(),
            writer,
        })
    }
}

struct RecorderState {
    phase: Phase,
    session: Option<RecordingSession>,
}

pub struct RecordingController {
    state: Mutex<RecorderState>,
    params: HysteresisParams,
    jpeg_quality: u8,
    factory: Box<dyn RecorderFactory>,
    authority: Arc<ControlAuthority>,
    transport: Arc<dyn Transport>,
    uploads: UploadQueue,
    append_error_log: RateLimiter,
}

impl RecordingController {
    pub fn new(
        params: HysteresisParams,
        jpeg_quality: u8,
        factory: Box<dyn RecorderFactory>,
        authority: Arc<ControlAuthority>,
        transport: Arc<dyn Transport>,
        uploads: UploadQueue,
    ) -> Self {
        Self {
            state: Mutex::new(RecorderState {
                phase: Phase::Idle,
                session: None,
            }),
            params,
            jpeg_quality,
            factory,
            authority,
            transport,
            uploads,
            append_error_log: RateLimiter::per_second(0.2),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    pub fn is_recording(&self) -> bool {
        self.lock().phase.is_recording()
    }

    /// 自动路径: 推进一个推理周期。手动模式下忽略。
    pub fn on_detections(&self, hits: usize, now: Instant) {
        if self.authority.is_manual() {
            return;
        }

        let mut state = self.lock();
        let (next, transition) = step(state.phase, hits, now, &self.params);
        match transition {
            Transition::None => {
                state.phase = next;
            }
            Transition::Open => match RecordingSession::open(self.factory.as_ref()) {
                Ok(session) => {
                    info!(session = %session.id, "🔴 检测触发录像: {}", session.path.display());
                    state.phase = next;
                    state.session = Some(session);
                    self.status(true, false);
                }
                Err(e) => {
                    // 不重试,等待下一轮重新累积
                    error!("❌ 无法创建录像文件: {}", e);
                    state.phase = Phase::Idle;
                }
            },
            Transition::Close => {
                state.phase = next;
                let session = state.session.take();
                self.status(false, false);
                drop(state);
                if let Some(session) = session {
                    info!(session = %session.id, "⏹️  目标消失,结束录像");
                    self.close(session);
                }
            }
        }
    }

    /// 手动路径。返回 true 表示指令被执行并产生了状态变化。
    pub fn manual_command(&self, client_id: &str, action: RecordingAction) -> bool {
        if !self.authority.authorize(client_id) {
            warn!(client = client_id, ?action, "⛔ 未授权的录像指令");
            return false;
        }

        let mut state = self.lock();
        match action {
            RecordingAction::Start => {
                if state.phase.is_recording() {
                    debug!(client = client_id, "已在录像,忽略开始指令");
                    return false;
                }
                match RecordingSession::open(self.factory.as_ref()) {
                    Ok(session) => {
                        info!(client = client_id, session = %session.id, "🔴 手动开始录像");
                        let now = Instant::now();
                        state.phase = Phase::Recording {
                            started: now,
                            last_seen: now,
                        };
                        state.session = Some(session);
                        self.status(true, true);
                        true
                    }
                    Err(e) => {
                        error!("❌ 无法创建录像文件: {}", e);
                        state.phase = Phase::Idle;
                        false
                    }
                }
            }
            RecordingAction::Stop => {
                if !state.phase.is_recording() {
                    debug!(client = client_id, "未在录像,忽略停止指令");
                    return false;
                }
                state.phase = Phase::Idle;
                let session = state.session.take();
                self.status(false, true);
                drop(state);
                if let Some(session) = session {
                    info!(client = client_id, session = %session.id, "⏹️  手动停止录像");
                    self.close(session);
                }
                true
            }
        }
    }

    /// 采集线程调用: 录像中则写入一帧。写入失败只记录日志,会话保持。
    pub fn append_frame(&self, frame: &Frame) {
        if !self.is_recording() {
            return;
        }
        let jpeg = match frame.encode_jpeg(self.jpeg_quality) {
            Ok(jpeg) => jpeg,
            Err(e) => {
                self.report_append_error(frame.frame_id, &e);
                return;
            }
        };

        let mut state = self.lock();
        if let Some(session) = state.session.as_mut() {
            if let Err(e) = session.writer.write_frame(&jpeg) {
                drop(state);
                self.report_append_error(frame.frame_id, &e);
            }
        }
    }

    fn report_append_error(&self, frame_id: u64, e: &crate::SentinelError) {
        if self.append_error_log.try_admit() {
            warn!(frame_id, "⚠️  录像写入失败: {}", e);
        }
    }

    /// 退出时调用: 关闭未结束的会话并入队上传
    pub fn finalize(&self) {
        let mut state = self.lock();
        let was_recording = state.phase.is_recording();
        state.phase = Phase::Idle;
        let session = state.session.take();
        if was_recording {
            self.status(false, self.authority.is_manual());
        }
        drop(state);

        if let Some(session) = session {
            info!(session = %session.id, "⏹️  退出前结束录像");
            self.close(session);
        }
    }

    fn close(&self, session: RecordingSession) {
        let id = session.id;
        let frames = session.writer.frames();
        match session.writer.finish() {
            Ok(path) => {
                info!(session = %id, frames, "💾 录像完成: {}", path.display());
                self.uploads.push(UploadTask::new(path));
            }
            Err(e) => error!(session = %id, "❌ 录像文件关闭失败: {}", e),
        }
    }

    /// 在状态锁内调用,通知顺序与状态变化顺序一致
    fn status(&self, recording: bool, manual: bool) {
        notify(
            self.transport.as_ref(),
            OutboundEvent::RecordingStatus { recording, manual },
        );
    }
}
