// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 单元测试用的替身实现

use chrono::{DateTime, Local};
use image::RgbImage;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::capture::FrameSource;
use crate::control::ControlAuthority;
use crate::detection::{BBox, Detector, Frame};
use crate::error::{Result, SentinelError};
use crate::pipeline::PipelineContext;
use crate::ptz::{Actuator, Direction};
use crate::recording::{HysteresisParams, RecorderFactory, RecordingController, VideoWriter};
use crate::transport::{InboundEvent, OutboundEvent, Transport};
use crate::upload::{StorageClient, Transcoder, UploadQueue};

// ========== 检测器 ==========

/// 按顺序返回预设结果,用完后返回空结果
pub struct ScriptedDetector {
    script: VecDeque<Result<Vec<BBox>>>,
}

impl ScriptedDetector {
    pub fn new(script: Vec<Result<Vec<BBox>>>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

impl Detector for ScriptedDetector {
    fn detect(&mut self, _frame: &Frame) -> Result<Vec<BBox>> {
        self.script.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ========== 传输 ==========

#[derive(Default)]
pub struct LoopbackTransport {
    connected: AtomicBool,
    fail_sends: AtomicBool,
    failures_left: AtomicU32,
    connects: AtomicU32,
    disconnects: AtomicU32,
    sent: Mutex<Vec<OutboundEvent>>,
    inbound: Mutex<VecDeque<InboundEvent>>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connected() -> Self {
        let transport = Self::default();
        transport.connected.store(true, Ordering::SeqCst);
        transport
    }

    /// 前 n 次 connect 失败
    pub fn failing(n: u32) -> Self {
        let transport = Self::default();
        transport.failures_left.store(n, Ordering::SeqCst);
        transport
    }

    pub fn sent(&self) -> Vec<OutboundEvent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn push_inbound(&self, event: InboundEvent) {
        self.inbound.lock().unwrap().push_back(event);
    }

    pub fn connect_calls(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> u32 {
        self.disconnects.load(Ordering::SeqCst)
    }
}

impl Transport for LoopbackTransport {
    fn connect(&self) -> Result<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(SentinelError::Transport("connection refused".into()));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn send(&self, event: &OutboundEvent) -> Result<()> {
        if !self.is_connected() {
            return Err(SentinelError::NotConnected);
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(SentinelError::Transport("broken pipe".into()));
        }
        self.sent.lock().unwrap().push(event.clone());
        Ok(())
    }

    fn recv_timeout(&self, timeout: Duration) -> Result<Option<InboundEvent>> {
        if !self.is_connected() {
            return Err(SentinelError::NotConnected);
        }
        if let Some(event) = self.inbound.lock().unwrap().pop_front() {
            return Ok(Some(event));
        }
        std::thread::sleep(timeout.min(Duration::from_millis(10)));
        Ok(None)
    }
}

// ========== 云台 ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    Move(Direction, u8),
    Stop,
}

#[derive(Clone, Default)]
pub struct FakeActuator {
    calls: Arc<Mutex<Vec<ActuatorCall>>>,
    fail_moves: Arc<AtomicBool>,
}

impl FakeActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ActuatorCall> {
        self.calls.lock().unwrap().clone()
    }

    /// 运动指令失败 (不记录),停止仍然成功
    pub fn fail_moves(&self, fail: bool) {
        self.fail_moves.store(fail, Ordering::SeqCst);
    }
}

impl Actuator for FakeActuator {
    fn start_move(&mut self, direction: Direction, speed: u8) -> Result<()> {
        if self.fail_moves.load(Ordering::SeqCst) {
            return Err(SentinelError::Actuator("serial write failed".into()));
        }
        self.calls.lock().unwrap().push(ActuatorCall::Move(direction, speed));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.calls.lock().unwrap().push(ActuatorCall::Stop);
        Ok(())
    }
}

// ========== 录像 ==========

/// 只在内存中计数的录像工厂
#[derive(Clone, Default)]
pub struct MemoryRecorder {
    created: Arc<AtomicU32>,
    fail: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    frames: Arc<Mutex<HashMap<PathBuf, u64>>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> u32 {
        self.created.load(Ordering::SeqCst)
    }

    pub fn fail_creates(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// 之后的 write_frame 全部失败 (包括已打开的会话)
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn frames_in(&self, path: &Path) -> Option<u64> {
        self.frames.lock().unwrap().get(path).copied()
    }
}

impl RecorderFactory for MemoryRecorder {
    fn create(&self, _started_at: DateTime<Local>) -> Result<Box<dyn VideoWriter>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SentinelError::Recorder("disk full".into()));
        }
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        let path = PathBuf::from(format!("mem/recording_{}.mjpeg", n));
        self.frames.lock().unwrap().insert(path.clone(), 0);
        Ok(Box::new(MemoryWriter {
            path,
            frames: self.frames.clone(),
            fail_writes: self.fail_writes.clone(),
            count: 0,
        }))
    }
}

struct MemoryWriter {
    path: PathBuf,
    frames: Arc<Mutex<HashMap<PathBuf, u64>>>,
    fail_writes: Arc<AtomicBool>,
    count: u64,
}

impl VideoWriter for MemoryWriter {
    fn write_frame(&mut self, _jpeg: &[u8]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SentinelError::Recorder("no space left on device".into()));
        }
        self.count += 1;
        self.frames.lock().unwrap().insert(self.path.clone(), self.count);
        Ok(())
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn frames(&self) -> u64 {
        self.count
    }

    fn finish(self: Box<Self>) -> Result<PathBuf> {
        Ok(self.path)
    }
}

// ========== 上传 ==========

#[derive(Clone, Default)]
pub struct FakeStorage {
    uploaded: Arc<Mutex<Vec<PathBuf>>>,
    fail_next: Arc<AtomicU32>,
}

impl FakeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uploaded(&self) -> Vec<PathBuf> {
        self.uploaded.lock().unwrap().clone()
    }

    pub fn fail_next(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }
}

impl StorageClient for FakeStorage {
    fn upload(&mut self, path: &Path) -> Result<String> {
        let left = self.fail_next.load(Ordering::SeqCst);
        if left > 0 {
            self.fail_next.store(left - 1, Ordering::SeqCst);
            return Err(SentinelError::Storage("503 Service Unavailable".into()));
        }
        self.uploaded.lock().unwrap().push(path.to_path_buf());
        Ok(format!("fake://{}", path.display()))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

pub struct FakeTranscoder {
    fail: bool,
}

impl FakeTranscoder {
    /// 在输入旁边生成 .mp4
    pub fn ok() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

impl Transcoder for FakeTranscoder {
    fn transcode(&self, input: &Path) -> Result<PathBuf> {
        if self.fail {
            return Err(SentinelError::Transcode("encoder missing".into()));
        }
        let output = input.with_extension("mp4");
        std::fs::write(&output, b"mp4")?;
        Ok(output)
    }
}

// ========== 采集 ==========

/// 生成固定数量 4×4 帧的帧源
pub struct VecSource {
    remaining: usize,
    available: bool,
}

impl VecSource {
    pub fn new(frames: usize) -> Self {
        Self {
            remaining: frames,
            available: true,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            remaining: 0,
            available: false,
        }
    }
}

impl FrameSource for VecSource {
    fn open(&mut self) -> Result<()> {
        if self.available {
            Ok(())
        } else {
            Err(SentinelError::SourceUnavailable("no camera".into()))
        }
    }

    fn read(&mut self) -> Result<Option<RgbImage>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        Ok(Some(RgbImage::new(4, 4)))
    }

    fn name(&self) -> String {
        "vec".into()
    }
}

// ========== 上下文 ==========

pub fn test_context() -> PipelineContext {
    test_context_with().0
}

/// 已连接的回环传输 + 内存录像,无云台
pub fn test_context_with() -> (PipelineContext, Arc<LoopbackTransport>) {
    let authority = Arc::new(ControlAuthority::new());
    let transport = Arc::new(LoopbackTransport::connected());
    let uploads = UploadQueue::new();
    let recorder = Arc::new(RecordingController::new(
        HysteresisParams::default(),
        80,
        Box::new(MemoryRecorder::new()),
        authority.clone(),
        transport.clone(),
        uploads.clone(),
    ));
    let ctx = PipelineContext::new(authority, transport.clone(), recorder, None, uploads);
    (ctx, transport)
}
