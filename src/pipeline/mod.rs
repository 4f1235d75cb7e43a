// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 视频处理流水线 (Video Processing Pipeline)
///
/// 多个独立工作线程,通过共享上下文中的"最新值槽"交接数据:
/// - Capture:   采集 → detect_frames / transmit_frames / 录像写入
/// - Detection: detect_frames → 检测 → results / overlay
/// - Transmit:  transmit_frames + overlay → 标注 → 推流
/// - Recording: results → 录像状态机 + 云台跟踪
/// - Uploader / Connection / Ingress: 上传、连接维护、指令接收
pub mod rate_limit;
pub mod slot;

pub use rate_limit::RateLimiter;
pub use slot::LatestValueSlot;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::control::ControlAuthority;
use crate::detection::{DetectionResult, Frame};
use crate::ptz::PtzArbiter;
use crate::recording::RecordingController;
use crate::transport::Transport;
use crate::upload::UploadQueue;

/// 等待时的最小切片,保证取消标志在一个切片内被看到
const SLEEP_SLICE: Duration = Duration::from_millis(20);

// ========== 取消标志 ==========

/// 进程级取消标志,每个工作循环在迭代开头检查
#[derive(Clone, Default)]
pub struct Shutdown {
    flag: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// 可被取消打断的睡眠。返回 false 表示期间收到了取消。
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_triggered() {
                return false;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return true;
            }
            std::thread::sleep(remaining.min(SLEEP_SLICE));
        }
    }
}

// ========== 共享上下文 ==========

/// 启动时构建一次,以 Arc 传给所有工作线程
pub struct PipelineContext {
    pub shutdown: Shutdown,
    /// 采集 → 检测 (每N帧)
    pub detect_frames: LatestValueSlot<Frame>,
    /// 采集 → 推流
    pub transmit_frames: LatestValueSlot<Frame>,
    /// 检测 → 录像/云台
    pub results: LatestValueSlot<DetectionResult>,
    /// 检测 → 推流标注
    pub overlay: LatestValueSlot<DetectionResult>,
    pub authority: Arc<ControlAuthority>,
    pub transport: Arc<dyn Transport>,
    pub recorder: Arc<RecordingController>,
    pub ptz: Option<Arc<PtzArbiter>>,
    pub uploads: UploadQueue,
    /// 空闲时的轮询间隔
    pub idle_interval: Duration,
}

impl PipelineContext {
    pub fn new(
        authority: Arc<ControlAuthority>,
        transport: Arc<dyn Transport>,
        recorder: Arc<RecordingController>,
        ptz: Option<Arc<PtzArbiter>>,
        uploads: UploadQueue,
    ) -> Self {
        Self {
            shutdown: Shutdown::new(),
            detect_frames: LatestValueSlot::new(),
            transmit_frames: LatestValueSlot::new(),
            results: LatestValueSlot::new(),
            overlay: LatestValueSlot::new(),
            authority,
            transport,
            recorder,
            ptz,
            uploads,
            idle_interval: Duration::from_millis(10),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.shutdown.is_triggered()
    }
}

// ========== 工作线程管理 ==========

/// 工作线程panic时触发取消,其余线程随之退出
struct PanicGuard {
    name: String,
    shutdown: Shutdown,
}

impl Drop for PanicGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            error!("❌ 工作线程panic,停止流水线: {}", self.name);
            self.shutdown.trigger();
        }
    }
}

pub struct Workers {
    shutdown: Shutdown,
    handles: Vec<(String, JoinHandle<()>)>,
}

impl Workers {
    pub fn new(shutdown: Shutdown) -> Self {
        Self {
            shutdown,
            handles: Vec::new(),
        }
    }

    pub fn spawn<F>(&mut self, name: &str, f: F) -> std::io::Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let guard = PanicGuard {
            name: name.to_string(),
            shutdown: self.shutdown.clone(),
        };
        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let _guard = guard;
                f();
            })?;
        info!("🧵 工作线程启动: {}", name);
        self.handles.push((name.to_string(), handle));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// 在超时内回收所有线程。返回超时未退出的线程名 (这些线程被分离)。
    pub fn join_all(self, timeout: Duration) -> Vec<String> {
        let deadline = Instant::now() + timeout;
        let mut pending = self.handles;

        while !pending.is_empty() && Instant::now() < deadline {
            let (finished, running): (Vec<_>, Vec<_>) =
                pending.into_iter().partition(|(_, h)| h.is_finished());
            for (name, handle) in finished {
                match handle.join() {
                    Ok(()) => info!("✅ 工作线程退出: {}", name),
                    Err(_) => error!("❌ 工作线程panic: {}", name),
                }
            }
            pending = running;
            if !pending.is_empty() {
                std::thread::sleep(SLEEP_SLICE);
            }
        }

        let stuck: Vec<String> = pending.into_iter().map(|(name, _)| name).collect();
        for name in &stuck {
            warn!("⚠️  工作线程超时未退出,已分离: {}", name);
        }
        stuck
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_interrupts_sleep() {
        let shutdown = Shutdown::new();
        let remote = shutdown.clone();
        let t = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            remote.trigger();
        });
        let start = Instant::now();
        assert!(!shutdown.sleep(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(2));
        t.join().unwrap();
    }

    #[test]
    fn sleep_completes_without_shutdown() {
        let shutdown = Shutdown::new();
        assert!(shutdown.sleep(Duration::from_millis(5)));
    }

    #[test]
    fn join_all_reports_stuck_workers() {
        let shutdown = Shutdown::new();
        let mut workers = Workers::new(shutdown.clone());

        let s = shutdown.clone();
        workers
            .spawn("polite", move || while s.sleep(Duration::from_millis(5)) {})
            .unwrap();
        workers
            .spawn("stubborn", || std::thread::sleep(Duration::from_millis(800)))
            .unwrap();
        assert_eq!(workers.len(), 2);

        shutdown.trigger();
        let stuck = workers.join_all(Duration::from_millis(200));
        assert_eq!(stuck, vec!["stubborn".to_string()]);
    }

    #[test]
    fn panicking_worker_triggers_shutdown() {
        let shutdown = Shutdown::new();
        let mut workers = Workers::new(shutdown.clone());

        let s = shutdown.clone();
        workers
            .spawn("survivor", move || while s.sleep(Duration::from_millis(5)) {})
            .unwrap();
        workers
            .spawn("detection", || panic!("negative timeout"))
            .unwrap();

        let start = Instant::now();
        while !shutdown.is_triggered() && start.elapsed() < Duration::from_secs(2) {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(shutdown.is_triggered());
        assert!(workers.join_all(Duration::from_secs(1)).is_empty());
    }
}
