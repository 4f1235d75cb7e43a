// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 上传队列 (进程内 FIFO)

use chrono::{DateTime, Local};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    pub path: PathBuf,
    pub created_at: DateTime<Local>,
}

impl UploadTask {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            created_at: Local::now(),
        }
    }
}

/// 无界通道,克隆后共享同一队列
#[derive(Clone)]
pub struct UploadQueue {
    tx: Sender<UploadTask>,
    rx: Receiver<UploadTask>,
}

impl Default for UploadQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn push(&self, task: UploadTask) {
        debug!("📥 上传入队: {}", task.path.display());
        // 自己持有接收端,发送不会失败
        if let Err(e) = self.tx.send(task) {
            warn!("⚠️  上传入队失败: {}", e.0.path.display());
        }
    }

    pub fn pop_timeout(&self, timeout: Duration) -> Option<UploadTask> {
        match self.rx.recv_timeout(timeout) {
            Ok(task) => Some(task),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}
