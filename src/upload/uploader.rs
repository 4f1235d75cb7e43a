// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 上传线程模块
/// Uploader: 上传队列 → (可选转码) → 存储后端
///
/// 至多一次: 失败只记录日志并丢弃该任务。
use std::path::Path;
use tracing::{error, info, warn};

use super::queue::{UploadQueue, UploadTask};
use super::storage::StorageClient;
use super::transcode::Transcoder;
use crate::error::Result;
use crate::pipeline::Shutdown;

pub struct Uploader {
    storage: Box<dyn StorageClient>,
    transcoder: Option<Box<dyn Transcoder>>,

    // 统计
    uploaded: u64,
    failed: u64,
}

impl Uploader {
    pub fn new(storage: Box<dyn StorageClient>, transcoder: Option<Box<dyn Transcoder>>) -> Self {
        Self {
            storage,
            transcoder,
            uploaded: 0,
            failed: 0,
        }
    }

    pub fn uploaded(&self) -> u64 {
        self.uploaded
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    /// 处理一个任务,返回远端位置
    pub fn process(&mut self, task: &UploadTask) -> Result<String> {
        let transcoded = self.transcoder.as_ref().and_then(|t| match t.transcode(&task.path) {
            Ok(out) => Some(out),
            Err(e) => {
                warn!("⚠️  转码失败,上传原始文件: {}", e);
                None
            }
        });

        let artifact = transcoded.as_deref().unwrap_or(&task.path);
        let location = self.storage.upload(artifact)?;

        if let Some(temp) = &transcoded {
            remove_artifact(temp);
        }
        Ok(location)
    }

    fn handle(&mut self, task: UploadTask) {
        let waited = chrono::Local::now() - task.created_at;
        match self.process(&task) {
            Ok(location) => {
                self.uploaded += 1;
                info!(
                    backend = self.storage.name(),
                    queued_secs = waited.num_seconds(),
                    "☁️  上传完成: {} → {}",
                    task.path.display(),
                    location
                );
            }
            Err(e) => {
                self.failed += 1;
                error!("❌ 上传失败,已丢弃: {} ({})", task.path.display(), e);
            }
        }
    }

    /// 取消后不再取新任务,进行中的上传会完成
    pub fn run(&mut self, queue: &UploadQueue, shutdown: &Shutdown, poll: std::time::Duration) {
        info!("☁️  上传线程启动: {}", self.storage.name());

        while !shutdown.is_triggered() {
            if let Some(task) = queue.pop_timeout(poll) {
                self.handle(task);
            }
        }

        info!(
            "✅ 上传线程退出: 成功{} | 失败{} | 剩余{}",
            self.uploaded,
            self.failed,
            queue.pending()
        );
    }
}

fn remove_artifact(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!("⚠️  无法删除临时文件 {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeStorage, FakeTranscoder};
    use std::time::Duration;

    fn recording(dir: &Path) -> UploadTask {
        let path = dir.join("recording_20240101_000000.mjpeg");
        std::fs::write(&path, b"frames").unwrap();
        UploadTask::new(path)
    }

    #[test]
    fn uploads_transcoded_artifact_and_deletes_it() {
        let tmp = tempfile::tempdir().unwrap();
        let task = recording(tmp.path());
        let storage = FakeStorage::new();
        let mut uploader = Uploader::new(Box::new(storage.clone()), Some(Box::new(FakeTranscoder::ok())));

        uploader.process(&task).unwrap();
        let mp4 = tmp.path().join("recording_20240101_000000.mp4");
        assert_eq!(storage.uploaded(), vec![mp4.clone()]);
        assert!(!mp4.exists());
        assert!(task.path.exists());
    }

    #[test]
    fn transcode_failure_falls_back_to_original() {
        let tmp = tempfile::tempdir().unwrap();
        let task = recording(tmp.path());
        let storage = FakeStorage::new();
        let mut uploader = Uploader::new(Box::new(storage.clone()), Some(Box::new(FakeTranscoder::failing())));

        uploader.process(&task).unwrap();
        assert_eq!(storage.uploaded(), vec![task.path.clone()]);
    }

    #[test]
    fn failures_are_dropped_and_the_loop_keeps_going() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = FakeStorage::new();
        storage.fail_next(1);
        let mut uploader = Uploader::new(Box::new(storage.clone()), None);
        let queue = UploadQueue::new();

        let first = recording(tmp.path());
        let second_path = tmp.path().join("second.mjpeg");
        std::fs::write(&second_path, b"x").unwrap();
        queue.push(first);
        queue.push(UploadTask::new(&second_path));

        while let Some(task) = queue.pop_timeout(Duration::from_millis(10)) {
            uploader.handle(task);
        }
        assert_eq!(uploader.failed(), 1);
        assert_eq!(uploader.uploaded(), 1);
        assert_eq!(storage.uploaded(), vec![second_path]);
    }

    #[test]
    fn run_stops_on_shutdown() {
        let queue = UploadQueue::new();
        let shutdown = Shutdown::new();
        shutdown.trigger();
        let mut uploader = Uploader::new(Box::new(FakeStorage::new()), None);
        uploader.run(&queue, &shutdown, Duration::from_millis(5));
        assert_eq!(uploader.uploaded(), 0);
    }
}
