// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 上传系统 (Upload System)
///
/// - Queue:     进程内 FIFO
/// - Storage:   HTTP / 本地归档
/// - Transcode: ffmpeg MJPEG → MP4
/// - Uploader:  上传线程
pub mod queue;
pub mod storage;
pub mod transcode;
pub mod uploader;

pub use queue::{UploadQueue, UploadTask};
pub use storage::{HttpStorage, LocalArchive, StorageClient};
pub use transcode::{FfmpegTranscoder, Transcoder};
pub use uploader::Uploader;
