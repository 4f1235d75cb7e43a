// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 录像存储后端
//!
//! - HttpStorage:  HTTP PUT `<endpoint>/<文件名>`,可选 Bearer 令牌
//! - LocalArchive: 复制到本地归档目录

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::{Result, SentinelError};

pub trait StorageClient: Send {
    /// 上传文件,返回远端位置描述
    fn upload(&mut self, path: &Path) -> Result<String>;

    fn name(&self) -> &str {
        "storage"
    }
}

fn file_name(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| SentinelError::Storage(format!("无效的文件名: {}", path.display())))
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("mp4") => "video/mp4",
        Some("mjpeg") => "video/x-motion-jpeg",
        _ => "application/octet-stream",
    }
}

pub struct HttpStorage {
    agent: ureq::Agent,
    endpoint: String,
    auth_token: Option<String>,
}

impl HttpStorage {
    pub fn new(endpoint: impl Into<String>, auth_token: Option<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            auth_token,
        }
    }

    pub fn object_url(&self, path: &Path) -> Result<String> {
        Ok(format!("{}/{}", self.endpoint, file_name(path)?))
    }
}

impl StorageClient for HttpStorage {
    fn upload(&mut self, path: &Path) -> Result<String> {
        let url = self.object_url(path)?;
        let file = File::open(path)?;
        let size = file.metadata()?.len();

        let mut request = self
            .agent
            .put(&url)
            .set("Content-Type", content_type(path))
            .set("Content-Length", &size.to_string());
        if let Some(token) = &self.auth_token {
            request = request.set("Authorization", &format!("Bearer {}", token));
        }

        let response = request.send(file)?;
        debug!(status = response.status(), "上传响应: {}", url);
        Ok(url)
    }

    fn name(&self) -> &str {
        "http"
    }
}

pub struct LocalArchive {
    dir: PathBuf,
}

impl LocalArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl StorageClient for LocalArchive {
    fn upload(&mut self, path: &Path) -> Result<String> {
        std::fs::create_dir_all(&self.dir)?;
        let target = self.dir.join(file_name(path)?);
        std::fs::copy(path, &target)?;
        Ok(target.display().to_string())
    }

    fn name(&self) -> &str {
        "archive"
    }
}
