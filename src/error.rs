// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 错误类型 (Error types)

/// Result type alias
pub type Result<T> = std::result::Result<T, SentinelError>;

/// 数字卫兵错误类型
#[derive(Debug, thiserror::Error)]
pub enum SentinelError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 图像编解码错误
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(String),

    /// 传输层错误 (连接/发送)
    #[error("Transport error: {0}")]
    Transport(String),

    /// 传输层未连接
    #[error("Transport not connected")]
    NotConnected,

    /// 检测器错误
    #[error("Detector error: {0}")]
    Detector(String),

    /// 云台执行器错误
    #[error("Actuator error: {0}")]
    Actuator(String),

    /// 录像写入错误
    #[error("Recorder error: {0}")]
    Recorder(String),

    /// 上传错误
    #[error("Storage error: {0}")]
    Storage(String),

    /// 转码错误
    #[error("Transcode error: {0}")]
    Transcode(String),

    /// 配置错误
    #[error("Config error: {0}")]
    Config(String),

    /// 视频源不可用 (摄像头打不开等)
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),
}

impl From<ureq::Error> for SentinelError {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::Status(code, response) => {
                SentinelError::Http(format!("{} {}", code, response.status_text()))
            }
            ureq::Error::Transport(t) => SentinelError::Http(t.to_string()),
        }
    }
}

impl From<tungstenite::Error> for SentinelError {
    fn from(e: tungstenite::Error) -> Self {
        SentinelError::Transport(e.to_string())
    }
}
