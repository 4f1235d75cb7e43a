// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 检测器 (Detector)
//! 职责: 帧 → 检测框集合。模型本身是外部能力,这里只定义接口与HTTP推理客户端。

use serde::Deserialize;
use std::time::Duration;

use super::types::{BBox, Frame};
use crate::error::{Result, SentinelError};

/// 检测能力: 一帧 → 一组带分数的检测框
pub trait Detector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<BBox>>;

    fn name(&self) -> &str {
        "detector"
    }
}

/// 推理服务响应
#[derive(Debug, Deserialize)]
struct DetectResponse {
    #[serde(default)]
    detections: Vec<BBox>,
}

/// HTTP推理客户端: POST image/jpeg → JSON检测框
pub struct HttpDetector {
    agent: ureq::Agent,
    endpoint: String,
    jpeg_quality: u8,
}

impl HttpDetector {
    pub fn new(endpoint: impl Into<String>, timeout: Duration, jpeg_quality: u8) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            endpoint: endpoint.into(),
            jpeg_quality,
        }
    }
}

impl Detector for HttpDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<BBox>> {
        let jpeg = frame.encode_jpeg(self.jpeg_quality)?;
        let response = self
            .agent
            .post(&self.endpoint)
            .set("Content-Type", "image/jpeg")
            .set("X-Frame-Width", &frame.width.to_string())
            .set("X-Frame-Height", &frame.height.to_string())
            .send_bytes(&jpeg)
            .map_err(|e| SentinelError::Detector(SentinelError::from(e).to_string()))?;

        let parsed: DetectResponse = serde_json::from_reader(response.into_reader())
            .map_err(|e| SentinelError::Detector(format!("响应解析失败: {}", e)))?;
        Ok(parsed.detections)
    }

    fn name(&self) -> &str {
        &self.endpoint
    }
}
