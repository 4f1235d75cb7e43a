// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 检测系统 (Detection System)
///
/// 独立工作线程,负责智能分析
/// - Detector: 检测能力接口 + HTTP推理客户端
/// - Stage:    取帧 → 检测 → 发布结果
pub mod detector;
pub mod stage;
pub mod types;

pub use detector::{Detector, HttpDetector};
pub use stage::DetectionStage;
pub use types::{encode_jpeg, BBox, DetectionResult, Frame};
