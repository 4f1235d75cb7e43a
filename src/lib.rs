// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod capture; // 视频采集
pub mod config; // 配置参数
pub mod control; // 控制权与远端指令
pub mod detection; // 智能检测系统
pub mod error; // 错误类型
pub mod pipeline; // 流水线基础设施 (槽位 / 限速 / 线程)
pub mod ptz; // 云台控制
pub mod recording; // 录像系统
pub mod transport; // 远端传输
pub mod upload; // 录像上传

#[cfg(test)]
pub(crate) mod testing;

pub use crate::config::SentinelConfig;
pub use crate::error::{Result, SentinelError};
pub use crate::pipeline::{PipelineContext, Shutdown, Workers};
