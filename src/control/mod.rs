// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 控制系统 (Control System)
///
/// - Authority: 自动/手动模式与手动控制权持有者
/// - Ingress:   远端指令接收与分发
pub mod authority;
pub mod ingress;

pub use authority::{AuthoritySnapshot, ControlAuthority, ControlMode};
pub use ingress::CommandIngress;
