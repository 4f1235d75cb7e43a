// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 传输系统 (Transport System)
///
/// - Events:     入站指令 / 出站状态与帧 的JSON定义
/// - WsTransport: WebSocket 实现
/// - Supervisor: 指数退避的连接维护线程
/// - Transmit:   限速的标注帧推流线程
pub mod annotate;
pub mod events;
pub mod supervisor;
pub mod transmit;
pub mod ws;

pub use annotate::Annotator;
pub use events::{InboundEvent, OutboundEvent, RecordingAction};
pub use supervisor::{Backoff, BackoffPolicy, ConnectionSupervisor};
pub use transmit::TransmitStage;
pub use ws::WsTransport;

use std::time::Duration;
use tracing::{debug, warn};

use crate::error::Result;

/// 与远端查看器之间的传输能力 (尽力而为)
pub trait Transport: Send + Sync {
    fn connect(&self) -> Result<()>;

    /// 强制断开 (包括半开连接)
    fn disconnect(&self);

    fn is_connected(&self) -> bool;

    fn send(&self, event: &OutboundEvent) -> Result<()>;

    /// 最多等待 timeout 读取一条入站事件
    fn recv_timeout(&self, timeout: Duration) -> Result<Option<InboundEvent>>;
}

/// 发送状态通知: 未连接时跳过,发送失败只记录日志
pub fn notify(transport: &dyn Transport, event: OutboundEvent) {
    if !transport.is_connected() {
        debug!(event = event.name(), "未连接,跳过状态通知");
        return;
    }
    if let Err(e) = transport.send(&event) {
        warn!(event = event.name(), "⚠️  状态通知发送失败: {}", e);
    }
}
