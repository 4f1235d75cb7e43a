// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 指令接收线程 (Command ingress)
//!
//! 已连接时从传输层读取入站事件并分发:
//! manual_mode_command → 控制权, recording_command → 录像, ptz_command → 云台。

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::pipeline::PipelineContext;
use crate::transport::InboundEvent;

pub struct CommandIngress {
    poll: Duration,
}

impl CommandIngress {
    pub fn new(poll: Duration) -> Self {
        Self { poll }
    }

    /// 分发一条入站事件
    pub fn route(&self, event: InboundEvent, ctx: &PipelineContext) {
        debug!(client = event.client_id(), "📨 入站指令: {:?}", event);
        match event {
            InboundEvent::ManualModeCommand { client_id, enabled } => {
                ctx.authority.request_manual_mode(&client_id, enabled);
            }
            InboundEvent::RecordingCommand { client_id, action } => {
                ctx.recorder.manual_command(&client_id, action);
            }
            InboundEvent::PtzCommand {
                client_id,
                direction,
            } => match &ctx.ptz {
                Some(ptz) => {
                    ptz.manual_command(&client_id, direction);
                }
                None => warn!(client = %client_id, "⚠️  云台未启用,忽略指令: {}", direction.label()),
            },
        }
    }

    pub fn run(&self, ctx: &PipelineContext) {
        info!("📨 指令接收线程启动");

        while ctx.is_running() {
            if !ctx.transport.is_connected() {
                ctx.shutdown.sleep(self.poll);
                continue;
            }
            match ctx.transport.recv_timeout(self.poll) {
                Ok(Some(event)) => self.route(event, ctx),
                Ok(None) => {}
                Err(e) => {
                    // 断开由连接维护线程处理
                    debug!("读取入站事件失败: {}", e);
                    ctx.shutdown.sleep(ctx.idle_interval);
                }
            }
        }

        info!("✅ 指令接收线程退出");
    }
}
