// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 云台仲裁器 (PTZ arbiter)
//!
//! 自动路径: 仅自动模式下,跟踪类别中置信度最高的目标 → 3×3 区域 → 脉冲计划,
//! 每个复合指令都要通过限速器。
//! 手动路径: 授权客户端的指令直接执行,不经过限速器。

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::pelco::Actuator;
use super::zone::pulse_plan;
use super::{Direction, PtzCommand};
use crate::config::PtzConfig;
use crate::control::ControlAuthority;
use crate::detection::DetectionResult;
use crate::pipeline::RateLimiter;
use crate::transport::{notify, OutboundEvent, Transport};

/// 仲裁器参数
#[derive(Debug, Clone, Copy)]
pub struct PtzSettings {
    pub speed: u8,
    pub pulse: Duration,
    pub cooldown: Duration,
    pub tracked_class: u32,
    /// 自动跟踪使用录像阈值
    pub threshold: f32,
}

impl PtzSettings {
    pub fn from_config(config: &PtzConfig, threshold: f32) -> Self {
        Self {
            speed: config.speed,
            pulse: config.pulse(),
            cooldown: config.cooldown(),
            tracked_class: config.tracked_class,
            threshold,
        }
    }
}

pub struct PtzArbiter {
    actuator: Mutex<Box<dyn Actuator>>,
    authority: Arc<ControlAuthority>,
    transport: Arc<dyn Transport>,
    limiter: RateLimiter,
    settings: PtzSettings,
}

impl PtzArbiter {
    pub fn new(
        actuator: Box<dyn Actuator>,
        authority: Arc<ControlAuthority>,
        transport: Arc<dyn Transport>,
        settings: PtzSettings,
    ) -> Self {
        Self {
            actuator: Mutex::new(actuator),
            authority,
            transport,
            limiter: RateLimiter::with_interval(settings.cooldown),
            settings,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn Actuator>> {
        self.actuator.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 自动跟踪。返回 true 表示执行了运动。
    pub fn on_result(&self, result: &DetectionResult) -> bool {
        if self.authority.is_manual() {
            return false;
        }
        let Some(target) = result.best_of_class(self.settings.tracked_class, self.settings.threshold)
        else {
            return false;
        };

        let (cx, cy) = target.center();
        let plan: Vec<PtzCommand> = pulse_plan(cx, cy, result.width, result.height)
            .into_iter()
            .map(|direction| PtzCommand::new(direction, self.settings.speed))
            .collect();
        if plan.is_empty() {
            return false;
        }
        if !self.limiter.try_admit() {
            debug!("云台指令过于频繁,跳过本次跟踪");
            return false;
        }

        debug!(frame_id = result.frame_id, ?plan, "🎯 自动跟踪 ({:.0}, {:.0})", cx, cy);
        self.execute(&plan, false);
        true
    }

    /// 手动指令。返回 false 表示未授权被丢弃。
    pub fn manual_command(&self, client_id: &str, direction: Direction) -> bool {
        if !self.authority.authorize(client_id) {
            warn!(client = client_id, "⛔ 未授权的云台指令: {}", direction.label());
            return false;
        }

        info!(client = client_id, "🕹️  手动云台: {}", direction.label());
        if direction == Direction::Stop {
            let mut actuator = self.lock();
            if let Err(e) = actuator.stop() {
                warn!("⚠️  云台停止失败: {}", e);
            }
            drop(actuator);
            self.status(false, true);
            return true;
        }

        let command = PtzCommand::new(direction, self.settings.speed);
        self.execute(&command.pulses(), true);
        true
    }

    /// 依次执行单轴脉冲: 运动 → 等待 → 停止。运动失败也尝试停止。
    fn execute(&self, plan: &[PtzCommand], manual: bool) {
        self.status(true, manual);
        {
            let mut actuator = self.lock();
            for command in plan {
                if let Err(e) = actuator.start_move(command.direction, command.speed) {
                    warn!("⚠️  云台运动失败 ({}): {}", command.direction.label(), e);
                }
                std::thread::sleep(self.settings.pulse);
                if let Err(e) = actuator.stop() {
                    warn!("⚠️  云台停止失败: {}", e);
                }
            }
        }
        self.status(false, manual);
    }

    fn status(&self, moving: bool, manual: bool) {
        notify(self.transport.as_ref(), OutboundEvent::PtzStatus { moving, manual });
    }
}
