// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 连接维护线程 (Connection supervisor)
//!
//! 未连接 → 尝试连接; 成功重置退避, 失败强制断开半开连接后等待退避并翻倍(封顶)。
//! 已连接 → 以固定间隔空转检查。

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::Transport;
use crate::config::ConnectionConfig;
use crate::pipeline::Shutdown;

/// 指数退避策略 (base, max, multiplier)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max: Duration,
    pub multiplier: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            max: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl BackoffPolicy {
    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self {
            base: Duration::from_secs_f64(config.backoff_base_secs),
            max: Duration::from_secs_f64(config.backoff_max_secs),
            multiplier: config.backoff_multiplier,
        }
    }
}

/// 退避状态
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    current: Duration,
}

impl Backoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            current: policy.base,
            policy,
        }
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    /// 返回本次应等待的时长,并把下一次翻倍(封顶)
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        let next = self.current.as_secs_f64() * self.policy.multiplier;
        self.current = Duration::from_secs_f64(next.min(self.policy.max.as_secs_f64()));
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.policy.base;
    }
}

pub struct ConnectionSupervisor {
    transport: Arc<dyn Transport>,
    backoff: Backoff,
    poll_interval: Duration,
}

impl ConnectionSupervisor {
    pub fn new(transport: Arc<dyn Transport>, policy: BackoffPolicy, poll_interval: Duration) -> Self {
        Self {
            transport,
            backoff: Backoff::new(policy),
            poll_interval,
        }
    }

    /// 单次迭代,返回接下来应等待的时长
    pub fn tick(&mut self) -> Duration {
        if self.transport.is_connected() {
            return self.poll_interval;
        }

        match self.transport.connect() {
            Ok(()) => {
                self.backoff.reset();
                info!("✅ 连接成功");
                self.poll_interval
            }
            Err(e) => {
                // 清理半开连接,下一轮重新握手
                self.transport.disconnect();
                let delay = self.backoff.next_delay();
                warn!("⚠️  连接失败: {}. {:.1}秒后重试", e, delay.as_secs_f64());
                delay
            }
        }
    }

    pub fn run(&mut self, shutdown: &Shutdown) {
        info!("📡 连接维护线程启动");
        while !shutdown.is_triggered() {
            let wait = self.tick();
            if !shutdown.sleep(wait) {
                break;
            }
        }
        info!("✅ 连接维护线程退出");
    }
}
