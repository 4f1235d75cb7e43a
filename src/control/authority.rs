// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 控制权仲裁 (Control authority)
//!
//! 自动模式 vs 手动模式 + 持有手动控制权的客户端。
//! 模式与持有者放在同一把锁下,读者不会看到不存在过的组合。
//! 客户端ID没有额外认证,最近一次 enable 请求胜出。

use std::sync::{Mutex, MutexGuard};
use std::time::Instant;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMode {
    Automatic,
    Manual { owner: String },
}

/// 某一时刻的控制权快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthoritySnapshot {
    pub mode: ControlMode,
    pub changed_at: Instant,
}

impl AuthoritySnapshot {
    pub fn is_manual(&self) -> bool {
        matches!(self.mode, ControlMode::Manual { .. })
    }

    pub fn owner(&self) -> Option<&str> {
        match &self.mode {
            ControlMode::Manual { owner } => Some(owner),
            ControlMode::Automatic => None,
        }
    }
}

pub struct ControlAuthority {
    state: Mutex<AuthoritySnapshot>,
}

impl Default for ControlAuthority {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlAuthority {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(AuthoritySnapshot {
                mode: ControlMode::Automatic,
                changed_at: Instant::now(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AuthoritySnapshot> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 请求/释放手动控制权。返回 true 表示状态发生了变化。
    pub fn request_manual_mode(&self, client_id: &str, enable: bool) -> bool {
        let next = if enable {
            ControlMode::Manual {
                owner: client_id.to_string(),
            }
        } else {
            ControlMode::Automatic
        };

        let mut state = self.lock();
        if state.mode == next {
            return false;
        }
        let previous = std::mem::replace(&mut state.mode, next);
        state.changed_at = Instant::now();
        drop(state);

        match (&previous, enable) {
            (ControlMode::Manual { owner }, true) => {
                info!(client = client_id, previous = %owner, "🕹️  手动控制权被接管")
            }
            (_, true) => info!(client = client_id, "🕹️  进入手动模式"),
            (_, false) => info!(client = client_id, "🤖 恢复自动模式"),
        }
        true
    }

    /// 仅当处于手动模式且持有者为 client_id 时放行
    pub fn authorize(&self, client_id: &str) -> bool {
        matches!(&self.lock().mode, ControlMode::Manual { owner } if owner == client_id)
    }

    pub fn is_manual(&self) -> bool {
        self.lock().is_manual()
    }

    pub fn snapshot(&self) -> AuthoritySnapshot {
        self.lock().clone()
    }
}
