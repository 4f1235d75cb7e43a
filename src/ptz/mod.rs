// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 云台控制系统 (PTZ Control System)
///
/// - Zone:    3×3 区域划分 → 脉冲计划
/// - Pelco:   Pelco-D 串口执行器
/// - Arbiter: 自动跟踪 / 手动指令仲裁
pub mod arbiter;
pub mod pelco;
pub mod zone;

pub use arbiter::{PtzArbiter, PtzSettings};
pub use pelco::{open_serial, Actuator, PelcoD};
pub use zone::{pulse_plan, Zone};

use serde::{Deserialize, Serialize};

/// 云台运动方向 (8方向 + 停止)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
    Stop,
}

impl Direction {
    pub fn is_diagonal(&self) -> bool {
        matches!(
            self,
            Self::UpLeft | Self::UpRight | Self::DownLeft | Self::DownRight
        )
    }

    /// 拆分为单轴脉冲序列: 先水平后垂直。Stop 拆分为空序列。
    pub fn decompose(&self) -> Vec<Direction> {
        match self {
            Self::UpLeft => vec![Self::Left, Self::Up],
            Self::UpRight => vec![Self::Right, Self::Up],
            Self::DownLeft => vec![Self::Left, Self::Down],
            Self::DownRight => vec![Self::Right, Self::Down],
            Self::Stop => Vec::new(),
            single => vec![*single],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Up => "上",
            Self::Down => "下",
            Self::Left => "左",
            Self::Right => "右",
            Self::UpLeft => "左上",
            Self::UpRight => "右上",
            Self::DownLeft => "左下",
            Self::DownRight => "右下",
            Self::Stop => "停止",
        }
    }
}

/// 云台指令 (方向 + 速度), 由自动跟踪或手动指令生成
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PtzCommand {
    pub direction: Direction,
    pub speed: u8,
}

impl PtzCommand {
    pub fn new(direction: Direction, speed: u8) -> Self {
        Self { direction, speed }
    }

    /// 拆分为同速度的单轴脉冲
    pub fn pulses(&self) -> Vec<PtzCommand> {
        self.direction
            .decompose()
            .into_iter()
            .map(|direction| PtzCommand::new(direction, self.speed))
            .collect()
    }
}
