// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 录像滞回状态机 (纯函数,不做任何I/O)
//!
//! `Idle --命中--> Armed(1) --命中--> ... Armed(K) --> Recording`
//! 未命中时 Armed 退回 Idle。
//! Recording 在 (距最后一次命中 > cooldown 且 已录时长 > min_duration) 时结束。

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// 连续命中帧数
    Armed(u32),
    Recording { started: Instant, last_seen: Instant },
}

impl Phase {
    pub fn is_recording(&self) -> bool {
        matches!(self, Phase::Recording { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HysteresisParams {
    /// K: 连续命中多少帧后开始录像
    pub required_frames: u32,
    pub cooldown: Duration,
    pub min_duration: Duration,
}

impl Default for HysteresisParams {
    fn default() -> Self {
        Self {
            required_frames: 3,
            cooldown: Duration::from_secs(5),
            min_duration: Duration::from_secs(3),
        }
    }
}

/// 状态迁移附带的动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    None,
    Open,
    Close,
}

/// 推进一个推理周期。`hits` 为达到录像阈值的检测数量。
pub fn step(phase: Phase, hits: usize, now: Instant, params: &HysteresisParams) -> (Phase, Transition) {
    match phase {
        Phase::Idle | Phase::Armed(_) if hits == 0 => (Phase::Idle, Transition::None),
        Phase::Idle | Phase::Armed(_) => {
            let n = match phase {
                Phase::Armed(n) => n + 1,
                _ => 1,
            };
            if n >= params.required_frames {
                (
                    Phase::Recording {
                        started: now,
                        last_seen: now,
                    },
                    Transition::Open,
                )
            } else {
                (Phase::Armed(n), Transition::None)
            }
        }
        Phase::Recording { started, last_seen } => {
            let last_seen = if hits > 0 { now } else { last_seen };
            let quiet = now.saturating_duration_since(last_seen);
            let elapsed = now.saturating_duration_since(started);
            if quiet > params.cooldown && elapsed > params.min_duration {
                (Phase::Idle, Transition::Close)
            } else {
                (Phase::Recording { started, last_seen }, Transition::None)
            }
        }
    }
}
