// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 固定间隔准入闸门 (Fixed-interval admission gate)
//!
//! 推流和云台自动跟踪共用。只记录一个时间戳,无排队;
//! 被拒绝的调用由调用方自行丢弃或重试。热路径只用原子操作。

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

const NEVER: u64 = u64::MAX;

pub struct RateLimiter {
    interval: Duration,
    epoch: Instant,
    /// 上次放行时间 (ns since `epoch`), NEVER 表示尚未放行
    last_admitted_ns: AtomicU64,
}

impl RateLimiter {
    /// 每秒最多放行 `max_rate` 次
    pub fn per_second(max_rate: f64) -> Self {
        assert!(max_rate > 0.0, "max_rate must be positive");
        Self::with_interval(Duration::from_secs_f64(1.0 / max_rate))
    }

    /// 两次放行之间至少间隔 `interval`
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            epoch: Instant::now(),
            last_admitted_ns: AtomicU64::new(NEVER),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn try_admit(&self) -> bool {
        self.try_admit_at(Instant::now())
    }

    /// 以注入的时钟判断是否放行 (测试与批量调用)
    pub fn try_admit_at(&self, now: Instant) -> bool {
        let now_ns = now.saturating_duration_since(self.epoch).as_nanos() as u64;
        let interval_ns = self.interval.as_nanos() as u64;

        let mut last = self.last_admitted_ns.load(Ordering::Acquire);
        loop {
            if last != NEVER && now_ns.saturating_sub(last) < interval_ns {
                return false;
            }
            // 并发调用只允许一个线程赢得CAS
            match self.last_admitted_ns.compare_exchange(
                last,
                now_ns,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(current) => last = current,
            }
        }
    }
}
