// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 最新值槽 (Latest-wins slot)
///
/// 单元素缓冲区: 新值直接覆盖未消费的旧值,生产者永不等待消费者。
/// 锁只覆盖 swap 本身,不跨越采集/推理/编码/IO。
use std::sync::{Mutex, MutexGuard};

pub struct LatestValueSlot<T> {
    value: Mutex<Option<T>>,
}

impl<T> Default for LatestValueSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LatestValueSlot<T> {
    pub fn new() -> Self {
        Self {
            value: Mutex::new(None),
        }
    }

    // 持锁线程panic不影响槽位本身的数据一致性 (只有一次swap)
    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.value.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 发布新值,覆盖旧值。返回 true 表示丢弃了一个未消费的旧值。
    pub fn publish(&self, value: T) -> bool {
        self.lock().replace(value).is_some()
    }

    /// 取走当前值 (若有)
    pub fn take(&self) -> Option<T> {
        self.lock().take()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_none()
    }
}
