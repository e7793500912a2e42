//! 聚合健康状态
//!
//! 每个已注册的检查占用位掩码中的一位，位为 1 表示该检查当前失败。
//! 服务整体健康当且仅当位掩码为 0。

use parking_lot::RwLock;
use tracing::warn;

/// 可注册检查的最大数量（位掩码宽度）
pub const CAPACITY: usize = u64::BITS as usize;

/// 固定容量的状态位掩码
///
/// 只在 `update` 与读取方法内部加锁，且持锁期间不会获取其他锁。
#[derive(Debug, Default)]
pub struct StatusMask {
    bits: RwLock<u64>,
}

impl StatusMask {
    /// 创建空的位掩码（全部健康）
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新指定位置的状态
    ///
    /// # 参数
    /// * `position` - 检查的位位置
    /// * `healthy` - 是否健康，`false` 置位，`true` 清位
    pub fn update(&self, position: usize, healthy: bool) {
        if position >= CAPACITY {
            warn!("忽略越界的状态位更新: {} (容量 {})", position, CAPACITY);
            return;
        }

        let mask = 1u64 << position;
        let mut bits = self.bits.write();
        if healthy {
            *bits &= !mask;
        } else {
            *bits |= mask;
        }
    }

    /// 服务是否整体健康
    pub fn is_healthy(&self) -> bool {
        *self.bits.read() == 0
    }

    /// 指定位置当前是否处于失败状态
    pub fn is_failing(&self, position: usize) -> bool {
        position < CAPACITY && *self.bits.read() & (1u64 << position) != 0
    }

    /// 当前失败的检查数量
    pub fn failing_count(&self) -> u32 {
        self.bits.read().count_ones()
    }

    /// 原始位掩码
    pub fn bits(&self) -> u64 {
        *self.bits.read()
    }
}
