//! 检查注册表
//!
//! 线程安全的名称到检查状态的映射，按注册顺序分配稠密且唯一的位位置。

use crate::error::RegisterError;
use crate::health::check::Check;
use crate::health::state::{CheckSnapshot, CheckState};
use crate::health::status::{StatusMask, CAPACITY};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
struct RegistryInner {
    items: HashMap<String, Arc<CheckState>>,
    count: usize,
}

/// 检查注册表
///
/// 注册表锁只在结构性修改与快照遍历期间持有，且持锁期间不会执行任何阻塞操作。
#[derive(Debug, Default)]
pub struct Registry {
    inner: RwLock<RegistryInner>,
}

impl Registry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册检查
    ///
    /// 新检查的位位置为当前注册数量，并立即在 `status` 中标记为失败，
    /// 直到第一次检查结果到达。
    ///
    /// # 参数
    /// * `check` - 检查定义
    /// * `status` - 聚合状态位掩码
    ///
    /// # 返回
    /// * `Result<Arc<CheckState>, RegisterError>` - 新的检查状态；失败时不产生任何状态变化
    pub fn register(
        &self,
        check: Check,
        status: &StatusMask,
    ) -> Result<Arc<CheckState>, RegisterError> {
        let mut inner = self.inner.write();

        if inner.items.contains_key(&check.name) {
            return Err(RegisterError::DuplicateName(check.name));
        }

        let position = inner.count;
        if position >= CAPACITY {
            return Err(RegisterError::capacity_exceeded());
        }

        let name = check.name.clone();
        let state = Arc::new(CheckState::new(check, position));
        status.update(position, false);
        inner.items.insert(name.clone(), Arc::clone(&state));
        inner.count += 1;

        debug!("注册检查: {} (位置 {})", name, position);
        Ok(state)
    }

    /// 已注册的检查数量
    pub fn len(&self) -> usize {
        self.inner.read().count
    }

    /// 注册表是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 按名称查找检查状态
    pub fn get(&self, name: &str) -> Option<Arc<CheckState>> {
        self.inner.read().items.get(name).cloned()
    }

    /// 当前失败的检查及其失败信息
    ///
    /// 只包含失败信息非空的检查；返回的映射是新分配的，可直接序列化。
    pub fn failing(&self) -> BTreeMap<String, String> {
        let inner = self.inner.read();
        inner
            .items
            .iter()
            .filter_map(|(name, state)| {
                let message = state.message();
                (!message.is_empty()).then(|| (name.clone(), message))
            })
            .collect()
    }

    /// 所有检查的状态快照，按位位置排序
    pub fn snapshots(&self) -> Vec<CheckSnapshot> {
        let inner = self.inner.read();
        let mut snapshots: Vec<CheckSnapshot> =
            inner.items.values().map(|state| state.snapshot()).collect();
        snapshots.sort_by_key(|snapshot| snapshot.position);
        snapshots
    }
}
