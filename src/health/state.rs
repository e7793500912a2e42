//! 单个检查的运行状态
//!
//! 每个检查拥有独立的锁，写入一个检查不会阻塞其他检查的读写。
//! 加锁顺序：注册表锁 → 检查锁 → 状态位掩码锁，位掩码锁内不获取任何其他锁。

use crate::health::check::{Check, CheckResult};
use crate::health::status::StatusMask;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

/// 尚未完成第一次检查时的失败信息
pub const PENDING_MESSAGE: &str = "[n/a]";

/// 检查的可变记录
#[derive(Debug, Clone)]
struct CheckRecord {
    healthy: bool,
    message: String,
    /// 最近一次被记录的检查周期
    cycle: u64,
    last_checked: Option<DateTime<Utc>>,
    consecutive_failures: u32,
}

/// 检查状态快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckSnapshot {
    /// 检查名称
    pub name: String,
    /// 位位置
    pub position: usize,
    /// 是否健康
    pub healthy: bool,
    /// 失败信息（健康时为空）
    pub message: String,
    /// 检查间隔（毫秒）
    #[serde(rename = "interval_ms", serialize_with = "serialize_millis")]
    pub interval: Duration,
    /// 超时时间（毫秒）
    #[serde(rename = "timeout_ms", serialize_with = "serialize_millis")]
    pub timeout: Duration,
    /// 最后检查时间
    pub last_checked: Option<DateTime<Utc>>,
    /// 连续失败次数
    pub consecutive_failures: u32,
}

fn serialize_millis<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// 检查状态，包装不可变的检查定义
pub struct CheckState {
    check: Check,
    position: usize,
    record: Mutex<CheckRecord>,
}

impl CheckState {
    /// 创建新的检查状态，初始为失败（等待第一次结果）
    pub(crate) fn new(check: Check, position: usize) -> Self {
        Self {
            check,
            position,
            record: Mutex::new(CheckRecord {
                healthy: false,
                message: PENDING_MESSAGE.to_string(),
                cycle: 0,
                last_checked: None,
                consecutive_failures: 0,
            }),
        }
    }

    /// 检查定义
    pub fn check(&self) -> &Check {
        &self.check
    }

    /// 检查名称
    pub fn name(&self) -> &str {
        &self.check.name
    }

    /// 位位置
    pub fn position(&self) -> usize {
        self.position
    }

    /// 当前是否健康
    pub fn is_healthy(&self) -> bool {
        self.record.lock().healthy
    }

    /// 当前失败信息
    pub fn message(&self) -> String {
        self.record.lock().message.clone()
    }

    /// 记录一次已经过切面转换的检查结果
    ///
    /// 早于已记录周期的结果会被丢弃，防止被放弃的慢检查覆盖更新的结论。
    ///
    /// # 返回
    /// * `bool` - 结果是否被记录
    pub(crate) fn record(&self, cycle: u64, result: &CheckResult, status: &StatusMask) -> bool {
        let mut record = self.record.lock();
        if cycle < record.cycle {
            return false;
        }

        let was_healthy = record.healthy;
        record.cycle = cycle;
        record.last_checked = Some(Utc::now());
        match result {
            Ok(()) => {
                status.update(self.position, true);
                record.healthy = true;
                record.message.clear();
                record.consecutive_failures = 0;
                if !was_healthy {
                    info!("检查恢复健康: {}", self.check.name);
                }
            }
            Err(e) => {
                status.update(self.position, false);
                record.healthy = false;
                record.message = e.to_string();
                record.consecutive_failures = record.consecutive_failures.saturating_add(1);
                if was_healthy {
                    warn!("检查失败: {},{}", self.check.name, record.message);
                }
            }
        }
        true
    }

    /// 生成状态快照
    pub fn snapshot(&self) -> CheckSnapshot {
        let record = self.record.lock();
        CheckSnapshot {
            name: self.check.name.clone(),
            position: self.position,
            healthy: record.healthy,
            message: record.message.clone(),
            interval: self.check.interval,
            timeout: self.check.timeout,
            last_checked: record.last_checked,
            consecutive_failures: record.consecutive_failures,
        }
    }
}

impl std::fmt::Debug for CheckState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckState")
            .field("check", &self.check)
            .field("position", &self.position)
            .field("record", &*self.record.lock())
            .finish()
    }
}
