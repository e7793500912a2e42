//! 健康监控核心
//!
//! `Doctor` 组合注册表、聚合状态和进程级取消令牌，对外提供注册检查、
//! 查询整体健康状态以及失败详情的接口。

use crate::error::RegisterError;
use crate::health::check::Check;
use crate::health::registry::Registry;
use crate::health::runner::Runner;
use crate::health::state::CheckSnapshot;
use crate::health::status::StatusMask;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// 整体健康状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// 服务正常
    Up,
    /// 服务异常
    Down,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Up => write!(f, "up"),
            HealthStatus::Down => write!(f, "down"),
        }
    }
}

/// 健康报告，供报告适配器序列化
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// 整体状态
    pub status: HealthStatus,
    /// 失败检查及其信息，仅在状态为 down 时存在
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
}

impl HealthReport {
    /// 是否健康
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Up
    }
}

/// 健康监控核心
#[derive(Debug)]
pub struct Doctor {
    registry: Registry,
    status: Arc<StatusMask>,
    shutdown: CancellationToken,
    runners: Mutex<Vec<JoinHandle<()>>>,
}

impl Doctor {
    /// 创建新的健康监控核心
    ///
    /// # 参数
    /// * `shutdown` - 进程级取消令牌，触发后所有 Runner 停止后续周期
    pub fn new(shutdown: CancellationToken) -> Self {
        Self {
            registry: Registry::new(),
            status: Arc::new(StatusMask::new()),
            shutdown,
            runners: Mutex::new(Vec::new()),
        }
    }

    /// 注册检查并启动对应的 Runner
    ///
    /// 立即返回，不等待检查执行。新检查在第一次结果到达前视为失败。
    /// 必须在 tokio 运行时内调用。
    ///
    /// # 返回
    /// * `Result<(), RegisterError>` - 容量超限、名称重复或不在运行时内时返回错误，且不产生任何状态变化
    pub fn register(&self, check: Check) -> Result<(), RegisterError> {
        let handle =
            Handle::try_current().map_err(|_| RegisterError::NoRuntime(check.name.clone()))?;

        let state = self.registry.register(check, &self.status)?;
        info!(
            "注册健康检查: {} (位置 {}, 间隔 {:?}, 超时 {:?})",
            state.name(),
            state.position(),
            state.check().interval,
            state.check().timeout
        );

        let runner = Runner::new(state, Arc::clone(&self.status), self.shutdown.clone());
        let task = handle.spawn(runner.run());
        self.runners.lock().push(task);
        Ok(())
    }

    /// 服务是否整体健康
    pub fn is_healthy(&self) -> bool {
        self.status.is_healthy()
    }

    /// 当前失败的检查及其失败信息
    pub fn failing_checks(&self) -> BTreeMap<String, String> {
        self.registry.failing()
    }

    /// 生成健康报告
    pub fn report(&self) -> HealthReport {
        if self.is_healthy() {
            HealthReport {
                status: HealthStatus::Up,
                errors: None,
            }
        } else {
            HealthReport {
                status: HealthStatus::Down,
                errors: Some(self.failing_checks()),
            }
        }
    }

    /// 所有检查的状态快照，按位位置排序
    pub fn checks(&self) -> Vec<CheckSnapshot> {
        self.registry.snapshots()
    }

    /// 已注册的检查数量
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// 是否没有注册任何检查
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// 聚合状态位掩码
    pub fn status(&self) -> &StatusMask {
        &self.status
    }

    /// 进程级取消令牌
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// 触发取消信号并等待所有 Runner 退出
    ///
    /// 正在执行的检查函数不会被中断。
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let runners: Vec<JoinHandle<()>> = std::mem::take(&mut *self.runners.lock());
        debug!("等待 {} 个检查任务退出", runners.len());
        for runner in runners {
            if let Err(e) = runner.await {
                warn!("检查任务退出异常: {}", e);
            }
        }
        info!("健康监控已停止");
    }
}
