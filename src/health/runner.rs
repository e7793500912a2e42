//! 检查运行器
//!
//! 每个已注册的检查对应一个常驻的 Runner 任务，周期性地执行
//! “带超时执行 → 记录结果 → 等待间隔” 的循环，直到进程级取消信号触发。
//!
//! 检查函数在独立任务中运行。超时后 Runner 只是停止等待并记录超时失败，
//! 不会强制终止检查任务：忽略取消信号的检查函数会一直占用其任务直到自行返回，
//! 这是违反非阻塞约定的检查函数带来的资源泄漏风险。以同步方式阻塞线程的检查函数
//! 同样会占用一个运行时工作线程。

use crate::error::CheckError;
use crate::health::check::{Check, CheckContext, CheckResult};
use crate::health::state::CheckState;
use crate::health::status::StatusMask;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// 单个检查的运行器
pub struct Runner {
    state: Arc<CheckState>,
    status: Arc<StatusMask>,
    shutdown: CancellationToken,
}

impl Runner {
    /// 创建新的运行器
    ///
    /// # 参数
    /// * `state` - 检查状态
    /// * `status` - 聚合状态位掩码
    /// * `shutdown` - 进程级取消令牌
    pub fn new(
        state: Arc<CheckState>,
        status: Arc<StatusMask>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            state,
            status,
            shutdown,
        }
    }

    /// 运行检查循环，直到取消令牌触发
    ///
    /// 每个周期结束后使用新的定时器等待间隔，而不是固定频率的 ticker，
    /// 因此检查耗时接近超时时循环也不会落后或堆积周期。
    pub async fn run(self) {
        let name = self.state.name().to_string();
        info!("启动检查任务: {}", name);

        let mut cycle: u64 = 0;
        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            cycle += 1;
            self.run_cycle(cycle).await;

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.state.check().interval) => {}
            }
        }

        info!("检查任务已停止: {}", name);
    }

    /// 执行一个检查周期
    ///
    /// 等待检查任务完成、超时或进程取消三者中最先发生的一个。
    async fn run_cycle(&self, cycle: u64) {
        let check = self.state.check();
        let ctx = CheckContext::new(self.shutdown.child_token(), check.timeout);
        let cycle_ctx = ctx.clone();

        let state = Arc::clone(&self.state);
        let status = Arc::clone(&self.status);
        let mut work = tokio::spawn(async move {
            let raw = invoke(state.check(), ctx).await;
            let result = apply_aspect(state.check(), raw);
            if !state.record(cycle, &result, &status) {
                debug!("丢弃过期的检查结果: {} (周期 {})", state.name(), cycle);
            }
            result.is_ok()
        });

        tokio::select! {
            biased;
            joined = &mut work => match joined {
                Ok(healthy) => debug!("检查完成: {} (周期 {}, 健康: {})", check.name, cycle, healthy),
                Err(e) => error!("检查任务异常退出: {} - {}", check.name, e),
            },
            _ = tokio::time::sleep(check.timeout) => {
                cycle_ctx.cancel();
                if work.is_finished() {
                    // 检查任务已在截止时间前记录结果
                    debug!("检查在截止时间完成: {} (周期 {})", check.name, cycle);
                    return;
                }
                warn!(
                    "检查超时，放弃等待: {} (超时 {:?})；未响应取消信号的检查函数会继续占用资源",
                    check.name, check.timeout
                );
                let result = apply_aspect(check, Err(CheckError::Timeout(check.timeout)));
                self.state.record(cycle, &result, &self.status);
            }
            _ = self.shutdown.cancelled() => {
                debug!("收到取消信号，停止等待检查: {}", check.name);
            }
        }
    }
}

/// 立即执行一次检查，不记录状态
///
/// 用于命令行的一次性检查。超时后检查 future 会被直接丢弃，
/// 因此不适用于需要放弃而非中断的常驻调度场景。
pub async fn run_once(check: &Check, shutdown: &CancellationToken) -> CheckResult {
    let ctx = CheckContext::new(shutdown.child_token(), check.timeout);
    let raw = match tokio::time::timeout(check.timeout, invoke(check, ctx.clone())).await {
        Ok(result) => result,
        Err(_) => {
            ctx.cancel();
            Err(CheckError::Timeout(check.timeout))
        }
    };
    apply_aspect(check, raw)
}

/// 调用检查函数，将 panic 转换为失败结果
async fn invoke(check: &Check, ctx: CheckContext) -> CheckResult {
    let handler = Arc::clone(&check.handler);
    let fut = match std::panic::catch_unwind(AssertUnwindSafe(|| handler.check(ctx))) {
        Ok(fut) => fut,
        Err(payload) => return Err(panicked(&check.name, payload)),
    };

    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(panicked(&check.name, payload)),
    }
}

/// 应用结果转换切面，切面发生 panic 时视为失败
fn apply_aspect(check: &Check, result: CheckResult) -> CheckResult {
    std::panic::catch_unwind(AssertUnwindSafe(|| check.aspect.apply(check, result)))
        .unwrap_or_else(|payload| Err(panicked(&check.name, payload)))
}

fn panicked(name: &str, payload: Box<dyn Any + Send>) -> CheckError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    error!("检查函数发生panic: {} - {}", name, message);
    CheckError::Panicked(message)
}
