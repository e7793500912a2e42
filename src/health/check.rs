//! 健康检查定义
//!
//! 定义检查函数、结果转换切面（Aspect）以及带超时的检查上下文

use crate::error::CheckError;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// 单次检查的结果，`Ok(())` 表示健康
pub type CheckResult = std::result::Result<(), CheckError>;

/// 默认检查间隔
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// 默认检查超时
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// 超时时间超出 `Instant` 表示范围时使用的截止时长（约 30 年，与 tokio 定时器一致）
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// 单次检查的上下文
///
/// 由进程级取消令牌派生，并限定在检查的超时时间内。
/// 检查函数应在 `cancelled()` 完成后尽快返回；
/// 忽略取消信号的检查函数会在超时后被放弃（不会被强制终止）。
#[derive(Debug, Clone)]
pub struct CheckContext {
    token: CancellationToken,
    deadline: Instant,
}

impl CheckContext {
    /// 创建新的检查上下文
    ///
    /// # 参数
    /// * `token` - 本周期的取消令牌（通常是进程级令牌的子令牌）
    /// * `timeout` - 超时时间
    pub fn new(token: CancellationToken, timeout: Duration) -> Self {
        let now = Instant::now();
        Self {
            token,
            deadline: now.checked_add(timeout).unwrap_or_else(|| now + FAR_FUTURE),
        }
    }

    /// 截止时间
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// 距离截止时间的剩余时长
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// 上下文是否已失效（被取消或超时）
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || Instant::now() >= self.deadline
    }

    /// 等待上下文被取消或到达截止时间
    pub async fn cancelled(&self) {
        tokio::select! {
            _ = self.token.cancelled() => {}
            _ = tokio::time::sleep_until(self.deadline) => {}
        }
    }

    /// 在上下文有效期内执行 future，失效时返回 `CheckError::Cancelled`
    pub async fn run<F, T>(&self, fut: F) -> Result<T, CheckError>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(CheckError::Cancelled),
            out = fut => Ok(out),
        }
    }

    /// 取消上下文
    pub(crate) fn cancel(&self) {
        self.token.cancel();
    }
}

/// 健康检查函数trait
#[async_trait]
pub trait CheckHandler: Send + Sync {
    /// 执行一次检查
    ///
    /// # 参数
    /// * `ctx` - 本次检查的上下文
    ///
    /// # 返回
    /// * `CheckResult` - `Ok(())` 表示健康，错误信息会被记录为失败原因
    async fn check(&self, ctx: CheckContext) -> CheckResult;
}

#[async_trait]
impl<F, Fut> CheckHandler for F
where
    F: Fn(CheckContext) -> Fut + Send + Sync,
    Fut: Future<Output = CheckResult> + Send + 'static,
{
    async fn check(&self, ctx: CheckContext) -> CheckResult {
        (self)(ctx).await
    }
}

/// 结果转换切面
///
/// 在记录结果之前对检查函数的原始结果进行重新解释，转换结果具有最终决定权。
pub trait Aspect: Send + Sync {
    /// 转换检查结果
    fn apply(&self, check: &Check, result: CheckResult) -> CheckResult;
}

impl<F> Aspect for F
where
    F: Fn(&Check, CheckResult) -> CheckResult + Send + Sync,
{
    fn apply(&self, check: &Check, result: CheckResult) -> CheckResult {
        (self)(check, result)
    }
}

/// 默认切面，原样返回结果
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Aspect for Identity {
    fn apply(&self, _check: &Check, result: CheckResult) -> CheckResult {
        result
    }
}

/// 健康检查定义，注册后不可变
#[derive(Clone)]
pub struct Check {
    /// 检查名称（唯一）
    pub name: String,
    /// 检查函数
    pub handler: Arc<dyn CheckHandler>,
    /// 两次检查开始之间的间隔
    pub interval: Duration,
    /// 单次检查的超时时间
    pub timeout: Duration,
    /// 结果转换切面
    pub aspect: Arc<dyn Aspect>,
}

impl Check {
    /// 创建新的检查定义，使用默认间隔、超时和切面
    ///
    /// # 参数
    /// * `name` - 检查名称
    /// * `handler` - 检查函数
    pub fn new<H>(name: impl Into<String>, handler: H) -> Self
    where
        H: CheckHandler + 'static,
    {
        Self {
            name: name.into(),
            handler: Arc::new(handler),
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            aspect: Arc::new(Identity),
        }
    }

    /// 设置检查间隔
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// 设置超时时间
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 设置结果转换切面
    pub fn with_aspect<A>(mut self, aspect: A) -> Self
    where
        A: Aspect + 'static,
    {
        self.aspect = Arc::new(aspect);
        self
    }
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Check")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
