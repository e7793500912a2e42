//! Vitals Doctor - 进程内健康监控库
//!
//! 为长时间运行的服务提供进程内健康检测：
//! - 注册任意数量（上限 64）的命名检查
//! - 每个检查在独立任务中按间隔执行，带超时控制
//! - 基于位掩码的整体健康判定，读取无需遍历检查
//! - HTTP 健康接口与按健康状态拒绝新连接的监听器
//! - 结构化日志记录

pub mod cli;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod net;
pub mod signal_handler;
pub mod web;

// 重新导出主要类型
pub use config::{CheckConfig, Config, GlobalConfig};
pub use error::{CheckError, DoctorError, RegisterError};
pub use health::{
    Aspect, Check, CheckContext, CheckHandler, CheckResult, CheckSnapshot, Doctor, HealthReport,
    HealthStatus, CAPACITY,
};
pub use net::HealthAwareListener;

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
