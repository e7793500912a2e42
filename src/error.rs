//! 错误处理模块
//!
//! 定义应用程序的统一错误类型

use crate::health::CAPACITY;
use std::time::Duration;
use thiserror::Error;

/// Vitals Doctor 的主要错误类型
#[derive(Error, Debug)]
pub enum DoctorError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 检查注册错误
    #[error("注册错误: {0}")]
    Register(#[from] RegisterError),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 其他错误
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件解析错误
    #[error("配置文件解析失败: {0}")]
    ParseError(String),

    /// 配置验证错误
    #[error("配置验证失败: {0}")]
    ValidationError(String),

    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVarError { var: String },
}

/// 检查注册错误
///
/// 注册失败时不会产生任何状态变化：不占用位置，也不会启动 Runner。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    /// 已达到检查数量上限
    #[error("health-check threshold ({capacity}) exceeded")]
    CapacityExceeded { capacity: usize },

    /// 同名检查已注册
    #[error("health-check '{0}' is already registered")]
    DuplicateName(String),

    /// 当前线程不在 tokio 运行时中，无法启动 Runner
    #[error("no tokio runtime available to run health-check '{0}'")]
    NoRuntime(String),
}

impl RegisterError {
    /// 容量超限错误，使用全局唯一的容量常量
    pub fn capacity_exceeded() -> Self {
        RegisterError::CapacityExceeded { capacity: CAPACITY }
    }
}

/// 健康检查失败原因
///
/// `Display` 的输出即为记录到检查状态中的失败信息。
#[derive(Error, Debug)]
pub enum CheckError {
    /// 检查失败（自定义信息）
    #[error("{0}")]
    Failed(String),

    /// 检查在超时前未完成
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// 检查函数发生 panic
    #[error("check panicked: {0}")]
    Panicked(String),

    /// 上下文已取消
    #[error("check cancelled")]
    Cancelled,

    /// 其他错误
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CheckError {
    /// 以任意信息构造失败结果
    pub fn failed(message: impl Into<String>) -> Self {
        CheckError::Failed(message.into())
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, DoctorError>;
