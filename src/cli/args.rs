//! 命令行参数定义
//!
//! 使用clap定义命令行参数结构

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Vitals Doctor 命令行参数
#[derive(Parser, Debug, Clone)]
#[command(
    name = "vitals-doctor",
    version = crate::VERSION,
    about = crate::APP_DESCRIPTION,
    long_about = None
)]
pub struct Args {
    /// 配置文件路径
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config.toml",
        help = "配置文件路径",
        env = "VITALS_DOCTOR_CONFIG"
    )]
    pub config: PathBuf,

    /// 日志级别（覆盖配置文件中的设置）
    #[arg(
        short,
        long,
        value_enum,
        help = "日志级别",
        env = "VITALS_DOCTOR_LOG_LEVEL"
    )]
    pub log_level: Option<LogLevel>,

    /// 子命令
    #[command(subcommand)]
    pub command: Commands,
}

/// 日志级别枚举
#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum LogLevel {
    /// 调试级别
    Debug,
    /// 信息级别
    Info,
    /// 警告级别
    Warn,
    /// 错误级别
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// 子命令定义
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// 启动健康监控并提供 HTTP 健康接口
    Serve {
        /// 监听地址（覆盖配置文件）
        #[arg(
            short,
            long,
            value_name = "ADDR",
            help = "监听地址",
            env = "VITALS_DOCTOR_BIND"
        )]
        bind: Option<String>,

        /// 服务不健康时拒绝新连接
        #[arg(long, help = "服务不健康时拒绝新连接")]
        gate_connections: bool,
    },

    /// 对每个检查执行一次并输出结果
    Check {
        /// 检查名称（可选，不指定则执行所有检查）
        #[arg(value_name = "NAME", help = "检查名称")]
        name: Option<String>,

        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },

    /// 验证配置文件
    Validate {
        /// 是否显示详细信息
        #[arg(short, long, help = "显示详细信息")]
        verbose: bool,
    },
}

/// 输出格式
#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum OutputFormat {
    /// 文本格式
    Text,
    /// JSON格式
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve() {
        let args = Args::try_parse_from([
            "vitals-doctor",
            "--config",
            "/etc/vitals.toml",
            "serve",
            "--bind",
            "0.0.0.0:9000",
            "--gate-connections",
        ])
        .unwrap();

        assert_eq!(args.config, PathBuf::from("/etc/vitals.toml"));
        assert!(args.log_level.is_none());
        match args.command {
            Commands::Serve {
                bind,
                gate_connections,
            } => {
                assert_eq!(bind.as_deref(), Some("0.0.0.0:9000"));
                assert!(gate_connections);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_check_with_format() {
        let args = Args::try_parse_from([
            "vitals-doctor",
            "--log-level",
            "debug",
            "check",
            "db",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(args.log_level, Some(LogLevel::Debug));
        match args.command {
            Commands::Check { name, format } => {
                assert_eq!(name.as_deref(), Some("db"));
                assert_eq!(format, OutputFormat::Json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(log::LevelFilter::from(LogLevel::Warn), log::LevelFilter::Warn);
        assert_eq!(LogLevel::Error.to_string(), "error");
    }

    #[test]
    fn test_missing_subcommand_rejected() {
        assert!(Args::try_parse_from(["vitals-doctor"]).is_err());
    }
}
