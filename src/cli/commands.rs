//! 命令处理逻辑
//!
//! 实现一次性检查和配置验证命令，常驻服务由主程序启动

use crate::cli::args::{Args, Commands, OutputFormat};
use crate::config::{CheckConfig, Config, ConfigLoader, TomlConfigLoader};
use crate::error::{ConfigError, DoctorError, Result};
use crate::health::{run_once, Check};
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<()>;
}

/// 加载并验证配置文件
pub async fn load_config(path: &Path) -> Result<Config> {
    TomlConfigLoader::default().load_from_file(path).await
}

/// 根据配置构建所有检查
pub fn build_checks(config: &Config) -> Result<Vec<Check>> {
    config
        .checks
        .iter()
        .map(|c| {
            c.build(&config.global)
                .map_err(|e| DoctorError::from(ConfigError::ValidationError(e)))
        })
        .collect()
}

/// 配置验证命令
pub struct ValidateCommand;

#[async_trait]
impl Command for ValidateCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Validate { verbose } = &args.command {
            self.validate_config_file(&args.config, *verbose).await
        } else {
            Ok(())
        }
    }
}

impl ValidateCommand {
    /// 验证配置文件
    async fn validate_config_file(&self, config_path: &Path, verbose: bool) -> Result<()> {
        println!("验证配置文件: {}", config_path.display());

        let config = load_config(config_path).await?;
        // 构建检查以发现探针级别的问题（如非法的 HTTP 方法）
        build_checks(&config)?;

        if verbose {
            println!("配置验证通过！");
            println!("全局配置:");
            println!("  日志级别: {}", config.global.log_level);
            println!("  监听地址: {}", config.global.bind_address);
            println!(
                "  连接准入: {}",
                if config.global.gate_connections { "是" } else { "否" }
            );
            println!("  默认间隔: {}秒", config.global.default_interval_seconds);
            println!("  默认超时: {}秒", config.global.default_timeout_seconds);

            println!("检查配置:");
            for (i, check) in config.checks.iter().enumerate() {
                println!("  {}. {} ({})", i + 1, check.name, describe_target(check));
                println!("     间隔: {:?}", check.interval(&config.global));
                println!("     超时: {:?}", check.timeout(&config.global));
            }
        } else {
            println!("✓ 配置文件验证通过");
            println!("✓ 找到 {} 个检查配置", config.checks.len());
        }

        Ok(())
    }
}

/// 检查目标描述
fn describe_target(check: &CheckConfig) -> String {
    match (&check.url, &check.address) {
        (Some(url), _) => format!("{} {}", check.method, url),
        (None, Some(address)) => format!("tcp {address}"),
        (None, None) => "-".to_string(),
    }
}

/// 一次性检查的输出
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    /// 检查名称
    pub name: String,
    /// 是否健康
    pub healthy: bool,
    /// 失败信息
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 一次性检查命令
pub struct CheckCommand;

#[async_trait]
impl Command for CheckCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Check { name, format } = &args.command {
            let config = load_config(&args.config).await?;
            let outcomes = self.run_checks(&config, name.as_deref()).await?;
            self.print_outcomes(&outcomes, format)?;

            let failed = outcomes.iter().filter(|o| !o.healthy).count();
            if failed > 0 {
                return Err(DoctorError::Other(anyhow::anyhow!(
                    "{failed} 个检查失败"
                )));
            }
        }
        Ok(())
    }
}

impl CheckCommand {
    /// 并发执行选中的检查，每个检查执行一次
    pub async fn run_checks(&self, config: &Config, name: Option<&str>) -> Result<Vec<CheckOutcome>> {
        let checks: Vec<Check> = build_checks(config)?
            .into_iter()
            .filter(|c| name.is_none_or(|n| c.name == n))
            .collect();

        if checks.is_empty() {
            return Err(match name {
                Some(n) => ConfigError::ValidationError(format!("未找到名为 '{n}' 的检查")),
                None => ConfigError::ValidationError("未配置任何检查".to_string()),
            }
            .into());
        }

        let shutdown = CancellationToken::new();
        let results =
            futures::future::join_all(checks.iter().map(|check| run_once(check, &shutdown))).await;

        Ok(checks
            .iter()
            .zip(results)
            .map(|(check, result)| CheckOutcome {
                name: check.name.clone(),
                healthy: result.is_ok(),
                error: result.err().map(|e| e.to_string()),
            })
            .collect())
    }

    /// 输出检查结果
    fn print_outcomes(&self, outcomes: &[CheckOutcome], format: &OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(outcomes)?);
            }
            OutputFormat::Text => {
                for outcome in outcomes {
                    match &outcome.error {
                        None => println!("✓ {}", outcome.name),
                        Some(e) => println!("✗ {}: {}", outcome.name, e),
                    }
                }
            }
        }
        Ok(())
    }
}
