//! Vitals Doctor 主程序入口
//!
//! 按配置注册健康检查并通过 HTTP 报告健康状态

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use vitals_doctor::cli::commands::{build_checks, load_config};
use vitals_doctor::cli::{Args, CheckCommand, Command, Commands, ValidateCommand};
use vitals_doctor::health::Doctor;
use vitals_doctor::logging::{LogConfig, LoggingSystem};
use vitals_doctor::signal_handler::setup_signal_handlers;
use vitals_doctor::web::WebServer;

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse();

    let result = match &args.command {
        Commands::Serve {
            bind,
            gate_connections,
        } => execute_serve_command(&args, bind.clone(), *gate_connections).await,
        Commands::Check { .. } => {
            init_cli_logging(&args)?;
            CheckCommand.execute(&args).await.map_err(anyhow::Error::from)
        }
        Commands::Validate { .. } => {
            init_cli_logging(&args)?;
            ValidateCommand
                .execute(&args)
                .await
                .map_err(anyhow::Error::from)
        }
    };

    if let Err(e) = result {
        error!("命令执行失败: {:#}", e);
        eprintln!("错误: {e:#}");
        std::process::exit(1);
    }

    Ok(())
}

/// 一次性命令使用命令行指定的日志级别，默认只输出警告
fn init_cli_logging(args: &Args) -> Result<()> {
    let log_config = LogConfig {
        level: args
            .log_level
            .clone()
            .map(Into::into)
            .unwrap_or(log::LevelFilter::Warn),
        ..Default::default()
    };
    LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;
    Ok(())
}

/// 启动常驻健康监控服务
async fn execute_serve_command(
    args: &Args,
    bind: Option<String>,
    gate_connections: bool,
) -> Result<()> {
    let config = load_config(&args.config)
        .await
        .with_context(|| format!("加载配置文件失败: {}", args.config.display()))?;

    // 命令行级别优先于配置文件
    let mut log_config = LogConfig::from_level_str(&config.global.log_level);
    if let Some(level) = args.log_level.clone() {
        log_config.level = level.into();
    }
    log_config.json_format = config.global.json_logs;
    LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;

    info!("Vitals Doctor v{} 启动", vitals_doctor::VERSION);
    info!("配置文件: {}", args.config.display());

    let shutdown = CancellationToken::new();
    setup_signal_handlers(shutdown.clone())
        .await
        .context("设置信号处理器失败")?;

    let doctor = Arc::new(Doctor::new(shutdown.child_token()));
    for check in build_checks(&config)? {
        let name = check.name.clone();
        doctor
            .register(check)
            .with_context(|| format!("注册检查 {name} 失败"))?;
        info!("已注册检查: {}", name);
    }
    if doctor.is_empty() {
        warn!("未配置任何检查，服务将始终报告健康");
    }

    let bind_address = bind.unwrap_or_else(|| config.global.bind_address.clone());
    let gate = gate_connections || config.global.gate_connections;
    let server = WebServer::new(bind_address, gate, Arc::clone(&doctor));

    let served = server.start(shutdown.clone()).await;

    // Web服务器退出（正常或出错）后停止所有检查
    shutdown.cancel();
    doctor.shutdown().await;
    info!("Vitals Doctor 已停止");

    served.context("Web服务器运行失败")
}
