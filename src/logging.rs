//! 日志系统模块
//!
//! 提供结构化日志配置和初始化功能

use log::LevelFilter;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter, Layer};

/// 全局日志初始化状态
#[derive(Debug)]
struct GlobalLoggingState {
    /// 是否已初始化
    initialized: bool,
    /// 初始化结果
    init_result: Result<(), String>,
    /// 当前配置
    current_config: Option<LogConfig>,
}

impl Default for GlobalLoggingState {
    fn default() -> Self {
        Self {
            initialized: false,
            init_result: Ok(()),
            current_config: None,
        }
    }
}

/// 全局日志状态管理器
static GLOBAL_LOGGING_STATE: OnceLock<Mutex<GlobalLoggingState>> = OnceLock::new();

/// 日志配置结构
#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    /// 日志级别
    pub level: LevelFilter,
    /// 日志文件路径（可选）
    pub file_path: Option<PathBuf>,
    /// 是否输出到控制台
    pub console: bool,
    /// 是否使用JSON格式
    pub json_format: bool,
    /// 模块级别日志控制
    pub module_levels: HashMap<String, LevelFilter>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            file_path: None,
            console: true,
            json_format: false,
            module_levels: HashMap::new(),
        }
    }
}

impl LogConfig {
    /// 从级别字符串创建配置，无法识别时使用 info
    pub fn from_level_str(level: &str) -> Self {
        Self {
            level: LevelFilter::from_str(level).unwrap_or(LevelFilter::Info),
            ..Default::default()
        }
    }
}

/// 日志系统管理器
#[derive(Debug)]
pub struct LoggingSystem {
    /// 配置
    config: LogConfig,
}

impl LoggingSystem {
    /// 初始化日志系统
    ///
    /// 线程安全的单次初始化；重复调用返回新的句柄而不会重复安装 subscriber。
    pub fn setup_logging(config: LogConfig) -> anyhow::Result<Self> {
        Self::setup_logging_with_options(config, false)
    }

    /// 初始化日志系统（带选项）
    ///
    /// # 参数
    /// * `config` - 日志配置
    /// * `force_reinit` - 是否强制重新初始化（主要用于测试）
    pub fn setup_logging_with_options(
        config: LogConfig,
        force_reinit: bool,
    ) -> anyhow::Result<Self> {
        let state_mutex =
            GLOBAL_LOGGING_STATE.get_or_init(|| Mutex::new(GlobalLoggingState::default()));

        {
            let state = state_mutex.lock();
            if state.initialized && !force_reinit {
                return match &state.init_result {
                    Ok(()) => Ok(Self { config }),
                    Err(e) => Err(anyhow::anyhow!("日志系统之前初始化失败: {}", e)),
                };
            }
        }

        let init_result = Self::perform_initialization(&config);

        {
            let mut state = state_mutex.lock();
            state.initialized = true;
            state.current_config = Some(config.clone());
            state.init_result = init_result.as_ref().map(|_| ()).map_err(|e| e.to_string());
        }

        init_result.map(|()| Self { config })
    }

    /// 当前句柄使用的配置
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// 执行实际的日志系统初始化
    fn perform_initialization(config: &LogConfig) -> anyhow::Result<()> {
        Self::init_log_tracer()?;
        Self::init_tracing_subscriber(config)
    }

    /// 初始化 LogTracer（log crate 到 tracing 的桥接）
    fn init_log_tracer() -> anyhow::Result<()> {
        use tracing_log::LogTracer;

        static LOG_TRACER_INIT: OnceLock<Result<(), String>> = OnceLock::new();

        let result = LOG_TRACER_INIT.get_or_init(|| LogTracer::init().map_err(|e| e.to_string()));

        result
            .as_ref()
            .map_err(|e| anyhow::anyhow!("LogTracer初始化失败: {}", e))?;
        Ok(())
    }

    /// 初始化 tracing subscriber
    fn init_tracing_subscriber(config: &LogConfig) -> anyhow::Result<()> {
        let mut env_filter = EnvFilter::from_default_env()
            .add_directive(Self::convert_level_to_directive(config.level));

        for (module, level) in &config.module_levels {
            match format!("{}={}", module, Self::level_to_string(*level)).parse() {
                Ok(directive) => env_filter = env_filter.add_directive(directive),
                Err(e) => return Err(anyhow::anyhow!("无效的模块日志级别 {}: {}", module, e)),
            }
        }

        let fmt_layer = if config.json_format {
            fmt::layer()
                .json()
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .with_file(true)
                .with_line_number(true)
                .boxed()
        } else {
            fmt::layer()
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .with_ansi(true)
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .boxed()
        };

        let result = match (&config.file_path, config.console) {
            (Some(file_path), false) => {
                let file = std::fs::File::create(file_path)
                    .map_err(|e| anyhow::anyhow!("创建日志文件失败: {}", e))?;
                let file_layer = fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_file(true)
                    .with_line_number(true);

                registry().with(env_filter).with(file_layer).try_init()
            }
            _ => registry().with(env_filter).with(fmt_layer).try_init(),
        };

        match result {
            Ok(()) => {
                tracing::info!("日志系统初始化完成");
                tracing::debug!("日志配置: {:?}", config);
                Ok(())
            }
            Err(e) => {
                let error_msg = e.to_string();
                if error_msg.contains(
                    "attempted to set a logger after the logging system was already initialized",
                ) || error_msg.contains("a global default trace dispatcher has already been set")
                {
                    tracing::debug!("日志系统已经初始化过了");
                    Ok(())
                } else {
                    Err(anyhow::anyhow!(
                        "tracing subscriber初始化失败: {}",
                        error_msg
                    ))
                }
            }
        }
    }

    /// 将 log::LevelFilter 转换为 tracing 的指令
    fn convert_level_to_directive(level: LevelFilter) -> tracing_subscriber::filter::Directive {
        use tracing_subscriber::filter::{Directive, LevelFilter as TracingLevel};
        match level {
            LevelFilter::Off => Directive::from(TracingLevel::OFF),
            LevelFilter::Error => Directive::from(tracing::Level::ERROR),
            LevelFilter::Warn => Directive::from(tracing::Level::WARN),
            LevelFilter::Info => Directive::from(tracing::Level::INFO),
            LevelFilter::Debug => Directive::from(tracing::Level::DEBUG),
            LevelFilter::Trace => Directive::from(tracing::Level::TRACE),
        }
    }

    /// 将 log::LevelFilter 转换为字符串
    fn level_to_string(level: LevelFilter) -> &'static str {
        match level {
            LevelFilter::Off => "off",
            LevelFilter::Error => "error",
            LevelFilter::Warn => "warn",
            LevelFilter::Info => "info",
            LevelFilter::Debug => "debug",
            LevelFilter::Trace => "trace",
        }
    }

    /// 检查日志系统是否已初始化
    pub fn is_initialized() -> bool {
        GLOBAL_LOGGING_STATE
            .get()
            .map(|state| state.lock().initialized)
            .unwrap_or(false)
    }

    /// 获取当前日志配置（如果已初始化）
    pub fn current_config() -> Option<LogConfig> {
        GLOBAL_LOGGING_STATE
            .get()
            .and_then(|state| state.lock().current_config.clone())
    }
}
