//! 配置数据结构定义
//!
//! 定义应用程序的配置结构体和验证逻辑

use crate::health::{Check, HttpProbe, TcpProbe, CAPACITY};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// 主配置结构，包含全局配置和检查列表
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// 全局配置项
    #[serde(default)]
    pub global: GlobalConfig,
    /// 检查配置列表
    #[serde(default)]
    pub checks: Vec<CheckConfig>,
}

/// 全局配置结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// 是否使用JSON日志格式
    #[serde(default)]
    pub json_logs: bool,
    /// 健康接口监听地址
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// 服务不健康时是否拒绝新连接
    #[serde(default)]
    pub gate_connections: bool,
    /// 默认检查间隔（秒）
    #[serde(default = "default_interval")]
    pub default_interval_seconds: u64,
    /// 默认检查超时（秒）
    #[serde(default = "default_timeout")]
    pub default_timeout_seconds: u64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            bind_address: default_bind_address(),
            gate_connections: false,
            default_interval_seconds: default_interval(),
            default_timeout_seconds: default_timeout(),
        }
    }
}

/// 检查类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    /// HTTP探测
    Http,
    /// TCP连接探测
    Tcp,
}

/// 检查配置结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckConfig {
    /// 检查名称
    pub name: String,
    /// 检查类型
    pub kind: CheckKind,
    /// HTTP探测URL
    pub url: Option<String>,
    /// HTTP方法
    #[serde(default = "default_method")]
    pub method: String,
    /// 期望的状态码列表
    #[serde(default = "default_status_codes")]
    pub expected_status_codes: Vec<u16>,
    /// 请求头
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// TCP探测地址（host:port）
    pub address: Option<String>,
    /// 检查特定的间隔（秒）
    pub interval_seconds: Option<u64>,
    /// 检查特定的超时（秒）
    pub timeout_seconds: Option<u64>,
}

// 默认值函数
fn default_log_level() -> String {
    "info".to_string()
}
fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}
fn default_interval() -> u64 {
    30
}
fn default_timeout() -> u64 {
    5
}
fn default_method() -> String {
    "GET".to_string()
}
fn default_status_codes() -> Vec<u16> {
    vec![200]
}

impl CheckConfig {
    /// 生效的检查间隔
    pub fn interval(&self, global: &GlobalConfig) -> Duration {
        Duration::from_secs(
            self.interval_seconds
                .unwrap_or(global.default_interval_seconds),
        )
    }

    /// 生效的超时时间
    pub fn timeout(&self, global: &GlobalConfig) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(global.default_timeout_seconds))
    }

    /// 根据配置构建检查定义
    ///
    /// # 参数
    /// * `global` - 全局配置，提供默认间隔和超时
    ///
    /// # 返回
    /// * `Result<Check, String>` - 检查定义，配置不完整时返回错误信息
    pub fn build(&self, global: &GlobalConfig) -> Result<Check, String> {
        let check = match self.kind {
            CheckKind::Http => {
                let url = self
                    .url
                    .as_deref()
                    .ok_or_else(|| format!("检查 {} 缺少 url", self.name))?;
                let probe = HttpProbe::new(url, &self.method, self.expected_status_codes.clone())
                    .map_err(|e| format!("检查 {} 配置无效: {}", self.name, e))?
                    .with_headers(self.headers.clone());
                Check::new(self.name.clone(), probe)
            }
            CheckKind::Tcp => {
                let address = self
                    .address
                    .as_deref()
                    .ok_or_else(|| format!("检查 {} 缺少 address", self.name))?;
                Check::new(self.name.clone(), TcpProbe::new(address))
            }
        };

        Ok(check
            .with_interval(self.interval(global))
            .with_timeout(self.timeout(global)))
    }
}

/// 间隔和超时的上限（7 天）
pub const MAX_DURATION_SECONDS: u64 = 7 * 24 * 60 * 60;

/// 配置验证函数
///
/// # 参数
/// * `config` - 要验证的配置
///
/// # 返回
/// * `Result<(), String>` - 验证结果，错误时返回错误信息
pub fn validate_config(config: &Config) -> Result<(), String> {
    // 验证全局配置
    if config.global.default_interval_seconds == 0 {
        return Err("默认检查间隔不能为0".to_string());
    }

    if config.global.default_timeout_seconds == 0 {
        return Err("默认检查超时不能为0".to_string());
    }

    if config.global.default_interval_seconds > MAX_DURATION_SECONDS
        || config.global.default_timeout_seconds > MAX_DURATION_SECONDS
    {
        return Err(format!(
            "默认检查间隔和超时不能超过 {MAX_DURATION_SECONDS} 秒"
        ));
    }

    // 验证日志级别
    let valid_log_levels = ["debug", "info", "warn", "error"];
    if !valid_log_levels.contains(&config.global.log_level.as_str()) {
        return Err(format!(
            "无效的日志级别: {}，支持的级别: {:?}",
            config.global.log_level, valid_log_levels
        ));
    }

    if config.global.bind_address.trim().is_empty() {
        return Err("监听地址不能为空".to_string());
    }

    // 验证检查配置
    if config.checks.len() > CAPACITY {
        return Err(format!(
            "检查数量 {} 超过上限 {}",
            config.checks.len(),
            CAPACITY
        ));
    }

    let mut names = HashSet::new();
    for check in &config.checks {
        if check.name.trim().is_empty() {
            return Err("检查名称不能为空".to_string());
        }

        if !names.insert(check.name.as_str()) {
            return Err(format!("检查名称重复: {}", check.name));
        }

        if check.interval_seconds == Some(0) {
            return Err(format!("检查 {} 的间隔不能为0", check.name));
        }

        if check.timeout_seconds == Some(0) {
            return Err(format!("检查 {} 的超时不能为0", check.name));
        }

        if check.interval_seconds.unwrap_or_default() > MAX_DURATION_SECONDS
            || check.timeout_seconds.unwrap_or_default() > MAX_DURATION_SECONDS
        {
            return Err(format!(
                "检查 {} 的间隔和超时不能超过 {} 秒",
                check.name, MAX_DURATION_SECONDS
            ));
        }

        match check.kind {
            CheckKind::Http => {
                let url = check.url.as_deref().unwrap_or_default();
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(format!("检查 {} 的URL格式无效", check.name));
                }

                if check.expected_status_codes.is_empty() {
                    return Err(format!("检查 {} 必须指定期望的状态码", check.name));
                }

                for &code in &check.expected_status_codes {
                    if !(100..=599).contains(&code) {
                        return Err(format!("检查 {} 的状态码 {} 无效", check.name, code));
                    }
                }
            }
            CheckKind::Tcp => {
                if check.address.as_deref().map_or(true, |a| a.trim().is_empty()) {
                    return Err(format!("检查 {} 缺少 address", check.name));
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http_check(name: &str) -> CheckConfig {
        CheckConfig {
            name: name.to_string(),
            kind: CheckKind::Http,
            url: Some("http://127.0.0.1:9000/ping".to_string()),
            method: "GET".to_string(),
            expected_status_codes: vec![200],
            headers: HashMap::new(),
            address: None,
            interval_seconds: None,
            timeout_seconds: None,
        }
    }

    fn create_test_config() -> Config {
        Config {
            global: GlobalConfig::default(),
            checks: vec![http_check("api")],
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&create_test_config()).is_ok());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = create_test_config();
        config.global.log_level = "verbose".to_string();
        assert!(validate_config(&config).unwrap_err().contains("日志级别"));
    }

    #[test]
    fn test_zero_intervals_rejected() {
        let mut config = create_test_config();
        config.global.default_interval_seconds = 0;
        assert!(validate_config(&config).is_err());

        let mut config = create_test_config();
        config.checks[0].timeout_seconds = Some(0);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_oversized_durations_rejected() {
        let mut config = create_test_config();
        config.checks[0].timeout_seconds = Some(u64::MAX);
        assert!(validate_config(&config).unwrap_err().contains("不能超过"));

        let mut config = create_test_config();
        config.checks[0].interval_seconds = Some(MAX_DURATION_SECONDS + 1);
        assert!(validate_config(&config).is_err());

        let mut config = create_test_config();
        config.global.default_timeout_seconds = u64::MAX;
        assert!(validate_config(&config).is_err());

        let mut config = create_test_config();
        config.checks[0].timeout_seconds = Some(MAX_DURATION_SECONDS);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut config = create_test_config();
        config.checks.push(http_check("api"));
        assert!(validate_config(&config).unwrap_err().contains("重复"));
    }

    #[test]
    fn test_capacity_limit() {
        let mut config = create_test_config();
        config.checks = (0..CAPACITY).map(|i| http_check(&format!("c{i}"))).collect();
        assert!(validate_config(&config).is_ok());

        config.checks.push(http_check("overflow"));
        assert!(validate_config(&config).unwrap_err().contains("上限"));
    }

    #[test]
    fn test_tcp_requires_address() {
        let mut config = create_test_config();
        config.checks[0].kind = CheckKind::Tcp;
        assert!(validate_config(&config).unwrap_err().contains("address"));

        config.checks[0].address = Some("127.0.0.1:5432".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_build_uses_global_defaults() {
        let global = GlobalConfig::default();
        let mut config = http_check("api");
        let check = config.build(&global).unwrap();
        assert_eq!(check.name, "api");
        assert_eq!(check.interval, Duration::from_secs(30));
        assert_eq!(check.timeout, Duration::from_secs(5));

        config.interval_seconds = Some(10);
        config.timeout_seconds = Some(2);
        let check = config.build(&global).unwrap();
        assert_eq!(check.interval, Duration::from_secs(10));
        assert_eq!(check.timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_build_missing_url() {
        let mut config = http_check("api");
        config.url = None;
        assert!(config.build(&GlobalConfig::default()).is_err());
    }
}
