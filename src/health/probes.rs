//! 内置检查函数
//!
//! 提供HTTP和TCP连接两种常用的健康探测，均遵循检查上下文的截止时间

use crate::error::CheckError;
use crate::health::check::{CheckContext, CheckHandler, CheckResult};
use async_trait::async_trait;
use reqwest::{Client, Method};
use std::collections::HashMap;
use std::str::FromStr;
use tokio::net::TcpStream;

/// HTTP健康探测
#[derive(Debug, Clone)]
pub struct HttpProbe {
    /// HTTP客户端
    client: Client,
    /// 探测URL
    url: String,
    /// HTTP方法
    method: Method,
    /// 期望的状态码列表
    expected_status_codes: Vec<u16>,
    /// 请求头
    headers: HashMap<String, String>,
}

impl HttpProbe {
    /// 创建新的HTTP探测
    ///
    /// # 参数
    /// * `url` - 探测URL
    /// * `method` - HTTP方法
    /// * `expected_status_codes` - 期望的状态码列表
    ///
    /// # 返回
    /// * `Result<Self, CheckError>` - 探测实例
    pub fn new(
        url: impl Into<String>,
        method: &str,
        expected_status_codes: Vec<u16>,
    ) -> Result<Self, CheckError> {
        let method = Method::from_str(&method.to_uppercase())
            .map_err(|_| CheckError::failed(format!("无效的HTTP方法: {method}")))?;

        let client = Client::builder()
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .build()
            .map_err(|e| CheckError::Other(e.into()))?;

        Ok(Self {
            client,
            url: url.into(),
            method,
            expected_status_codes,
            headers: HashMap::new(),
        })
    }

    /// 设置请求头
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// 验证响应状态码
    fn validate_status_code(&self, status_code: u16) -> bool {
        self.expected_status_codes.contains(&status_code)
    }

    /// 格式化请求错误信息
    fn format_request_error(error: &reqwest::Error) -> String {
        if error.is_timeout() {
            "Request timeout".to_string()
        } else if error.is_connect() {
            "Connection refused".to_string()
        } else if error.is_request() {
            "Invalid request".to_string()
        } else if error.is_decode() {
            "Response decode error".to_string()
        } else {
            format!("Request failed: {error}")
        }
    }
}

#[async_trait]
impl CheckHandler for HttpProbe {
    async fn check(&self, ctx: CheckContext) -> CheckResult {
        let mut request = self
            .client
            .request(self.method.clone(), &self.url)
            .timeout(ctx.remaining());
        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        let response = ctx
            .run(request.send())
            .await?
            .map_err(|e| CheckError::failed(Self::format_request_error(&e)))?;

        let status = response.status();
        if self.validate_status_code(status.as_u16()) {
            Ok(())
        } else {
            Err(CheckError::failed(format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )))
        }
    }
}

/// TCP连接探测
#[derive(Debug, Clone)]
pub struct TcpProbe {
    /// 目标地址（host:port）
    address: String,
}

impl TcpProbe {
    /// 创建新的TCP探测
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

#[async_trait]
impl CheckHandler for TcpProbe {
    async fn check(&self, ctx: CheckContext) -> CheckResult {
        ctx.run(TcpStream::connect(&self.address))
            .await?
            .map(drop)
            .map_err(|e| CheckError::failed(format!("连接 {} 失败: {}", self.address, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio_util::sync::CancellationToken;

    fn new_ctx() -> CheckContext {
        CheckContext::new(CancellationToken::new(), Duration::from_secs(5))
    }

    #[test]
    fn test_invalid_method() {
        let err = HttpProbe::new("http://localhost", "NOT A METHOD", vec![200]).unwrap_err();
        assert!(err.to_string().contains("无效的HTTP方法"));
    }

    #[test]
    fn test_validate_status_code() {
        let probe = HttpProbe::new("http://localhost", "get", vec![200, 204]).unwrap();
        assert!(probe.validate_status_code(200));
        assert!(probe.validate_status_code(204));
        assert!(!probe.validate_status_code(500));
    }

    #[tokio::test]
    async fn test_http_probe_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ping")
            .match_header("x-probe", "1")
            .with_status(200)
            .create_async()
            .await;

        let mut headers = HashMap::new();
        headers.insert("x-probe".to_string(), "1".to_string());
        let probe = HttpProbe::new(format!("{}/ping", server.url()), "GET", vec![200])
            .unwrap()
            .with_headers(headers);

        assert!(probe.check(new_ctx()).await.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_probe_status_mismatch() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/ping")
            .with_status(503)
            .create_async()
            .await;

        let probe = HttpProbe::new(format!("{}/ping", server.url()), "GET", vec![200]).unwrap();
        let err = probe.check(new_ctx()).await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP 503 Service Unavailable");
    }

    #[tokio::test]
    async fn test_tcp_probe() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let probe = TcpProbe::new(address.clone());
        assert!(probe.check(new_ctx()).await.is_ok());

        drop(listener);
        let err = probe.check(new_ctx()).await.unwrap_err();
        assert!(err.to_string().contains(&address));
    }

    #[tokio::test]
    async fn test_probe_respects_cancelled_context() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = CheckContext::new(token, Duration::from_secs(5));

        // 10.255.255.1 不可路由，连接会一直挂起直到上下文失效
        let probe = TcpProbe::new("10.255.255.1:9");
        let err = probe.check(ctx).await.unwrap_err();
        assert!(matches!(err, CheckError::Cancelled));
    }
}
