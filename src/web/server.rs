//! Web服务器实现
//!
//! 绑定监听地址并提供健康接口，支持按健康状态拒绝新连接

use super::create_router;
use crate::error::Result;
use crate::health::Doctor;
use crate::net::HealthAwareListener;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Web服务器
#[derive(Debug)]
pub struct WebServer {
    /// 监听地址
    bind_address: String,
    /// 服务不健康时是否拒绝新连接
    gate_connections: bool,
    /// 健康监控核心
    doctor: Arc<Doctor>,
}

impl WebServer {
    /// 创建新的Web服务器
    ///
    /// # 参数
    /// * `bind_address` - 监听地址（host:port）
    /// * `gate_connections` - 服务不健康时是否拒绝新连接
    /// * `doctor` - 健康监控核心
    pub fn new(bind_address: impl Into<String>, gate_connections: bool, doctor: Arc<Doctor>) -> Self {
        Self {
            bind_address: bind_address.into(),
            gate_connections,
            doctor,
        }
    }

    /// 启动Web服务器，直到 `shutdown` 被触发
    pub async fn start(&self, shutdown: CancellationToken) -> Result<()> {
        let router = create_router(Arc::clone(&self.doctor));
        let listener = TcpListener::bind(self.bind_address.as_str()).await?;
        let addr = listener.local_addr()?;

        info!("Web服务器已启动: http://{}", addr);
        info!("健康检查地址: http://{}/health", addr);

        let signal = async move {
            shutdown.cancelled().await;
            info!("接收到关闭信号，正在关闭Web服务器...");
        };

        if self.gate_connections {
            info!("已启用连接准入：服务不健康时拒绝新连接");
            let listener = HealthAwareListener::new(listener, Arc::clone(&self.doctor));
            axum::serve(listener, router)
                .with_graceful_shutdown(signal)
                .await?;
        } else {
            axum::serve(listener, router)
                .with_graceful_shutdown(signal)
                .await?;
        }

        info!("Web服务器已关闭");
        Ok(())
    }
}
