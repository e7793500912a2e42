//! 健康感知的 TCP 监听器
//!
//! 服务不健康时立即关闭新接受的连接，已建立的连接不受影响；
//! 监听器本身持续运行，服务恢复后重新放行新连接。

use crate::health::Doctor;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error};

/// 健康感知的监听器
#[derive(Debug)]
pub struct HealthAwareListener {
    inner: TcpListener,
    doctor: Arc<Doctor>,
}

impl HealthAwareListener {
    /// 包装现有的监听器
    pub fn new(inner: TcpListener, doctor: Arc<Doctor>) -> Self {
        Self { inner, doctor }
    }

    /// 绑定地址并创建监听器
    pub async fn bind(address: &str, doctor: Arc<Doctor>) -> io::Result<Self> {
        let inner = TcpListener::bind(address).await?;
        Ok(Self::new(inner, doctor))
    }

    /// 监听地址
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    /// 接受一个连接
    ///
    /// 服务不健康时新连接会被立即关闭并继续等待下一个连接。
    pub async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        loop {
            let (stream, addr) = self.inner.accept().await?;
            if self.doctor.is_healthy() {
                return Ok((stream, addr));
            }

            debug!("服务不健康，关闭新连接: {}", addr);
            drop(stream);
        }
    }
}

impl axum::serve::Listener for HealthAwareListener {
    type Io = TcpStream;
    type Addr = SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        loop {
            match HealthAwareListener::accept(self).await {
                Ok(accepted) => return accepted,
                Err(e) => {
                    // 与 axum 内置 TcpListener 一致：接受失败时短暂等待后重试
                    error!("接受连接失败: {}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        self.inner.local_addr()
    }
}
