//! 信号处理模块
//!
//! 将 SIGINT/SIGTERM 转换为进程级取消信号，用于优雅关闭

use crate::error::Result;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[cfg(unix)]
use signal_hook::consts::{SIGINT, SIGTERM};
#[cfg(unix)]
use signal_hook_tokio::Signals;

/// 设置信号处理器
///
/// 收到终止信号后触发 `shutdown`。
pub async fn setup_signal_handlers(shutdown: CancellationToken) -> Result<()> {
    #[cfg(unix)]
    {
        setup_unix_signals(shutdown).await
    }
    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("接收到 Ctrl+C，开始优雅关闭...");
                shutdown.cancel();
            }
        });
        Ok(())
    }
}

/// Unix/Linux系统信号处理
#[cfg(unix)]
async fn setup_unix_signals(shutdown: CancellationToken) -> Result<()> {
    use futures::stream::StreamExt;

    let signals = Signals::new([SIGINT, SIGTERM])?;
    let handle = signals.handle();

    tokio::spawn(async move {
        let mut signals = signals;
        tokio::select! {
            signal = signals.next() => {
                match signal {
                    Some(SIGINT) => info!("接收到 SIGINT 信号，开始优雅关闭..."),
                    Some(SIGTERM) => info!("接收到 SIGTERM 信号，开始优雅关闭..."),
                    Some(other) => info!("接收到信号 {other}，开始优雅关闭..."),
                    None => info!("信号流已结束，开始优雅关闭..."),
                }
                shutdown.cancel();
            }
            _ = shutdown.cancelled() => {}
        }
        handle.close();
    });

    Ok(())
}
