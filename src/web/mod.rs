//! Web 报告模块
//!
//! 提供健康状态的 HTTP 接口

use crate::health::Doctor;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod handlers;
pub mod server;

pub use server::WebServer;

/// Web 应用状态
#[derive(Debug, Clone)]
pub struct WebAppState {
    /// 健康监控核心
    pub doctor: Arc<Doctor>,
}

/// 创建路由
pub fn create_router(doctor: Arc<Doctor>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/v1/checks", get(handlers::api_checks))
        .layer(TraceLayer::new_for_http())
        .with_state(WebAppState { doctor })
}
