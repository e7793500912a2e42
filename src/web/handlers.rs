//! Web 路由处理函数
//!
//! 将健康监控核心的状态渲染为 HTTP 响应

use super::WebAppState;
use crate::health::CheckSnapshot;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use tracing::debug;

/// 健康检查端点处理函数
///
/// 健康时返回 200 和 `{"status":"up"}`，否则返回 503 以及失败检查的详情。
pub async fn health(State(app_state): State<WebAppState>) -> impl IntoResponse {
    let report = app_state.doctor.report();
    let status_code = if report.is_healthy() {
        StatusCode::OK
    } else {
        debug!("健康检查未通过: {:?}", report.errors);
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(report))
}

/// 检查列表端点处理函数
pub async fn api_checks(State(app_state): State<WebAppState>) -> Json<Vec<CheckSnapshot>> {
    Json(app_state.doctor.checks())
}
