//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{handlers, middleware::AppState};

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    // 公开端点（健康检查）
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check));

    // 审计日志
    let audit_routes = Router::new()
        .route("/api/v1/audit/events", post(handlers::audit::record_event))
        .route("/api/v1/audit/errors", post(handlers::audit::report_error))
        .route("/api/v1/audit/logs", get(handlers::audit::list_audit_logs))
        .route(
            "/api/v1/audit/logs/export",
            get(handlers::audit::export_audit_logs),
        )
        .route(
            "/api/v1/audit/stats",
            get(handlers::audit::get_audit_statistics),
        )
        .route(
            "/api/v1/audit/fallback",
            get(handlers::audit::list_fallback_entries),
        );

    Router::new()
        .merge(public_routes)
        .merge(audit_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(axum::middleware::from_fn(
            crate::middleware::request_tracking_middleware,
        ))
        .with_state(state)
}
