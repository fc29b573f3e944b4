//! 审计日志的 HTTP 处理器

use crate::{
    auth::SessionContext,
    error::AppError,
    middleware::{AppState, ClientContext},
    models::*,
    services::export::export_filename,
};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use validator::Validate;

/// 列表与导出共用的查询参数
#[derive(Debug, Default, Deserialize, validator::Validate)]
pub struct AuditLogQuery {
    #[serde(alias = "actor_id_or_email")]
    pub actor: Option<String>,
    #[serde(alias = "action_type")]
    pub action_kind: Option<String>,
    #[serde(alias = "resource_type")]
    pub resource_kind: Option<String>,
    pub actor_role: Option<String>,
    pub severity: Option<String>,
    pub status: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    /// 0 表示不分页
    #[validate(range(min = 0, max = 1000))]
    pub limit: Option<i64>,
    #[validate(range(min = 0))]
    pub offset: Option<i64>,
}

impl AuditLogQuery {
    pub fn filters(&self) -> LogFilters {
        LogFilters {
            actor: self.actor.clone(),
            action_kind: self.action_kind.clone(),
            resource_kind: self.resource_kind.clone(),
            actor_role: self.actor_role.clone(),
            severity: self.severity.clone(),
            status: self.status.clone(),
            date_from: self.date_from.clone(),
            date_to: self.date_to.clone(),
        }
    }

    pub fn options(&self, default_limit: i64) -> QueryOptions {
        QueryOptions {
            limit: self.limit.unwrap_or(default_limit),
            offset: self.offset.unwrap_or(0),
            filters: self.filters(),
            sort: SortSpec {
                field: SortField::parse(self.sort_by.as_deref()),
                order: SortOrder::parse(self.sort_order.as_deref()),
            },
        }
    }
}

#[derive(Debug, Deserialize, validator::Validate)]
pub struct StatsQuery {
    #[validate(range(min = 1, max = 365))]
    pub window_days: Option<i64>,
}

/// 记录事件请求
///
/// 主体只来自网关转发的会话头；请求体中的 `actor_override` 会被忽略。
#[derive(Debug, Deserialize, validator::Validate)]
pub struct RecordEventRequest {
    pub action_kind: ActionKind,
    pub resource_kind: Option<ResourceKind>,
    pub resource_id: Option<String>,
    #[validate(length(min = 1, max = 1000))]
    pub description: String,
    pub details: Option<Value>,
    pub status: Option<EventStatus>,
    pub severity: Option<Severity>,
    /// 浏览器侧才能得到的信息（屏幕分辨率、时区），补全请求头中缺失的字段
    pub client_info: Option<ClientInfo>,
}

impl RecordEventRequest {
    fn into_input(self) -> (EventInput, Option<ClientInfo>) {
        let input = EventInput {
            action_kind: self.action_kind,
            resource_kind: self.resource_kind,
            resource_id: self.resource_id,
            description: self.description,
            details: self.details,
            status: self.status.unwrap_or_default(),
            severity: self.severity.unwrap_or_default(),
            actor_override: None,
        };
        (input, self.client_info)
    }
}

/// 错误上报请求
#[derive(Debug, Deserialize, validator::Validate)]
pub struct ErrorReportRequest {
    #[validate(length(min = 1))]
    pub message: String,
    pub stack: Option<String>,
    pub context: Option<Value>,
    pub client_info: Option<ClientInfo>,
}

fn record_context(
    session: SessionContext,
    client: ClientContext,
    body_client: Option<ClientInfo>,
) -> RecordContext {
    RecordContext {
        session: session.0,
        client: match body_client {
            Some(extra) => client.client.fill_from(extra),
            None => client.client,
        },
        ip_address: client.ip_address,
    }
}

fn recorded_response(recorded: bool) -> Response {
    let status = if recorded {
        StatusCode::CREATED
    } else {
        StatusCode::ACCEPTED
    };
    (status, Json(json!({ "recorded": recorded }))).into_response()
}

/// 记录审计事件
///
/// 记录失败不会返回错误状态：201 表示已写入，202 表示已丢弃。
pub async fn record_event(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    client: ClientContext,
    Json(request): Json<RecordEventRequest>,
) -> Result<Response, AppError> {
    request.validate()?;

    let (input, body_client) = request.into_input();
    let ctx = record_context(session, client, body_client);
    let recorded = state.audit_service.record(input, &ctx).await;

    Ok(recorded_response(recorded))
}

/// 顶层错误处理器上报
pub async fn report_error(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    client: ClientContext,
    Json(request): Json<ErrorReportRequest>,
) -> Result<Response, AppError> {
    request.validate()?;

    let ctx = record_context(session, client, request.client_info);
    let report = ErrorReport {
        message: request.message,
        stack: request.stack,
        context: request.context,
    };
    let recorded = state.audit_service.report_error(report, &ctx).await;

    Ok(recorded_response(recorded))
}

/// 查询审计日志
pub async fn list_audit_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuditLogQuery>,
) -> Result<Response, AppError> {
    query.validate()?;

    let options = query.options(state.config.audit.default_page_size);
    let page = state.audit_service.query(&options).await;

    let status = if page.is_error() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };

    Ok((status, Json(page)).into_response())
}

/// 导出审计日志（CSV）
///
/// 使用与列表相同的过滤和排序参数；分页参数不生效，行数由导出上限决定。
pub async fn export_audit_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuditLogQuery>,
) -> Result<Response, AppError> {
    query.validate()?;

    let options = query.options(state.config.audit.default_page_size);
    let response = match state
        .audit_service
        .export_csv(&options.filters, options.sort)
        .await
    {
        Ok(csv) => {
            let disposition = format!(
                "attachment; filename=\"{}\"",
                export_filename(chrono::Utc::now().date_naive())
            );
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                csv,
            )
                .into_response()
        }
        Err(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": error })),
        )
            .into_response(),
    };

    Ok(response)
}

/// 汇总统计
pub async fn get_audit_statistics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatsQuery>,
) -> Result<Response, AppError> {
    query.validate()?;

    let window_days = query
        .window_days
        .unwrap_or(state.config.audit.stats_window_days);

    let response = match state.audit_service.statistics(window_days).await {
        Ok(stats) => (StatusCode::OK, Json(json!(stats))).into_response(),
        Err(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": error })),
        )
            .into_response(),
    };

    Ok(response)
}

/// 降级记录列表
pub async fn list_fallback_entries(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let entries = state.audit_service.fallback_entries().await;

    Json(json!({
        "entries": entries,
        "count": entries.len()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_options_defaults() {
        let query = AuditLogQuery::default();
        let options = query.options(50);

        assert_eq!(options.limit, 50);
        assert_eq!(options.offset, 0);
        assert_eq!(options.sort, SortSpec::default());
    }

    #[test]
    fn test_query_validation() {
        let query = AuditLogQuery {
            limit: Some(5000),
            ..Default::default()
        };
        assert!(query.validate().is_err());

        let query = AuditLogQuery {
            limit: Some(0),
            offset: Some(10),
            ..Default::default()
        };
        assert!(query.validate().is_ok());
        assert_eq!(query.options(50).page_range(), None);
    }

    #[test]
    fn test_empty_description_rejected() {
        let request: RecordEventRequest = serde_json::from_value(json!({
            "action_kind": "view",
            "description": ""
        }))
        .unwrap();
        assert!(request.validate().is_err());
    }
}
