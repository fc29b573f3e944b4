//! 审计日志服务
//!
//! 写入路径（`record`）永远不向调用方返回错误：会话、角色、存储的失败都被转换为
//! `false` 加日志。读取路径（`query` / `statistics` / `export_csv`）把存储错误作为
//! 结构化的 [`QueryError`] 返回。

use crate::{
    error::{AppError, QueryError},
    models::*,
    repository::{AuditStore, RoleLookup},
    services::{
        alert::{AlertSink, TracingAlertSink},
        export::render_csv,
        fallback::FallbackLog,
        statistics::aggregate,
    },
};
use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// 导出默认上限
pub const DEFAULT_EXPORT_MAX_ROWS: i64 = 10_000;

pub struct AuditService {
    store: Arc<dyn AuditStore>,
    roles: Arc<dyn RoleLookup>,
    alerts: Arc<dyn AlertSink>,
    fallback: Arc<FallbackLog>,
    export_max_rows: i64,
}

impl AuditService {
    pub fn new(
        store: Arc<dyn AuditStore>,
        roles: Arc<dyn RoleLookup>,
        fallback: Arc<FallbackLog>,
    ) -> Self {
        Self {
            store,
            roles,
            alerts: Arc::new(TracingAlertSink),
            fallback,
            export_max_rows: DEFAULT_EXPORT_MAX_ROWS,
        }
    }

    /// 替换告警通道
    pub fn with_alert_sink(mut self, alerts: Arc<dyn AlertSink>) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn with_export_limit(mut self, max_rows: i64) -> Self {
        self.export_max_rows = max_rows.max(1);
        self
    }

    // ==================== Recorder ====================

    /// 记录审计事件，仅当写入存储成功时返回 `true`
    pub async fn record(&self, input: EventInput, ctx: &RecordContext) -> bool {
        self.record_inner(input, ctx, None).await
    }

    /// 顶层错误处理器使用：主存储写入失败时写入降级记录
    pub async fn report_error(&self, report: ErrorReport, ctx: &RecordContext) -> bool {
        let context = report
            .context
            .clone()
            .unwrap_or_else(|| Value::Object(Map::new()));

        let input = EventInput::new(
            ActionKind::Error,
            format!("Application error: {}", report.message),
        )
        .resource(ResourceKind::System, None)
        .status(EventStatus::Failed)
        .severity(Severity::High)
        .details(json!({
            "message": report.message.clone(),
            "stack": report.stack.clone(),
            "context": context.clone(),
        }));

        let recorded = self.record_inner(input, ctx, Some(report.message.as_str())).await;
        if !recorded {
            self.fallback
                .push(FallbackEntry {
                    timestamp: Utc::now(),
                    message: report.message,
                    stack: report.stack,
                    context,
                })
                .await;
        }

        recorded
    }

    /// 降级记录列表，最旧的在前
    pub async fn fallback_entries(&self) -> Vec<FallbackEntry> {
        self.fallback.entries().await
    }

    async fn record_inner(
        &self,
        input: EventInput,
        ctx: &RecordContext,
        origin_error: Option<&str>,
    ) -> bool {
        let actor = match input
            .actor_override
            .clone()
            .or_else(|| ctx.session.as_ref().map(|s| s.actor.clone()))
        {
            Some(actor) => actor,
            None => {
                tracing::warn!(
                    action = input.action_kind.as_str(),
                    "No authenticated actor, audit event skipped"
                );
                metrics::counter!("audit_events_recorded_total", "outcome" => "rejected")
                    .increment(1);
                return false;
            }
        };

        let role = self.resolve_role(&actor).await;
        let severity = input.severity;

        let event = NewAuditEvent {
            actor_id: actor.id,
            actor_email: actor.email,
            actor_role: role.as_str().to_string(),
            action_kind: input.action_kind.as_str().to_string(),
            resource_kind: input.resource_kind.map(|k| k.as_str().to_string()),
            resource_id: input.resource_id,
            description: input.description,
            details: build_details(input.details, Utc::now(), &ctx.client),
            ip_address: ctx.ip_address.clone(),
            user_agent: ctx.client.user_agent.clone(),
            session_id_hash: ctx.session_token().and_then(session_id_hash),
            status: input.status.as_str().to_string(),
            severity: severity.as_str().to_string(),
        };

        let stored = match self.store.insert(&event).await {
            Ok(stored) => {
                tracing::debug!(
                    id = %stored.id,
                    action = %stored.action_kind,
                    actor = %stored.actor_email,
                    "Audit event recorded"
                );
                metrics::counter!("audit_events_recorded_total", "outcome" => "stored")
                    .increment(1);
                true
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    origin_error = origin_error.unwrap_or("-"),
                    action = %event.action_kind,
                    actor = %event.actor_email,
                    "Failed to record audit event"
                );
                metrics::counter!("audit_events_recorded_total", "outcome" => "store_failed")
                    .increment(1);
                false
            }
        };

        // 与写入结果无关
        if severity.requires_alert() {
            self.alerts.notify(&event);
        }

        stored
    }

    async fn resolve_role(&self, actor: &Actor) -> Role {
        match self.roles.role_of(&actor.id).await {
            Ok(role) => role,
            Err(e) => {
                tracing::warn!(actor_id = %actor.id, error = %e, "Role lookup failed, using unknown");
                Role::unknown()
            }
        }
    }

    // ==================== Query ====================

    /// 查询审计日志；失败时 `items` 为空、`total_count` 为 0 且 `error` 有值
    pub async fn query(&self, options: &QueryOptions) -> LogPage {
        let filters = match options.filters.resolve() {
            Ok(filters) => filters,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected audit log filters");
                return LogPage::failed(e);
            }
        };

        match self
            .store
            .query(&filters, options.sort, options.page_range())
            .await
        {
            Ok((items, total_count)) => LogPage {
                items: items.into_iter().map(normalize_event).collect(),
                total_count,
                error: None,
            },
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch audit logs");
                LogPage::failed(QueryError::from_app("Failed to fetch audit logs", &e))
            }
        }
    }

    /// 按相同过滤条件与排序导出 CSV，最多 `export_max_rows` 行
    pub async fn export_csv(
        &self,
        filters: &LogFilters,
        sort: SortSpec,
    ) -> Result<String, QueryError> {
        let options = QueryOptions {
            limit: self.export_max_rows,
            offset: 0,
            filters: filters.clone(),
            sort,
        };

        let page = self.query(&options).await;
        if let Some(error) = page.error {
            return Err(error);
        }

        tracing::info!(rows = page.items.len(), total = page.total_count, "Audit logs exported");
        render_csv(&page.items).map_err(|e| {
            tracing::error!(error = %e, "Failed to render audit log export");
            QueryError::new("Failed to export audit logs", e.to_string())
        })
    }

    // ==================== Statistics ====================

    /// 最近 `window_days` 天的汇总统计
    pub async fn statistics(&self, window_days: i64) -> Result<AuditStats, QueryError> {
        let window = Duration::try_days(window_days)
            .ok_or_else(|| QueryError::new("Invalid statistics window", window_days.to_string()))?;
        let since = Utc::now() - window;

        let rows = self.store.events_since(since).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch audit statistics");
            QueryError::from_app("Failed to fetch audit statistics", &e)
        })?;

        Ok(aggregate(&rows, window_days))
    }

    /// 存储健康检查
    pub async fn ping(&self) -> Result<(), AppError> {
        self.store.ping().await
    }
}

/// 读取时同样保证 details 为结构化对象
fn normalize_event(mut event: AuditEvent) -> AuditEvent {
    if !event.details.is_object() {
        event.details = Value::Object(normalize_details(Some(event.details)));
    }
    event
}
