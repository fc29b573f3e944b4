//! Audit repository (审计数据访问)

use crate::{error::AppError, models::*};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

/// 审计事件存储接口
///
/// 事件写入后不可修改，因此接口中没有更新与删除操作。
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// 追加一条事件，返回存储层分配了 `id` 与 `created_at` 的记录
    async fn insert(&self, event: &NewAuditEvent) -> Result<AuditEvent, AppError>;

    /// 按条件查询，返回当前页与满足条件的总数
    async fn query(
        &self,
        filters: &ResolvedFilters,
        sort: SortSpec,
        page: Option<PageRange>,
    ) -> Result<(Vec<AuditEvent>, i64), AppError>;

    /// 查询 `since` 之后的统计投影
    async fn events_since(&self, since: DateTime<Utc>) -> Result<Vec<StatRow>, AppError>;

    /// 存储健康检查
    async fn ping(&self) -> Result<(), AppError>;
}

const EVENT_COLUMNS: &str = "id, actor_id, actor_email, actor_role, action_kind, resource_kind, \
     resource_id, description, details, ip_address, user_agent, session_id_hash, status, \
     severity, created_at";

/// PostgreSQL 实现
pub struct AuditRepository {
    db: PgPool,
}

impl AuditRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// 转义 ILIKE 通配符
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// 追加 WHERE 条件，列表与计数共用
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &ResolvedFilters) {
    qb.push(" WHERE 1=1");

    match &filters.actor {
        Some(ActorMatch::Id(id)) => {
            qb.push(" AND actor_id = ").push_bind(id.clone());
        }
        Some(ActorMatch::Email(email)) => {
            qb.push(" AND actor_email ILIKE ")
                .push_bind(format!("%{}%", escape_like(email)));
        }
        None => {}
    }

    let equals = [
        ("action_kind", &filters.action_kind),
        ("resource_kind", &filters.resource_kind),
        ("actor_role", &filters.actor_role),
        ("severity", &filters.severity),
        ("status", &filters.status),
    ];
    for (column, value) in equals {
        if let Some(value) = value {
            qb.push(format!(" AND {} = ", column))
                .push_bind(value.clone());
        }
    }

    if let Some(from) = filters.created_from {
        qb.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filters.created_to {
        qb.push(" AND created_at <= ").push_bind(to);
    }
}

#[async_trait]
impl AuditStore for AuditRepository {
    async fn insert(&self, event: &NewAuditEvent) -> Result<AuditEvent, AppError> {
        let sql = format!(
            r#"
            INSERT INTO audit_logs (
                actor_id, actor_email, actor_role, action_kind, resource_kind, resource_id,
                description, details, ip_address, user_agent, session_id_hash, status, severity
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            EVENT_COLUMNS
        );

        let stored = sqlx::query_as::<_, AuditEvent>(&sql)
            .bind(&event.actor_id)
            .bind(&event.actor_email)
            .bind(&event.actor_role)
            .bind(&event.action_kind)
            .bind(&event.resource_kind)
            .bind(&event.resource_id)
            .bind(&event.description)
            .bind(&event.details)
            .bind(&event.ip_address)
            .bind(&event.user_agent)
            .bind(&event.session_id_hash)
            .bind(&event.status)
            .bind(&event.severity)
            .fetch_one(&self.db)
            .await?;

        Ok(stored)
    }

    async fn query(
        &self,
        filters: &ResolvedFilters,
        sort: SortSpec,
        page: Option<PageRange>,
    ) -> Result<(Vec<AuditEvent>, i64), AppError> {
        let mut list =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM audit_logs", EVENT_COLUMNS));
        push_filters(&mut list, filters);
        list.push(format!(
            " ORDER BY {col} {dir}, seq {dir}",
            col = sort.field.column(),
            dir = sort.order.keyword()
        ));
        if let Some(page) = page {
            list.push(" LIMIT ").push_bind(page.limit);
            list.push(" OFFSET ").push_bind(page.offset);
        }

        let items = list
            .build_query_as::<AuditEvent>()
            .fetch_all(&self.db)
            .await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM audit_logs");
        push_filters(&mut count, filters);
        let total: i64 = count.build_query_scalar().fetch_one(&self.db).await?;

        Ok((items, total))
    }

    async fn events_since(&self, since: DateTime<Utc>) -> Result<Vec<StatRow>, AppError> {
        let rows = sqlx::query_as::<_, StatRow>(
            r#"
            SELECT actor_email, actor_role, action_kind, status, created_at
            FROM audit_logs
            WHERE created_at >= $1
            "#,
        )
        .bind(since)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").fetch_one(&self.db).await?;
        crate::db::record_pool_metrics(&self.db);
        Ok(())
    }
}
