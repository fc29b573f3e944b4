//! In-memory audit store
//! 开发环境与测试使用，过滤与排序语义与 PostgreSQL 实现保持一致

use super::audit_repo::AuditStore;
use crate::{error::AppError, models::*};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryAuditStore {
    // 按写入顺序保存，下标即插入序号
    events: RwLock<Vec<AuditEvent>>,
    offline: AtomicBool,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 模拟存储不可用，所有操作返回错误
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }

    /// 直接写入一条已构造的事件（用于导入或测试构造历史数据）
    pub async fn push_raw(&self, event: AuditEvent) {
        self.events.write().await.push(event);
    }

    fn check_online(&self) -> Result<(), AppError> {
        if self.offline.load(AtomicOrdering::SeqCst) {
            return Err(AppError::StoreUnavailable("memory store is offline".to_string()));
        }
        Ok(())
    }
}

// None 排在所有值之后，与 PostgreSQL 默认的 NULLS LAST (ASC) / NULLS FIRST (DESC) 一致
fn cmp_optional(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare(field: SortField, a: &AuditEvent, b: &AuditEvent) -> Ordering {
    match field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::ActionKind => a.action_kind.cmp(&b.action_kind),
        SortField::ActorEmail => a.actor_email.cmp(&b.actor_email),
        SortField::ActorRole => a.actor_role.cmp(&b.actor_role),
        SortField::ResourceKind => cmp_optional(&a.resource_kind, &b.resource_kind),
        SortField::Status => a.status.cmp(&b.status),
        SortField::Severity => a.severity.cmp(&b.severity),
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn insert(&self, event: &NewAuditEvent) -> Result<AuditEvent, AppError> {
        self.check_online()?;

        // 在写锁内取时间，created_at 顺序与写入顺序一致
        let mut events = self.events.write().await;
        let stored = AuditEvent {
            id: Uuid::new_v4(),
            actor_id: event.actor_id.clone(),
            actor_email: event.actor_email.clone(),
            actor_role: event.actor_role.clone(),
            action_kind: event.action_kind.clone(),
            resource_kind: event.resource_kind.clone(),
            resource_id: event.resource_id.clone(),
            description: event.description.clone(),
            details: event.details.clone(),
            ip_address: event.ip_address.clone(),
            user_agent: event.user_agent.clone(),
            session_id_hash: event.session_id_hash.clone(),
            status: event.status.clone(),
            severity: event.severity.clone(),
            created_at: Utc::now(),
        };

        events.push(stored.clone());
        Ok(stored)
    }

    async fn query(
        &self,
        filters: &ResolvedFilters,
        sort: SortSpec,
        page: Option<PageRange>,
    ) -> Result<(Vec<AuditEvent>, i64), AppError> {
        self.check_online()?;

        let events = self.events.read().await;
        let mut matched: Vec<(usize, &AuditEvent)> = events
            .iter()
            .enumerate()
            .filter(|(_, e)| filters.matches(e))
            .collect();

        matched.sort_by(|(seq_a, a), (seq_b, b)| {
            let ordering = compare(sort.field, a, b).then(seq_a.cmp(seq_b));
            match sort.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let total = matched.len() as i64;
        let items = match page {
            Some(page) => matched
                .into_iter()
                .skip(page.offset.max(0) as usize)
                .take(page.limit.max(0) as usize)
                .map(|(_, e)| e.clone())
                .collect(),
            None => matched.into_iter().map(|(_, e)| e.clone()).collect(),
        };

        Ok((items, total))
    }

    async fn events_since(&self, since: DateTime<Utc>) -> Result<Vec<StatRow>, AppError> {
        self.check_online()?;

        let events = self.events.read().await;
        Ok(events
            .iter()
            .filter(|e| e.created_at >= since)
            .map(StatRow::from)
            .collect())
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.check_online()
    }
}
