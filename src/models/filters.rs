//! Audit log query options and filters

use super::audit::AuditEvent;
use crate::error::QueryError;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// 查询过滤条件（原始输入，空白值视为未设置）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFilters {
    /// 用户 ID 或邮箱
    #[serde(default, alias = "actor_id_or_email")]
    pub actor: Option<String>,
    #[serde(default, alias = "action_type")]
    pub action_kind: Option<String>,
    #[serde(default, alias = "resource_type")]
    pub resource_kind: Option<String>,
    #[serde(default)]
    pub actor_role: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// `YYYY-MM-DD`，包含当天
    #[serde(default)]
    pub date_from: Option<String>,
    /// `YYYY-MM-DD`，包含当天
    #[serde(default)]
    pub date_to: Option<String>,
}

/// 主体匹配方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActorMatch {
    /// 精确匹配 actor_id
    Id(String),
    /// 邮箱子串匹配，大小写不敏感
    Email(String),
}

/// 规范化后的过滤条件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedFilters {
    pub actor: Option<ActorMatch>,
    pub action_kind: Option<String>,
    pub resource_kind: Option<String>,
    pub actor_role: Option<String>,
    pub severity: Option<String>,
    pub status: Option<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

impl ResolvedFilters {
    /// 判断单条事件是否满足所有条件（内存存储使用）
    pub fn matches(&self, event: &AuditEvent) -> bool {
        if let Some(actor) = &self.actor {
            let ok = match actor {
                ActorMatch::Id(id) => event.actor_id == *id,
                ActorMatch::Email(needle) => event
                    .actor_email
                    .to_lowercase()
                    .contains(&needle.to_lowercase()),
            };
            if !ok {
                return false;
            }
        }

        let eq = |filter: &Option<String>, value: &str| {
            filter.as_deref().map_or(true, |f| f == value)
        };

        if !eq(&self.action_kind, &event.action_kind)
            || !eq(&self.actor_role, &event.actor_role)
            || !eq(&self.severity, &event.severity)
            || !eq(&self.status, &event.status)
        {
            return false;
        }

        if let Some(kind) = &self.resource_kind {
            if event.resource_kind.as_deref() != Some(kind.as_str()) {
                return false;
            }
        }
        if let Some(from) = self.created_from {
            if event.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.created_to {
            if event.created_at > to {
                return false;
            }
        }

        true
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

fn parse_day(field: &str, value: &str) -> Result<NaiveDate, QueryError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| {
        QueryError::new(format!("Invalid {}: expected YYYY-MM-DD", field), e.to_string())
    })
}

impl LogFilters {
    /// 去掉空白值、区分 ID/邮箱、把日期展开为整天范围（UTC）
    pub fn resolve(&self) -> Result<ResolvedFilters, QueryError> {
        let actor = non_blank(&self.actor).map(|value| {
            if value.contains('@') {
                ActorMatch::Email(value)
            } else {
                ActorMatch::Id(value)
            }
        });

        let created_from = match non_blank(&self.date_from) {
            Some(day) => {
                let start = parse_day("date_from", &day)?
                    .and_hms_opt(0, 0, 0)
                    .ok_or_else(|| QueryError::new("Invalid date_from", "start of day"))?;
                Some(Utc.from_utc_datetime(&start))
            }
            None => None,
        };

        let created_to = match non_blank(&self.date_to) {
            Some(day) => {
                let end = parse_day("date_to", &day)?
                    .and_hms_milli_opt(23, 59, 59, 999)
                    .ok_or_else(|| QueryError::new("Invalid date_to", "end of day"))?;
                Some(Utc.from_utc_datetime(&end))
            }
            None => None,
        };

        Ok(ResolvedFilters {
            actor,
            action_kind: non_blank(&self.action_kind),
            resource_kind: non_blank(&self.resource_kind),
            actor_role: non_blank(&self.actor_role),
            severity: non_blank(&self.severity),
            status: non_blank(&self.status),
            created_from,
            created_to,
        })
    }
}

/// 可排序字段
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    ActionKind,
    ActorEmail,
    ActorRole,
    ResourceKind,
    Status,
    Severity,
}

impl SortField {
    pub fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::ActionKind => "action_kind",
            SortField::ActorEmail => "actor_email",
            SortField::ActorRole => "actor_role",
            SortField::ResourceKind => "resource_kind",
            SortField::Status => "status",
            SortField::Severity => "severity",
        }
    }

    /// 未知字段回退为 created_at
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim).unwrap_or_default() {
            "action_kind" => SortField::ActionKind,
            "actor_email" => SortField::ActorEmail,
            "actor_role" => SortField::ActorRole,
            "resource_kind" => SortField::ResourceKind,
            "status" => SortField::Status,
            "severity" => SortField::Severity,
            _ => SortField::CreatedAt,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// 排序规则，同值时按写入顺序
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub order: SortOrder,
}

/// 分页范围，`None` 表示返回全部结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub offset: i64,
    pub limit: i64,
}

/// 查询参数
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// 每页条数，0 表示不限制
    pub limit: i64,
    pub offset: i64,
    pub filters: LogFilters,
    pub sort: SortSpec,
}

impl QueryOptions {
    pub fn page_range(&self) -> Option<PageRange> {
        if self.limit <= 0 {
            None
        } else {
            Some(PageRange {
                offset: self.offset.max(0),
                limit: self.limit,
            })
        }
    }
}

/// 一页查询结果；`error` 用于区分"无结果"与"查询失败"
#[derive(Debug, Clone, Serialize)]
pub struct LogPage {
    pub items: Vec<AuditEvent>,
    pub total_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<QueryError>,
}

impl LogPage {
    pub fn failed(error: QueryError) -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
