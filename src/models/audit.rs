//! Audit domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Login,
    Logout,
    Create,
    Update,
    Delete,
    View,
    Download,
    Print,
    AppointmentBooked,
    AppointmentCancelled,
    /// 顶层错误处理器上报的异常
    Error,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Login => "login",
            ActionKind::Logout => "logout",
            ActionKind::Create => "create",
            ActionKind::Update => "update",
            ActionKind::Delete => "delete",
            ActionKind::View => "view",
            ActionKind::Download => "download",
            ActionKind::Print => "print",
            ActionKind::AppointmentBooked => "appointment_booked",
            ActionKind::AppointmentCancelled => "appointment_cancelled",
            ActionKind::Error => "error",
        }
    }
}

/// 资源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    User,
    Patient,
    PsychologicalTest,
    NeuropsychologicalTest,
    NeuropsychiatricTest,
    PsychotherapySession,
    Appointment,
    Report,
    Profile,
    System,
    Authentication,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::User => "user",
            ResourceKind::Patient => "patient",
            ResourceKind::PsychologicalTest => "psychological_test",
            ResourceKind::NeuropsychologicalTest => "neuropsychological_test",
            ResourceKind::NeuropsychiatricTest => "neuropsychiatric_test",
            ResourceKind::PsychotherapySession => "psychotherapy_session",
            ResourceKind::Appointment => "appointment",
            ResourceKind::Report => "report",
            ResourceKind::Profile => "profile",
            ResourceKind::System => "system",
            ResourceKind::Authentication => "authentication",
        }
    }
}

/// 操作结果
///
/// `Blocked` 保留在取值范围内，目前没有调用方会设置它。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    #[default]
    Success,
    Failed,
    Blocked,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Success => "success",
            EventStatus::Failed => "failed",
            EventStatus::Blocked => "blocked",
        }
    }
}

/// 严重级别，与成功/失败无关
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// High / Critical 需要额外推送到告警通道
    pub fn requires_alert(&self) -> bool {
        matches!(self, Severity::High | Severity::Critical)
    }
}

/// 角色名称，查询失败时为 `unknown`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    pub const UNKNOWN: &'static str = "unknown";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Audit log entry as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditEvent {
    pub id: Uuid,
    pub actor_id: String,
    pub actor_email: String,
    pub actor_role: String,
    pub action_kind: String,
    pub resource_kind: Option<String>,
    pub resource_id: Option<String>,
    pub description: String,
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub session_id_hash: Option<String>,
    pub status: String,
    pub severity: String,
    pub created_at: DateTime<Utc>,
}

/// 待写入的审计记录，`id` 与 `created_at` 由存储层分配
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAuditEvent {
    pub actor_id: String,
    pub actor_email: String,
    pub actor_role: String,
    pub action_kind: String,
    pub resource_kind: Option<String>,
    pub resource_id: Option<String>,
    pub description: String,
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub session_id_hash: Option<String>,
    pub status: String,
    pub severity: String,
}

impl NewAuditEvent {
    /// `resource_kind:resource_id` 形式的资源引用，用于日志输出
    pub fn resource_ref(&self) -> String {
        match (&self.resource_kind, &self.resource_id) {
            (Some(kind), Some(id)) => format!("{}:{}", kind, id),
            (Some(kind), None) => kind.clone(),
            (None, Some(id)) => id.clone(),
            (None, None) => "-".to_string(),
        }
    }
}

/// Projection used by the statistics aggregator
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct StatRow {
    pub actor_email: String,
    pub actor_role: String,
    pub action_kind: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<&AuditEvent> for StatRow {
    fn from(event: &AuditEvent) -> Self {
        Self {
            actor_email: event.actor_email.clone(),
            actor_role: event.actor_role.clone(),
            action_kind: event.action_kind.clone(),
            status: event.status.clone(),
            created_at: event.created_at,
        }
    }
}
