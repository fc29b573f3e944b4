//! 调用方提交的事件描述

use super::audit::{ActionKind, EventStatus, ResourceKind, Severity};
use super::session::{Actor, ClientInfo};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 记录器拥有的 details 键，调用方传入的同名值会被覆盖
pub const DETAILS_TIMESTAMP_KEY: &str = "timestamp";
pub const DETAILS_CLIENT_INFO_KEY: &str = "client_info";

/// 单个审计事件输入
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventInput {
    pub action_kind: ActionKind,
    #[serde(default)]
    pub resource_kind: Option<ResourceKind>,
    #[serde(default)]
    pub resource_id: Option<String>,
    pub description: String,
    #[serde(default)]
    pub details: Option<Value>,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default)]
    pub severity: Severity,
    /// 系统事件没有活动会话时使用
    #[serde(default)]
    pub actor_override: Option<Actor>,
}

impl EventInput {
    pub fn new(action_kind: ActionKind, description: impl Into<String>) -> Self {
        Self {
            action_kind,
            resource_kind: None,
            resource_id: None,
            description: description.into(),
            details: None,
            status: EventStatus::default(),
            severity: Severity::default(),
            actor_override: None,
        }
    }

    pub fn resource(mut self, kind: ResourceKind, id: Option<&str>) -> Self {
        self.resource_kind = Some(kind);
        self.resource_id = id.map(|s| s.to_string());
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status(mut self, status: EventStatus) -> Self {
        self.status = status;
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn actor_override(mut self, actor: Actor) -> Self {
        self.actor_override = Some(actor);
        self
    }
}

/// 顶层错误处理器上报的错误
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub message: String,
    #[serde(default)]
    pub stack: Option<String>,
    #[serde(default)]
    pub context: Option<Value>,
}

/// 降级记录（主存储不可用时写入）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub stack: Option<String>,
    pub context: Value,
}

/// 把 details 规范化为 JSON 对象
///
/// 字符串会按 JSON 解析；解析失败或结果不是对象时返回空对象并记录警告。
pub fn normalize_details(value: Option<Value>) -> Map<String, Value> {
    match value {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(Value::String(text)) => parse_details_text(&text),
        Some(other) => {
            tracing::warn!(kind = value_kind(&other), "Details payload is not an object, dropped");
            Map::new()
        }
    }
}

fn parse_details_text(text: &str) -> Map<String, Value> {
    if text.trim().is_empty() {
        return Map::new();
    }

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            tracing::warn!(kind = value_kind(&other), "Serialized details is not an object, dropped");
            Map::new()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to parse serialized details");
            Map::new()
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// 合并调用方 details 与记录器注入的时间戳、客户端信息
pub fn build_details(
    caller: Option<Value>,
    recorded_at: DateTime<Utc>,
    client: &ClientInfo,
) -> Value {
    let mut details = normalize_details(caller);
    details.insert(
        DETAILS_TIMESTAMP_KEY.to_string(),
        Value::String(recorded_at.to_rfc3339()),
    );
    details.insert(
        DETAILS_CLIENT_INFO_KEY.to_string(),
        serde_json::to_value(client).unwrap_or_else(|_| Value::Object(Map::new())),
    );
    Value::Object(details)
}
