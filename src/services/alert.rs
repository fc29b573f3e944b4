//! 高严重级别事件告警
//! 核心只调用 `notify`，具体投递方式由部署方替换

use crate::models::NewAuditEvent;

/// 告警通道
pub trait AlertSink: Send + Sync {
    fn notify(&self, event: &NewAuditEvent);
}

/// 默认实现：输出一条 warn 级别日志
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn notify(&self, event: &NewAuditEvent) {
        tracing::warn!(
            actor = %event.actor_email,
            actor_id = %event.actor_id,
            action = %event.action_kind,
            resource = %event.resource_ref(),
            severity = %event.severity,
            details = %event.details,
            "High severity audit event"
        );
    }
}
