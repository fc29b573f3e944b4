//! Audit statistics models

use serde::Serialize;
use std::collections::BTreeMap;

/// 单个角色的统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoleStats {
    pub users: u64,
    pub actions: u64,
    pub logins: u64,
    pub failed: u64,
}

/// 时间窗口内的汇总统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditStats {
    pub window_days: i64,
    pub total_actions: u64,
    pub total_users: u64,
    pub login_count: u64,
    pub failed_actions: u64,
    pub by_role: BTreeMap<String, RoleStats>,
}
