//! 审计统计汇总

use crate::models::{AuditStats, StatRow};
use std::collections::{HashMap, HashSet};

const LOGIN: &str = "login";
const FAILED: &str = "failed";

/// 一次遍历计算全部统计值，空输入得到全零结果
pub fn aggregate(rows: &[StatRow], window_days: i64) -> AuditStats {
    let mut users: HashSet<&str> = HashSet::new();
    let mut role_users: HashMap<&str, HashSet<&str>> = HashMap::new();
    let mut stats = AuditStats {
        window_days,
        ..Default::default()
    };

    for row in rows {
        let is_login = row.action_kind == LOGIN;
        let is_failed = row.status == FAILED;

        stats.total_actions += 1;
        users.insert(row.actor_email.as_str());
        if is_login {
            stats.login_count += 1;
        }
        if is_failed {
            stats.failed_actions += 1;
        }

        let role = stats.by_role.entry(row.actor_role.clone()).or_default();
        role.actions += 1;
        if is_login {
            role.logins += 1;
        }
        if is_failed {
            role.failed += 1;
        }
        role_users
            .entry(row.actor_role.as_str())
            .or_default()
            .insert(row.actor_email.as_str());
    }

    stats.total_users = users.len() as u64;
    for (role, emails) in role_users {
        if let Some(entry) = stats.by_role.get_mut(role) {
            entry.users = emails.len() as u64;
        }
    }

    stats
}
