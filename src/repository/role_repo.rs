//! Role repository (角色数据访问)
//! 记录事件时用于解析操作人的角色

use crate::{error::LookupError, models::Role};
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;

/// 角色查询接口
#[async_trait]
pub trait RoleLookup: Send + Sync {
    async fn role_of(&self, actor_id: &str) -> Result<Role, LookupError>;
}

/// 从 `profiles` 表读取角色（表由主应用维护）
pub struct RoleRepository {
    db: PgPool,
}

impl RoleRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RoleLookup for RoleRepository {
    async fn role_of(&self, actor_id: &str) -> Result<Role, LookupError> {
        let role: Option<String> =
            sqlx::query_scalar("SELECT role FROM profiles WHERE id::text = $1")
                .bind(actor_id)
                .fetch_optional(&self.db)
                .await?;

        role.map(Role::new)
            .ok_or_else(|| LookupError::NotFound(actor_id.to_string()))
    }
}

/// 固定映射，内存存储模式和测试使用
#[derive(Debug, Default, Clone)]
pub struct StaticRoleLookup {
    roles: HashMap<String, String>,
}

impl StaticRoleLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_role(mut self, actor_id: impl Into<String>, role: impl Into<String>) -> Self {
        self.roles.insert(actor_id.into(), role.into());
        self
    }
}

#[async_trait]
impl RoleLookup for StaticRoleLookup {
    async fn role_of(&self, actor_id: &str) -> Result<Role, LookupError> {
        self.roles
            .get(actor_id)
            .map(|r| Role::new(r.as_str()))
            .ok_or_else(|| LookupError::NotFound(actor_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_lookup() {
        let lookup = StaticRoleLookup::new().with_role("u1", "psychometrician");

        assert_eq!(lookup.role_of("u1").await.unwrap().as_str(), "psychometrician");
        assert!(matches!(
            lookup.role_of("u2").await,
            Err(LookupError::NotFound(id)) if id == "u2"
        ));
    }
}
