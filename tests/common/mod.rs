//! 测试公共模块
//! 提供测试辅助函数和测试工具

#![allow(dead_code)]

use clinic_audit::{
    config::{
        AppConfig, AuditConfig, DatabaseConfig, LoggingConfig, SecurityConfig, ServerConfig,
    },
    middleware::AppState,
    models::{Actor, AuditEvent, RecordContext},
    repository::{MemoryAuditStore, StaticRoleLookup},
    services::{AuditService, FallbackLog},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

pub const PSYCHOMETRICIAN_ID: &str = "7f1c2a10-0000-4000-8000-000000000001";
pub const PSYCHOMETRICIAN_EMAIL: &str = "maria.santos@clinic.ph";
pub const ADMIN_ID: &str = "7f1c2a10-0000-4000-8000-000000000002";
pub const ADMIN_EMAIL: &str = "admin@clinic.ph";

/// 创建测试配置（内存存储）
pub fn create_test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            addr: "127.0.0.1:0".to_string(),
            graceful_shutdown_timeout_secs: 5,
        },
        database: DatabaseConfig {
            url: None,
            max_connections: 5,
            min_connections: 1,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 300,
            max_lifetime_secs: 1800,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig { trust_proxy: false },
        audit: AuditConfig {
            store_backend: "memory".to_string(),
            fallback_capacity: 10,
            fallback_path: None,
            export_max_rows: 10_000,
            stats_window_days: 30,
            default_page_size: 50,
        },
    }
}

pub fn test_roles() -> StaticRoleLookup {
    StaticRoleLookup::new()
        .with_role(PSYCHOMETRICIAN_ID, "psychometrician")
        .with_role(ADMIN_ID, "admin")
}

/// 服务与底层存储，便于直接构造历史数据或模拟故障
pub struct TestHarness {
    pub store: Arc<MemoryAuditStore>,
    pub service: Arc<AuditService>,
}

pub fn create_harness() -> TestHarness {
    let store = Arc::new(MemoryAuditStore::new());
    let service = AuditService::new(
        store.clone(),
        Arc::new(test_roles()),
        Arc::new(FallbackLog::new(10)),
    );

    TestHarness {
        store,
        service: Arc::new(service),
    }
}

/// 创建测试应用状态
pub fn create_test_app_state(harness: &TestHarness) -> Arc<AppState> {
    Arc::new(AppState {
        config: create_test_config(),
        audit_service: harness.service.clone(),
    })
}

pub fn psychometrician_ctx() -> RecordContext {
    RecordContext::with_session(
        Actor::new(PSYCHOMETRICIAN_ID, PSYCHOMETRICIAN_EMAIL),
        Some("eyJhbGciOiJIUzI1NiJ9.psychometrician".to_string()),
    )
}

pub fn admin_ctx() -> RecordContext {
    RecordContext::with_session(Actor::new(ADMIN_ID, ADMIN_EMAIL), None)
}

/// 构造一条已入库的历史事件
pub fn stored_event(
    actor: (&str, &str, &str),
    action_kind: &str,
    status: &str,
    created_at: DateTime<Utc>,
) -> AuditEvent {
    let (actor_id, actor_email, actor_role) = actor;
    AuditEvent {
        id: Uuid::new_v4(),
        actor_id: actor_id.to_string(),
        actor_email: actor_email.to_string(),
        actor_role: actor_role.to_string(),
        action_kind: action_kind.to_string(),
        resource_kind: None,
        resource_id: None,
        description: format!("{} by {}", action_kind, actor_email),
        details: serde_json::json!({}),
        ip_address: None,
        user_agent: None,
        session_id_hash: None,
        status: status.to_string(),
        severity: "low".to_string(),
        created_at,
    }
}
