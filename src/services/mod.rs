//! Business logic services layer

pub mod alert;
pub mod audit_service;
pub mod export;
pub mod fallback;
pub mod statistics;

pub use alert::{AlertSink, TracingAlertSink};
pub use audit_service::AuditService;
pub use fallback::FallbackLog;
