//! 配置系统
//! 从环境变量加载所有配置，使用 Secret 包装敏感信息

use config::{Config, ConfigError, Environment};
use secrecy::Secret;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址，例如 "0.0.0.0:3000"
    pub addr: String,
    /// 优雅关闭超时时间（秒）
    pub graceful_shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库连接 URL（使用 Secret 包装，防止日志泄露）；内存存储时可不填
    pub url: Option<Secret<String>>,
    /// 最大连接数
    pub max_connections: u32,
    /// 最小连接数
    pub min_connections: u32,
    /// 获取连接超时时间（秒）
    pub acquire_timeout_secs: u64,
    /// 空闲连接超时时间（秒）
    pub idle_timeout_secs: u64,
    /// 连接最大生命周期（秒）
    pub max_lifetime_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别: trace, debug, info, warn, error
    pub level: String,
    /// 日志格式: json, pretty
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// 是否信任 X-Forwarded-For / X-Real-IP 头，默认不信任
    pub trust_proxy: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// 存储后端: postgres, memory
    pub store_backend: String,
    /// 降级记录保留条数
    pub fallback_capacity: usize,
    /// 降级记录持久化文件（可选）
    pub fallback_path: Option<String>,
    /// 导出最大行数
    pub export_max_rows: i64,
    /// 统计默认时间窗口（天）
    pub stats_window_days: i64,
    /// 列表默认每页条数
    pub default_page_size: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    pub audit: AuditConfig,
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Config::builder();

        // 添加默认配置
        settings = settings
            .set_default("server.addr", "0.0.0.0:3000")?
            .set_default("server.graceful_shutdown_timeout_secs", 30)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("database.idle_timeout_secs", 600)?
            .set_default("database.max_lifetime_secs", 1800)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?
            .set_default("security.trust_proxy", false)?
            .set_default("audit.store_backend", "postgres")?
            .set_default("audit.fallback_capacity", 10)?
            .set_default("audit.export_max_rows", 10_000)?
            .set_default("audit.stats_window_days", 30)?
            .set_default("audit.default_page_size", 50)?;

        // 从环境变量加载配置（前缀为 CLINIC_）
        settings = settings.add_source(
            Environment::with_prefix("CLINIC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = settings.build()?.try_deserialize()?;

        // 验证配置
        config.validate()?;

        Ok(config)
    }

    /// 是否使用内存存储
    pub fn uses_memory_store(&self) -> bool {
        self.audit.store_backend.eq_ignore_ascii_case("memory")
    }

    /// 验证配置合法性
    fn validate(&self) -> Result<(), ConfigError> {
        // 验证端口范围
        if let Some(port_str) = self.server.addr.split(':').next_back() {
            if let Ok(port) = port_str.parse::<u16>() {
                if port != 0 && port < 1024 {
                    return Err(ConfigError::Message("Server port should be >= 1024".to_string()));
                }
            }
        }

        // 验证日志级别
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                )))
            }
        }

        // 验证日志格式
        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log format: {}. Must be one of: json, pretty",
                    self.logging.format
                )))
            }
        }

        // 验证存储后端
        match self.audit.store_backend.to_lowercase().as_str() {
            "postgres" => {
                if self.database.url.is_none() {
                    return Err(ConfigError::Message(
                        "database.url is required for the postgres store backend".to_string(),
                    ));
                }
            }
            "memory" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid store backend: {}. Must be one of: postgres, memory",
                    self.audit.store_backend
                )))
            }
        }

        // 验证数据库连接池配置
        if self.database.max_connections < self.database.min_connections {
            return Err(ConfigError::Message(
                "max_connections must be >= min_connections".to_string(),
            ));
        }

        if self.audit.fallback_capacity == 0 {
            return Err(ConfigError::Message(
                "fallback_capacity must be at least 1".to_string(),
            ));
        }

        if self.audit.export_max_rows < 1 {
            return Err(ConfigError::Message(
                "export_max_rows must be at least 1".to_string(),
            ));
        }

        if self.audit.stats_window_days < 1 || self.audit.stats_window_days > 365 {
            return Err(ConfigError::Message(
                "stats_window_days must be between 1 and 365".to_string(),
            ));
        }

        if self.audit.default_page_size < 1 || self.audit.default_page_size > 1000 {
            return Err(ConfigError::Message(
                "default_page_size must be between 1 and 1000".to_string(),
            ));
        }

        Ok(())
    }
}
