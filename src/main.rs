//! 审计服务主入口

use clinic_audit::{
    config::AppConfig,
    db,
    handlers::health,
    middleware::AppState,
    repository::{AuditRepository, AuditStore, MemoryAuditStore, RoleLookup, RoleRepository, StaticRoleLookup},
    routes,
    services::{AuditService, FallbackLog},
    telemetry,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ===== CLI 参数处理 =====
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "--version" => {
                println!("clinic-audit {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("未知参数: {}", args[1]);
                print_help();
                std::process::exit(1);
            }
        }
    }

    // 加载 .env 文件（开发环境）
    // 按优先级加载：.env.local > .env.development > .env
    if let Ok(env) = std::env::var("CLINIC_ENV") {
        dotenv::from_filename(format!(".env.{}", env)).ok();
    } else {
        dotenv::from_filename(".env.local").ok();
        dotenv::from_filename(".env.development").ok();
        dotenv::dotenv().ok();
    }

    health::set_start_time();

    // 1. 加载配置
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        anyhow::anyhow!("Failed to load configuration: {}", e)
    })?;

    // 2. 初始化日志与指标
    telemetry::init_telemetry(&config);
    telemetry::init_metrics();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Clinic audit service starting...");

    // 3. 审计存储
    let (store, roles): (Arc<dyn AuditStore>, Arc<dyn RoleLookup>) = if config.uses_memory_store() {
        tracing::warn!("Using in-memory audit store, events are lost on restart");
        (
            Arc::new(MemoryAuditStore::new()),
            Arc::new(StaticRoleLookup::new()),
        )
    } else {
        let db_pool = db::create_pool(&config.database).await?;
        db::run_migrations(&db_pool).await?;
        tracing::info!("Database initialized");

        (
            Arc::new(AuditRepository::new(db_pool.clone())),
            Arc::new(RoleRepository::new(db_pool)),
        )
    };

    // 4. 降级记录
    let fallback = match &config.audit.fallback_path {
        Some(path) => FallbackLog::with_file(config.audit.fallback_capacity, path).await,
        None => FallbackLog::new(config.audit.fallback_capacity),
    };

    // 5. 构建应用状态
    let audit_service = AuditService::new(store, roles, Arc::new(fallback))
        .with_export_limit(config.audit.export_max_rows);

    let app_state = Arc::new(AppState {
        config: config.clone(),
        audit_service: Arc::new(audit_service),
    });

    let app = routes::create_router(app_state);

    // 6. 启动服务器
    let addr = &config.server.addr;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(addr = %addr, "Server listening");

    // 7. 优雅关闭
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(config.server.graceful_shutdown_timeout_secs))
    .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// 优雅关闭信号处理
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Terminate signal received, starting graceful shutdown");
        },
    }

    // 超时后强制退出
    tokio::spawn(async move {
        tokio::time::sleep(tokio::time::Duration::from_secs(timeout_secs)).await;
        tracing::warn!("Graceful shutdown timeout reached, forcing exit");
        std::process::exit(1);
    });
}

/// 打印帮助信息
fn print_help() {
    println!("clinic-audit {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("用法: clinic-audit [选项]");
    println!();
    println!("选项:");
    println!("  --version     打印版本信息并退出");
    println!("  --help        打印此帮助信息并退出");
    println!();
    println!("环境变量:");
    println!("  所有配置通过 CLINIC_ 前缀的环境变量完成，嵌套字段用 __ 分隔");
    println!("  例如 CLINIC_DATABASE__URL, CLINIC_AUDIT__STORE_BACKEND=memory");
}
