//! HTTP 中间件
//! 请求追踪、客户端上下文提取

use crate::models::ClientInfo;
use axum::{
    extract::{ConnectInfo, FromRequestParts, Request},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// 应用状态
#[derive(Clone)]
pub struct AppState {
    pub config: crate::config::AppConfig,
    pub audit_service: Arc<crate::services::AuditService>,
}

/// 请求追踪中间件
/// 为每个请求生成 trace_id 和 request_id，并记录指标
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().to_string();
    let uri = req.uri().path().to_string();

    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    async move {
        let start = Instant::now();

        let mut response = next.run(req).await;

        let elapsed = start.elapsed();

        // 记录指标 - 使用静态字符串
        let status = response.status().as_u16();
        let method_name = match method.as_str() {
            "GET" => "GET",
            "POST" => "POST",
            _ => "OTHER",
        };
        let status_code = match status {
            200 => "200",
            201 => "201",
            202 => "202",
            400 => "400",
            404 => "404",
            500 => "500",
            503 => "503",
            _ => "other",
        };

        metrics::counter!("http_requests_total", "method" => method_name, "status" => status_code)
            .increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        tracing::info!(
            method = %method,
            uri = %uri,
            status = status,
            elapsed_ms = elapsed.as_millis(),
            "Request completed"
        );

        // 在响应头中添加 trace_id
        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            response.headers_mut().insert("x-trace-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }

        response
    }
    .instrument(span)
    .await
}

/// 从请求头中提取或生成 trace_id
fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// 客户端上下文：环境信息 + 可信 IP
#[derive(Debug, Clone, Default)]
pub struct ClientContext {
    pub client: ClientInfo,
    pub ip_address: Option<String>,
}

impl FromRequestParts<Arc<AppState>> for ClientContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Ok(ClientContext {
            client: client_info_from_headers(&parts.headers),
            ip_address: client_ip(&parts.headers, state.config.security.trust_proxy, peer),
        })
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// 从请求头读取客户端环境信息
pub fn client_info_from_headers(headers: &HeaderMap) -> ClientInfo {
    ClientInfo {
        user_agent: header_str(headers, "user-agent").map(|s| s.to_string()),
        platform: header_str(headers, "sec-ch-ua-platform")
            .map(|s| s.trim_matches('"').to_string())
            .filter(|s| !s.is_empty()),
        language: header_str(headers, "accept-language")
            .and_then(|s| s.split(&[',', ';'][..]).next())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        screen_resolution: header_str(headers, "x-client-screen").map(|s| s.to_string()),
        timezone: header_str(headers, "x-client-timezone").map(|s| s.to_string()),
    }
}

/// 获取客户端 IP 地址
///
/// 只有信任代理时才读取转发头；否则使用连接对端地址。
pub fn client_ip(headers: &HeaderMap, trust_proxy: bool, peer: Option<SocketAddr>) -> Option<String> {
    if trust_proxy {
        // X-Forwarded-For 可能包含多个 IP，取第一个
        if let Some(first_ip) = header_str(headers, "x-forwarded-for")
            .and_then(|s| s.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            return Some(first_ip.to_string());
        }

        if let Some(real_ip) = header_str(headers, "x-real-ip") {
            return Some(real_ip.to_string());
        }
    }

    peer.map(|addr| addr.ip().to_string())
}
