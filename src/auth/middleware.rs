//! 会话上下文提取
//!
//! 认证由上游网关完成，网关把已认证主体写入 `x-actor-id` / `x-actor-email`，
//! 并透传 `Authorization: Bearer <session token>`。这里只负责读取，不做校验。

use crate::models::{Actor, Session};
use axum::{extract::FromRequestParts, http::HeaderMap};
use std::convert::Infallible;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_EMAIL_HEADER: &str = "x-actor-email";

/// 当前请求的会话（可能为空）
#[derive(Debug, Clone, Default)]
pub struct SessionContext(pub Option<Session>);

impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        Ok(SessionContext(session_from_headers(&parts.headers)))
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// 从 Authorization 头提取令牌
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// 主体 ID 与邮箱都存在时才视为已认证
pub fn session_from_headers(headers: &HeaderMap) -> Option<Session> {
    let id = header_value(headers, ACTOR_ID_HEADER)?;
    let email = header_value(headers, ACTOR_EMAIL_HEADER)?;

    Some(Session {
        actor: Actor::new(id, email),
        token: extract_token(headers),
    })
}
