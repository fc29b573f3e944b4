//! 会话与客户端上下文
//! 记录事件时由调用方显式传入，核心不读取任何全局会话状态

use serde::{Deserialize, Serialize};

/// 会话令牌参与哈希的前缀长度
const SESSION_HASH_PREFIX_LEN: usize = 20;

/// 操作主体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub email: String,
}

impl Actor {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
        }
    }
}

/// 已认证会话
#[derive(Debug, Clone)]
pub struct Session {
    pub actor: Actor,
    /// 原始会话令牌，只用于计算关联哈希，不会落库
    pub token: Option<String>,
}

/// 客户端环境信息，无法确定的字段省略
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_resolution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl ClientInfo {
    /// 用 `other` 补全当前缺失的字段，已有字段保持不变
    pub fn fill_from(mut self, other: ClientInfo) -> Self {
        self.user_agent = self.user_agent.or(other.user_agent);
        self.platform = self.platform.or(other.platform);
        self.language = self.language.or(other.language);
        self.screen_resolution = self.screen_resolution.or(other.screen_resolution);
        self.timezone = self.timezone.or(other.timezone);
        self
    }
}

/// 一次记录调用的上下文
#[derive(Debug, Clone, Default)]
pub struct RecordContext {
    pub session: Option<Session>,
    pub client: ClientInfo,
    /// 仅来自可信的服务端来源
    pub ip_address: Option<String>,
}

impl RecordContext {
    pub fn with_session(actor: Actor, token: Option<String>) -> Self {
        Self {
            session: Some(Session { actor, token }),
            ..Default::default()
        }
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session
            .as_ref()
            .and_then(|s| s.token.as_deref())
            .filter(|t| !t.is_empty())
    }
}

/// 会话关联哈希
///
/// 取令牌前 20 个字符做 `h = h * 31 + c` 的 32 位回绕哈希，取绝对值后以 36 进制输出。
/// 只用于把同一会话的事件关联起来，不是安全原语。
pub fn session_id_hash(token: &str) -> Option<String> {
    if token.is_empty() {
        return None;
    }

    let hash = token
        .chars()
        .take(SESSION_HASH_PREFIX_LEN)
        .fold(0i32, |h, c| {
            h.wrapping_shl(5).wrapping_sub(h).wrapping_add(c as i32)
        });

    Some(to_base36(hash.unsigned_abs()))
}

fn to_base36(mut value: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value == 0 {
        return "0".to_string();
    }

    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
