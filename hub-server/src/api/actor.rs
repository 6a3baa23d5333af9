//! 请求头身份提取
//!
//! 会话机制在网关处理，这里只读取网关注入的可信请求头：
//!
//! | 请求头 | 说明 |
//! |--------|------|
//! | x-actor-id | 用户 ID |
//! | x-actor-name | 展示名 |
//! | x-actor-role | admin / customer |
//!
//! 三个头都缺失时视为访客（[`Actor::guest`]），System 身份只留给进程内调用。

use axum::{extract::FromRequestParts, http::request::Parts};
use shared::error::{AppError, ErrorCode};

use crate::auth::{Actor, ActorProvider, ActorRole};

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_NAME_HEADER: &str = "x-actor-name";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// HTTP 请求携带的身份
#[derive(Debug, Clone, Default)]
pub struct HeaderActor(pub Option<Actor>);

impl HeaderActor {
    /// 请求身份，缺失时为访客
    pub fn actor(&self) -> Actor {
        self.0.clone().unwrap_or_else(Actor::guest)
    }
}

impl ActorProvider for HeaderActor {
    fn current_actor(&self) -> Option<Actor> {
        self.0.clone()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for HeaderActor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let raw_id = header(ACTOR_ID_HEADER);
        let raw_name = header(ACTOR_NAME_HEADER);
        let raw_role = header(ACTOR_ROLE_HEADER);
        if raw_id.is_none() && raw_name.is_none() && raw_role.is_none() {
            return Ok(HeaderActor(None));
        }

        let role = match raw_role {
            Some(raw) => raw.parse::<ActorRole>()?,
            None => ActorRole::Customer,
        };
        if role == ActorRole::System {
            return Err(AppError::invalid_request("system role cannot be asserted by a request"));
        }

        let id = match raw_id {
            Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
                AppError::with_message(ErrorCode::InvalidFormat, "x-actor-id must be an integer")
                    .with_detail("header", ACTOR_ID_HEADER)
            })?),
            None => None,
        };
        let name = match (raw_name, id) {
            (Some(name), _) => name.to_string(),
            (None, Some(id)) => format!("User {}", id),
            (None, None) => "Guest".to_string(),
        };

        Ok(HeaderActor(Some(Actor { id, name, role })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(builder: axum::http::request::Builder) -> Result<HeaderActor, AppError> {
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        HeaderActor::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_no_headers_is_guest() {
        let extracted = extract(Request::builder()).await.unwrap();
        assert!(extracted.current_actor().is_none());
        assert_eq!(extracted.actor(), Actor::guest());
    }

    #[tokio::test]
    async fn test_admin_headers() {
        let extracted = extract(
            Request::builder()
                .header(ACTOR_ID_HEADER, "4")
                .header(ACTOR_NAME_HEADER, "Kofi")
                .header(ACTOR_ROLE_HEADER, "admin"),
        )
        .await
        .unwrap();
        assert_eq!(extracted.actor(), Actor::admin(4, "Kofi"));
    }

    #[tokio::test]
    async fn test_rejects_system_and_bad_id() {
        let err = extract(Request::builder().header(ACTOR_ROLE_HEADER, "system")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRequest);
        let err = extract(Request::builder().header(ACTOR_ID_HEADER, "abc")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFormat);
    }
}
