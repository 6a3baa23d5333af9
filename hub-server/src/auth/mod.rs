//! 操作者身份
//!
//! 每个核心调用都显式接收 [`Actor`]，没有模块级默认身份。
//! 身份来源由 [`ActorProvider`] 抽象：
//!
//! - [`StaticActor`] - 固定身份（测试 / 后台任务）
//! - `api::HeaderActor` - HTTP 请求头（可信网关注入）
//!
//! 取不到身份时回落为 [`Actor::system`]。

use serde::{Deserialize, Serialize};
use shared::error::{AppError, AppResult};
use std::str::FromStr;

/// 操作者角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Admin,
    Customer,
    /// 进程内调用（无会话上下文）
    System,
}

impl ActorRole {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Admin => "admin",
            ActorRole::Customer => "customer",
            ActorRole::System => "system",
        }
    }
}

impl FromStr for ActorRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(ActorRole::Admin),
            "customer" => Ok(ActorRole::Customer),
            "system" => Ok(ActorRole::System),
            other => Err(AppError::invalid_request(format!("unknown actor role: {}", other))),
        }
    }
}

/// 执行操作的身份
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// 注册用户 ID（System / 游客为 None）
    pub id: Option<i64>,
    /// 展示名，审计日志中冗余存储
    pub name: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn system() -> Self {
        Self {
            id: None,
            name: "System".to_string(),
            role: ActorRole::System,
        }
    }

    pub fn admin(id: i64, name: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
            role: ActorRole::Admin,
        }
    }

    pub fn customer(id: i64, name: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
            role: ActorRole::Customer,
        }
    }

    /// 未登录访客（游客下单）
    pub fn guest() -> Self {
        Self {
            id: None,
            name: "Guest".to_string(),
            role: ActorRole::Customer,
        }
    }

    /// Admin 与 System 都可以执行管理操作
    pub fn is_admin(&self) -> bool {
        matches!(self.role, ActorRole::Admin | ActorRole::System)
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            tracing::warn!(actor = %self.name, "Admin action attempted by non-admin");
            Err(AppError::admin_required())
        }
    }

    /// 需要注册用户身份的操作
    pub fn require_user_id(&self) -> AppResult<i64> {
        self.id.ok_or_else(AppError::not_authenticated)
    }
}

/// 身份来源
pub trait ActorProvider {
    fn current_actor(&self) -> Option<Actor>;
}

/// 解析身份，缺失时使用 System
pub fn resolve_actor(provider: &dyn ActorProvider) -> Actor {
    provider.current_actor().unwrap_or_else(Actor::system)
}

/// 固定身份
#[derive(Debug, Clone, Default)]
pub struct StaticActor(pub Option<Actor>);

impl ActorProvider for StaticActor {
    fn current_actor(&self) -> Option<Actor> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::ErrorCode;

    #[test]
    fn test_missing_actor_resolves_to_system() {
        let actor = resolve_actor(&StaticActor(None));
        assert_eq!(actor, Actor::system());
        assert_eq!(actor.name, "System");
        assert!(actor.is_admin());
    }

    #[test]
    fn test_customer_is_not_admin() {
        let actor = resolve_actor(&StaticActor(Some(Actor::customer(7, "Ama"))));
        assert_eq!(actor.id, Some(7));
        let err = actor.require_admin().unwrap_err();
        assert_eq!(err.code, ErrorCode::AdminRequired);
    }

    #[test]
    fn test_guest_has_no_user_id() {
        let err = Actor::guest().require_user_id().unwrap_err();
        assert_eq!(err.code, ErrorCode::NotAuthenticated);
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Admin".parse::<ActorRole>().unwrap(), ActorRole::Admin);
        assert_eq!(" customer ".parse::<ActorRole>().unwrap(), ActorRole::Customer);
        assert!("root".parse::<ActorRole>().is_err());
    }
}
