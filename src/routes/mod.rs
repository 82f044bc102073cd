pub mod comment;
pub mod event;
pub mod post;
pub mod team;
pub mod user;

use crate::error::{AppError, AppResult};
use crate::permissions::Actor;
use crate::utils::Claims;

/// 从已验证的 Claims 解析受保护路由的操作者
pub(crate) fn actor_of(claims: &Claims) -> AppResult<Actor> {
    claims
        .actor()
        .ok_or_else(|| AppError::Unauthorized("token subject is not a user id".into()))
}
