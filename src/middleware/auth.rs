use axum::{
    body::Body,
    extract::State,
    http::{Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

use crate::{AppState, cache::TokenRevocations, error::AppError, utils::verify_token};

/// 请求携带的原始令牌，与 Claims 一起放入扩展，供登出吊销
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&req)
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".into()))?;

    let claims = verify_token(&token, &state.config).map_err(|e| {
        tracing::debug!("Rejected token: {}", e);
        AppError::Unauthorized("invalid or expired token".into())
    })?;

    if TokenRevocations::is_revoked(&state.redis, &token).await? {
        return Err(AppError::Unauthorized("token has been revoked".into()));
    }

    req.extensions_mut().insert(claims);
    req.extensions_mut().insert(BearerToken(token));
    Ok(next.run(req).await)
}

// 兼容旧客户端的 "Token <jwt>" 写法
fn bearer_token<B>(req: &Request<B>) -> Option<String> {
    if let Some(auth) = req.headers().typed_get::<Authorization<Bearer>>() {
        return Some(auth.token().to_string());
    }
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Token "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
