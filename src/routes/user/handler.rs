use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    AppState,
    cache::TokenRevocations,
    error::{AppError, AppResult},
    membership::Team,
    middleware::BearerToken,
    models::{NewUser, User, UserInfo},
    routes::actor_of,
    utils::{Claims, generate_token, success_to_api_response},
};

use super::model::{AuthResponse, LoginRequest, MeResponse, RegisterRequest};

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;

    let user = User::create(
        &state.pool,
        NewUser {
            username: req.username.trim(),
            email: req.email.trim(),
            password: &req.password,
            first_name: req.first_name.trim(),
            last_name: req.last_name.trim(),
        },
    )
    .await?;

    let (token, expires_at) = generate_token(user.id, &user.username, user.is_staff, &state.config)?;
    Ok((
        StatusCode::CREATED,
        success_to_api_response(AuthResponse {
            user: user.into(),
            token,
            expires_at,
        }),
    ))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let invalid = || AppError::Unauthorized("invalid credentials, please try again".into());

    let user = User::find_by_username(&state.pool, req.username.trim())
        .await?
        .ok_or_else(invalid)?;
    if !user.verify_login(&req.password)? {
        tracing::debug!("Failed login for {}", user.username);
        return Err(invalid());
    }

    let (token, expires_at) = generate_token(user.id, &user.username, user.is_staff, &state.config)?;
    tracing::info!("User {} logged in", user.username);
    Ok((
        StatusCode::OK,
        success_to_api_response(AuthResponse {
            user: user.into(),
            token,
            expires_at,
        }),
    ))
}

#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> AppResult<impl IntoResponse> {
    TokenRevocations::revoke(&state.redis, &token, claims.exp).await?;
    tracing::info!("User {} logged out", claims.username);
    Ok((
        StatusCode::OK,
        success_to_api_response(serde_json::json!({ "success": true })),
    ))
}

#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<impl IntoResponse> {
    let actor = actor_of(&claims)?;
    let user = User::find_by_id(&state.pool, actor.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("user no longer exists".into()))?;
    let teams = Team::teams_of_user(&state.pool, user.id).await?;

    Ok((
        StatusCode::OK,
        success_to_api_response(MeResponse {
            is_staff: user.is_staff,
            user: UserInfo::from(user),
            teams,
        }),
    ))
}
