use axum::{
    Extension,
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    AppState,
    cache::TeamCache,
    error::{AppError, AppResult},
    membership::{Roster, Team},
    permissions::can_view_team,
    routes::actor_of,
    utils::{Claims, success_to_api_response},
};

use super::model::{
    AddMemberRequest, CreateTeamRequest, MembershipResponse, TeamDetail, UpdateTeamRequest,
    UsernameRequest,
};

#[axum::debug_handler]
pub async fn list_teams(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let teams = Team::list_all(&state.pool).await?;
    Ok((StatusCode::OK, success_to_api_response(teams)))
}

#[axum::debug_handler]
pub async fn create_team(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateTeamRequest>,
) -> AppResult<impl IntoResponse> {
    let actor = actor_of(&claims)?;
    let roster = Team::create(&state.pool, &actor, &req.name, &req.description).await?;
    let detail = TeamDetail::load(&state.pool, &roster).await?;
    Ok((StatusCode::CREATED, success_to_api_response(detail)))
}

#[axum::debug_handler]
pub async fn get_team(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(team_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let actor = actor_of(&claims)?;

    // 权限总是基于数据库中的最新名册判断，缓存只提供渲染好的详情
    let roster = Roster::load(&state.pool, team_id).await?;
    if !can_view_team(Some(&actor), &roster) {
        return Err(not_a_member());
    }

    if let Some(detail) = TeamCache::get::<TeamDetail>(&state.redis, team_id).await {
        if detail.is_current(&roster) {
            return Ok((StatusCode::OK, success_to_api_response(detail)));
        }
        tracing::debug!("Dropping stale cached detail of team {}", team_id);
    }

    let detail = TeamDetail::load(&state.pool, &roster).await?;
    TeamCache::put(&state.redis, team_id, &detail, state.config.team_cache_ttl()).await;

    Ok((StatusCode::OK, success_to_api_response(detail)))
}

#[axum::debug_handler]
pub async fn update_team(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(team_id): Path<Uuid>,
    Json(req): Json<UpdateTeamRequest>,
) -> AppResult<impl IntoResponse> {
    let actor = actor_of(&claims)?;
    Team::update(
        &state.pool,
        &actor,
        team_id,
        req.name.as_deref(),
        req.description.as_deref(),
    )
    .await?;
    TeamCache::invalidate(&state.redis, team_id).await;

    let roster = Roster::load(&state.pool, team_id).await?;
    let detail = TeamDetail::load(&state.pool, &roster).await?;
    Ok((StatusCode::OK, success_to_api_response(detail)))
}

#[axum::debug_handler]
pub async fn delete_team(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(team_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let actor = actor_of(&claims)?;
    Team::delete(&state.pool, &actor, team_id).await?;
    TeamCache::invalidate(&state.redis, team_id).await;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn add_member(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(team_id): Path<Uuid>,
    Json(req): Json<AddMemberRequest>,
) -> AppResult<impl IntoResponse> {
    let actor = actor_of(&claims)?;
    let role = req.role()?;
    let membership =
        Team::add_member(&state.pool, &actor, team_id, req.username.as_deref(), role).await?;
    TeamCache::invalidate(&state.redis, team_id).await;

    Ok((
        StatusCode::CREATED,
        success_to_api_response(MembershipResponse::from(membership)),
    ))
}

#[axum::debug_handler]
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(team_id): Path<Uuid>,
    Json(req): Json<UsernameRequest>,
) -> AppResult<impl IntoResponse> {
    let actor = actor_of(&claims)?;
    Team::remove_member(&state.pool, &actor, team_id, req.username.trim()).await?;
    TeamCache::invalidate(&state.redis, team_id).await;

    Ok((
        StatusCode::OK,
        success_to_api_response(serde_json::json!({ "success": true })),
    ))
}

#[axum::debug_handler]
pub async fn transfer_trainer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(team_id): Path<Uuid>,
    Json(req): Json<UsernameRequest>,
) -> AppResult<impl IntoResponse> {
    let actor = actor_of(&claims)?;
    let roster = Team::transfer_trainer(&state.pool, &actor, team_id, req.username.trim()).await?;
    TeamCache::invalidate(&state.redis, team_id).await;

    let detail = TeamDetail::load(&state.pool, &roster).await?;
    Ok((StatusCode::OK, success_to_api_response(detail)))
}

#[axum::debug_handler]
pub async fn leave_team(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(team_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let actor = actor_of(&claims)?;
    Team::leave(&state.pool, &actor, team_id).await?;
    TeamCache::invalidate(&state.redis, team_id).await;

    Ok((
        StatusCode::OK,
        success_to_api_response(serde_json::json!({ "success": true })),
    ))
}

#[axum::debug_handler]
pub async fn list_members(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(team_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let actor = actor_of(&claims)?;
    let roster = Roster::load(&state.pool, team_id).await?;
    if !can_view_team(Some(&actor), &roster) {
        return Err(not_a_member());
    }
    let members = Team::member_details(&state.pool, team_id).await?;
    Ok((StatusCode::OK, success_to_api_response(members)))
}

fn not_a_member() -> AppError {
    AppError::PermissionDenied("you are not a member of this team".into())
}
