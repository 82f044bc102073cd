use axum::{
    Extension,
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    AppState,
    error::{AppError, AppResult},
    membership::Roster,
    models::{Comment, Post, UserInfo},
    permissions::{Action, Actor, can_access_post, can_create_post, can_view_team},
    routes::actor_of,
    utils::{Claims, success_to_api_response},
};

use super::model::{
    CommentResponse, CreatePostRequest, PostResponse, UpdatePostRequest, validate_post_fields,
};

#[axum::debug_handler]
pub async fn list_posts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(team_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let actor = actor_of(&claims)?;
    let roster = Roster::load(&state.pool, team_id).await?;
    if !can_view_team(Some(&actor), &roster) {
        return Err(AppError::PermissionDenied(
            "only team members can read posts".into(),
        ));
    }

    let posts = Post::list_by_team(&state.pool, team_id).await?;
    let post_ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
    let author_ids: Vec<Uuid> = posts.iter().map(|p| p.author_id).collect();
    let counts = Comment::counts_for_posts(&state.pool, &post_ids).await?;
    let authors = UserInfo::find_many(&state.pool, &author_ids).await?;

    let body: Vec<PostResponse> = posts
        .into_iter()
        .map(|p| {
            let count = counts.get(&p.id).copied().unwrap_or(0);
            PostResponse::new(p, &authors, count)
        })
        .collect();
    Ok((StatusCode::OK, success_to_api_response(body)))
}

#[axum::debug_handler]
pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(team_id): Path<Uuid>,
    Json(req): Json<CreatePostRequest>,
) -> AppResult<impl IntoResponse> {
    let actor = actor_of(&claims)?;
    let roster = Roster::load(&state.pool, team_id).await?;
    if !can_create_post(Some(&actor), &roster.team) {
        return Err(AppError::PermissionDenied(
            "only the trainer of this team can publish posts".into(),
        ));
    }
    validate_post_fields(Some(req.title.as_str()), Some(req.content.as_str()))?;

    let post = Post::create(
        &state.pool,
        team_id,
        actor.user_id,
        req.title.trim(),
        &req.content,
    )
    .await?;
    tracing::info!("User {} published post {} in team {}", actor.username, post.id, team_id);

    let authors = UserInfo::find_many(&state.pool, &[post.author_id]).await?;
    Ok((
        StatusCode::CREATED,
        success_to_api_response(PostResponse::new(post, &authors, 0).with_comments(Vec::new())),
    ))
}

#[axum::debug_handler]
pub async fn get_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((team_id, post_id)): Path<(Uuid, Uuid)>,
) -> AppResult<impl IntoResponse> {
    let actor = actor_of(&claims)?;
    let (roster, post) = visible_post(&state, &actor, team_id, post_id).await?;
    if !can_access_post(Some(&actor), &roster, &post, Action::Read) {
        return Err(AppError::PermissionDenied(
            "only team members can read posts".into(),
        ));
    }

    Ok((StatusCode::OK, success_to_api_response(render_detail(&state, post).await?)))
}

#[axum::debug_handler]
pub async fn update_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((team_id, post_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdatePostRequest>,
) -> AppResult<impl IntoResponse> {
    let actor = actor_of(&claims)?;
    let (roster, post) = visible_post(&state, &actor, team_id, post_id).await?;
    if !can_access_post(Some(&actor), &roster, &post, Action::Update) {
        return Err(AppError::PermissionDenied(
            "only the author can update this post".into(),
        ));
    }
    validate_post_fields(req.title.as_deref(), req.content.as_deref())?;

    let post = Post::update(
        &state.pool,
        post.id,
        req.title.as_deref().map(str::trim),
        req.content.as_deref(),
    )
    .await?;
    Ok((StatusCode::OK, success_to_api_response(render_detail(&state, post).await?)))
}

#[axum::debug_handler]
pub async fn delete_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((team_id, post_id)): Path<(Uuid, Uuid)>,
) -> AppResult<impl IntoResponse> {
    let actor = actor_of(&claims)?;
    let (roster, post) = visible_post(&state, &actor, team_id, post_id).await?;
    if !can_access_post(Some(&actor), &roster, &post, Action::Delete) {
        return Err(AppError::PermissionDenied(
            "only the author can delete this post".into(),
        ));
    }

    Post::delete(&state.pool, post.id).await?;
    tracing::info!("User {} deleted post {}", actor.username, post.id);
    Ok(StatusCode::NO_CONTENT)
}

// 先确认成员身份再查帖子，非成员无法区分帖子是否存在
async fn visible_post(
    state: &AppState,
    actor: &Actor,
    team_id: Uuid,
    post_id: Uuid,
) -> AppResult<(Roster, Post)> {
    let roster = Roster::load(&state.pool, team_id).await?;
    if !can_view_team(Some(actor), &roster) {
        return Err(AppError::PermissionDenied(
            "only team members can read posts".into(),
        ));
    }
    let post = Post::find_in_team(&state.pool, team_id, post_id).await?;
    Ok((roster, post))
}

async fn render_detail(state: &AppState, post: Post) -> AppResult<PostResponse> {
    let comments = Comment::list_by_post(&state.pool, post.id).await?;
    let mut ids: Vec<Uuid> = comments.iter().map(|c| c.author_id).collect();
    ids.push(post.author_id);
    let authors = UserInfo::find_many(&state.pool, &ids).await?;

    let comments = comments
        .into_iter()
        .map(|c| CommentResponse::new(c, &authors))
        .collect();
    Ok(PostResponse::new(post, &authors, 0).with_comments(comments))
}
