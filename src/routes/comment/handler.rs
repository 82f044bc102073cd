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
    permissions::{
        Action, Actor, can_access_comment, can_access_post, can_create_comment, can_view_team,
    },
    routes::{actor_of, post::CommentResponse},
    utils::{Claims, success_to_api_response},
};

use super::model::CommentRequest;

#[axum::debug_handler]
pub async fn list_comments(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((team_id, post_id)): Path<(Uuid, Uuid)>,
) -> AppResult<impl IntoResponse> {
    let actor = actor_of(&claims)?;
    let (roster, post) = load_post(&state, &actor, team_id, post_id).await?;
    if !can_access_post(Some(&actor), &roster, &post, Action::Read) {
        return Err(AppError::PermissionDenied(
            "only team members can read comments".into(),
        ));
    }

    let comments = Comment::list_by_post(&state.pool, post.id).await?;
    let ids: Vec<Uuid> = comments.iter().map(|c| c.author_id).collect();
    let authors = UserInfo::find_many(&state.pool, &ids).await?;
    let body: Vec<CommentResponse> = comments
        .into_iter()
        .map(|c| CommentResponse::new(c, &authors))
        .collect();
    Ok((StatusCode::OK, success_to_api_response(body)))
}

#[axum::debug_handler]
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((team_id, post_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<CommentRequest>,
) -> AppResult<impl IntoResponse> {
    let actor = actor_of(&claims)?;
    let (roster, post) = load_post(&state, &actor, team_id, post_id).await?;
    if !can_create_comment(Some(&actor), &roster, &post) {
        return Err(AppError::PermissionDenied(
            "only team members can comment".into(),
        ));
    }

    let comment = Comment::create(&state.pool, post.id, actor.user_id, req.content()?).await?;
    tracing::debug!("User {} commented on post {}", actor.username, post.id);
    render(&state, comment, StatusCode::CREATED).await
}

#[axum::debug_handler]
pub async fn update_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((team_id, post_id, comment_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(req): Json<CommentRequest>,
) -> AppResult<impl IntoResponse> {
    let actor = actor_of(&claims)?;
    let (roster, comment) = load_comment(&state, &actor, team_id, post_id, comment_id).await?;
    self::check(&actor, &roster, &comment, Action::Update)?;

    let comment = Comment::update(&state.pool, comment.id, req.content()?).await?;
    render(&state, comment, StatusCode::OK).await
}

#[axum::debug_handler]
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((team_id, post_id, comment_id)): Path<(Uuid, Uuid, Uuid)>,
) -> AppResult<impl IntoResponse> {
    let actor = actor_of(&claims)?;
    let (roster, comment) = load_comment(&state, &actor, team_id, post_id, comment_id).await?;
    self::check(&actor, &roster, &comment, Action::Delete)?;

    Comment::delete(&state.pool, comment.id).await?;
    tracing::info!("User {} deleted comment {}", actor.username, comment.id);
    Ok(StatusCode::NO_CONTENT)
}

// 非成员在查找帖子和评论之前就被拒绝
async fn load_post(
    state: &AppState,
    actor: &Actor,
    team_id: Uuid,
    post_id: Uuid,
) -> AppResult<(Roster, Post)> {
    let roster = Roster::load(&state.pool, team_id).await?;
    if !can_view_team(Some(actor), &roster) {
        return Err(AppError::PermissionDenied(
            "only team members can access comments".into(),
        ));
    }
    let post = Post::find_in_team(&state.pool, team_id, post_id).await?;
    Ok((roster, post))
}

async fn load_comment(
    state: &AppState,
    actor: &Actor,
    team_id: Uuid,
    post_id: Uuid,
    comment_id: Uuid,
) -> AppResult<(Roster, Comment)> {
    let (roster, post) = load_post(state, actor, team_id, post_id).await?;
    let comment = Comment::find_in_post(&state.pool, post.id, comment_id).await?;
    Ok((roster, comment))
}

fn check(actor: &Actor, roster: &Roster, comment: &Comment, action: Action) -> AppResult<()> {
    if can_access_comment(Some(actor), roster, comment, action) {
        return Ok(());
    }
    let msg = match action {
        Action::Delete => "only the author or the team trainer can delete this comment",
        _ => "only the author can edit this comment",
    };
    Err(AppError::PermissionDenied(msg.into()))
}

async fn render(
    state: &AppState,
    comment: Comment,
    status: StatusCode,
) -> AppResult<impl IntoResponse + use<>> {
    let authors = UserInfo::find_many(&state.pool, &[comment.author_id]).await?;
    Ok((status, success_to_api_response(CommentResponse::new(comment, &authors))))
}
