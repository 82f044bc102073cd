use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};

use crate::{
    AppState,
    middleware::{auth_middleware, log_errors},
    routes::{comment, event, post as posts, team, user},
};

/// 公开路由：注册与登录
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(user::register))
        .route("/auth/login", post(user::login))
}

/// 需要认证的路由
fn protected_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/logout", post(user::logout))
        .route("/me", get(user::me))
        // 球队
        .route("/teams", get(team::list_teams).post(team::create_team))
        .route(
            "/teams/{team_id}",
            get(team::get_team)
                .put(team::update_team)
                .delete(team::delete_team),
        )
        .route("/teams/{team_id}/members", get(team::list_members))
        .route("/teams/{team_id}/add-member", post(team::add_member))
        .route("/teams/{team_id}/remove-member", post(team::remove_member))
        .route("/teams/{team_id}/transfer-trainer", post(team::transfer_trainer))
        .route("/teams/{team_id}/leave", post(team::leave_team))
        // 帖子与评论
        .route(
            "/teams/{team_id}/posts",
            get(posts::list_posts).post(posts::create_post),
        )
        .route(
            "/teams/{team_id}/posts/{post_id}",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route(
            "/teams/{team_id}/posts/{post_id}/comments",
            get(comment::list_comments).post(comment::create_comment),
        )
        .route(
            "/teams/{team_id}/posts/{post_id}/comments/{comment_id}",
            axum::routing::put(comment::update_comment).delete(comment::delete_comment),
        )
        // 活动
        .route(
            "/teams/{team_id}/events",
            get(event::list_events).post(event::create_event),
        )
        .route(
            "/teams/{team_id}/events/{event_id}",
            get(event::get_event)
                .put(event::update_event)
                .patch(event::patch_event)
                .delete(event::delete_event),
        )
        .layer(from_fn_with_state(state.clone(), auth_middleware))
}

/// 挂在配置的基础路径下的完整 API；限流和 CORS 由可执行程序按部署环境添加
pub fn build(state: AppState) -> Router {
    let base = state.config.api_base_uri.clone();
    let api = Router::new()
        .merge(public_routes())
        .merge(protected_routes(&state));

    Router::new()
        .nest(&base, api)
        .layer(from_fn(log_errors))
        .with_state(state)
}
