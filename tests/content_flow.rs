//! 帖子与评论接口的访问控制，需要真实的 Postgres：
//! `DATABASE_URL=... cargo test -- --ignored`

mod common;

use axum::{
    Extension,
    extract::{Path, State},
};
use sqlx::PgPool;
use uuid::Uuid;

use common::{claims_of, seed_user, state_with};
use team_hub::{
    error::AppError,
    membership::Team,
    models::Post,
    routes::{comment, post},
};

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres database"]
async fn outsider_is_denied_whether_or_not_the_post_exists(pool: PgPool) {
    let ana = seed_user(&pool, "ana").await;
    let eve = seed_user(&pool, "eve").await;
    let team_id = Team::create(&pool, &ana, "Falcons", "").await.unwrap().team.id;
    let existing = Post::create(&pool, team_id, ana.user_id, "Kickoff", "9am")
        .await
        .unwrap();

    for post_id in [existing.id, Uuid::new_v4()] {
        let res = post::get_post(
            State(state_with(pool.clone())),
            Extension(claims_of(&eve)),
            Path((team_id, post_id)),
        )
        .await;
        assert!(matches!(res, Err(AppError::PermissionDenied(_))));

        let res = post::delete_post(
            State(state_with(pool.clone())),
            Extension(claims_of(&eve)),
            Path((team_id, post_id)),
        )
        .await;
        assert!(matches!(res, Err(AppError::PermissionDenied(_))));

        let res = comment::list_comments(
            State(state_with(pool.clone())),
            Extension(claims_of(&eve)),
            Path((team_id, post_id)),
        )
        .await;
        assert!(matches!(res, Err(AppError::PermissionDenied(_))));
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres database"]
async fn member_sees_missing_post_as_not_found(pool: PgPool) {
    let ana = seed_user(&pool, "ana").await;
    let ben = seed_user(&pool, "ben").await;
    let team_id = Team::create(&pool, &ana, "Falcons", "").await.unwrap().team.id;
    Team::add_member(&pool, &ana, team_id, Some("ben"), None).await.unwrap();

    let res = post::get_post(
        State(state_with(pool.clone())),
        Extension(claims_of(&ben)),
        Path((team_id, Uuid::new_v4())),
    )
    .await;
    assert!(matches!(res, Err(AppError::NotFound(_))));
}
