use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub team_id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const POST_COLUMNS: &str = "id, team_id, author_id, title, content, created_at, updated_at";

impl Post {
    pub async fn create(
        pool: &PgPool,
        team_id: Uuid,
        author_id: Uuid,
        title: &str,
        content: &str,
    ) -> AppResult<Self> {
        let post = sqlx::query_as::<_, Post>(&format!(
            r#"
            INSERT INTO posts (id, team_id, author_id, title, content, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(team_id)
        .bind(author_id)
        .bind(title)
        .bind(content)
        .fetch_one(pool)
        .await
        .map_err(|e| AppError::from_db(e, "post"))?;

        Ok(post)
    }

    /// 在队伍内查找帖子，其他队伍的帖子视为不存在
    pub async fn find_in_team(pool: &PgPool, team_id: Uuid, post_id: Uuid) -> AppResult<Self> {
        sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1 AND team_id = $2"
        ))
        .bind(post_id)
        .bind(team_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("post not found".into()))
    }

    pub async fn list_by_team(pool: &PgPool, team_id: Uuid) -> AppResult<Vec<Self>> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE team_id = $1 ORDER BY created_at DESC"
        ))
        .bind(team_id)
        .fetch_all(pool)
        .await?;
        Ok(posts)
    }

    pub async fn update(
        pool: &PgPool,
        post_id: Uuid,
        title: Option<&str>,
        content: Option<&str>,
    ) -> AppResult<Self> {
        let post = sqlx::query_as::<_, Post>(&format!(
            r#"
            UPDATE posts
            SET title = COALESCE($2, title),
                content = COALESCE($3, content),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(post_id)
        .bind(title)
        .bind(content)
        .fetch_one(pool)
        .await
        .map_err(|e| AppError::from_db(e, "post"))?;
        Ok(post)
    }

    pub async fn delete(pool: &PgPool, post_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
