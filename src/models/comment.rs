use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const COMMENT_COLUMNS: &str = "id, post_id, author_id, content, created_at, updated_at";

impl Comment {
    pub async fn create(
        pool: &PgPool,
        post_id: Uuid,
        author_id: Uuid,
        content: &str,
    ) -> AppResult<Self> {
        sqlx::query_as::<_, Comment>(&format!(
            r#"
            INSERT INTO comments (id, post_id, author_id, content, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(post_id)
        .bind(author_id)
        .bind(content)
        .fetch_one(pool)
        .await
        .map_err(|e| AppError::from_db(e, "comment"))
    }

    pub async fn find_in_post(pool: &PgPool, post_id: Uuid, comment_id: Uuid) -> AppResult<Self> {
        sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1 AND post_id = $2"
        ))
        .bind(comment_id)
        .bind(post_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("comment not found".into()))
    }

    pub async fn list_by_post(pool: &PgPool, post_id: Uuid) -> AppResult<Vec<Self>> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = $1 ORDER BY created_at ASC"
        ))
        .bind(post_id)
        .fetch_all(pool)
        .await?;
        Ok(comments)
    }

    pub async fn counts_for_posts(
        pool: &PgPool,
        post_ids: &[Uuid],
    ) -> AppResult<HashMap<Uuid, i64>> {
        let rows: Vec<(Uuid, i64)> = sqlx::query_as(
            "SELECT post_id, COUNT(*) FROM comments WHERE post_id = ANY($1) GROUP BY post_id",
        )
        .bind(post_ids)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    pub async fn update(pool: &PgPool, comment_id: Uuid, content: &str) -> AppResult<Self> {
        sqlx::query_as::<_, Comment>(&format!(
            r#"
            UPDATE comments
            SET content = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(comment_id)
        .bind(content)
        .fetch_one(pool)
        .await
        .map_err(|e| AppError::from_db(e, "comment"))
    }

    pub async fn delete(pool: &PgPool, comment_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
