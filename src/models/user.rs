use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::utils::{hash_password, verify_password};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// 用户公开信息，嵌入队伍、帖子、评论和活动的响应中
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserInfo {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

impl UserInfo {
    pub async fn find_many(pool: &PgPool, ids: &[Uuid]) -> AppResult<HashMap<Uuid, Self>> {
        let mut unique = ids.to_vec();
        unique.sort();
        unique.dedup();

        let users = sqlx::query_as::<_, UserInfo>(
            "SELECT id, username, email, first_name, last_name FROM users WHERE id = ANY($1)",
        )
        .bind(&unique)
        .fetch_all(pool)
        .await?;
        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }
}

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
}

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, is_staff, password_hash, created_at";

impl User {
    pub async fn create(pool: &PgPool, new_user: NewUser<'_>) -> AppResult<Self> {
        // 用户名和邮箱分别检查，给出具体的冲突字段
        if Self::find_by_username(pool, new_user.username).await?.is_some() {
            return Err(AppError::Conflict(
                "a user with that username already exists".into(),
            ));
        }
        let email_taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(new_user.email)
                .fetch_one(pool)
                .await?;
        if email_taken {
            return Err(AppError::Conflict(
                "a user with that email already exists".into(),
            ));
        }

        let password_hash = hash_password(new_user.password)?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, username, email, first_name, last_name, is_staff, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5, false, $6, NOW())
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(new_user.username)
        .bind(new_user.email)
        .bind(new_user.first_name)
        .bind(new_user.last_name)
        .bind(password_hash)
        .fetch_one(pool)
        .await
        .map_err(|e| AppError::from_db(e, "user"))?;

        tracing::info!("Registered user {}", user.username);
        Ok(user)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> AppResult<Option<Self>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(user)
    }

    pub async fn find_by_username(pool: &PgPool, username: &str) -> AppResult<Option<Self>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(pool)
        .await?;
        Ok(user)
    }

    pub fn verify_login(&self, password: &str) -> AppResult<bool> {
        Ok(verify_password(password, &self.password_hash)?)
    }
}
