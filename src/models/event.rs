use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub team_id: Uuid,
    pub trainer_id: Uuid,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 教练填写的活动字段
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub location: Option<String>,
}

impl EventDraft {
    pub fn validate(&self) -> AppResult<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::InvalidArgument("title is required".into()));
        }
        if self.title.chars().count() > 200 {
            return Err(AppError::InvalidArgument(
                "title must be at most 200 characters".into(),
            ));
        }
        if let Some(end) = self.end_time {
            if end < self.start_time {
                return Err(AppError::InvalidArgument(
                    "end_time must not be before start_time".into(),
                ));
            }
        }
        Ok(())
    }
}

const EVENT_COLUMNS: &str = "id, team_id, trainer_id, title, description, start_time, end_time, location, created_at, updated_at";

impl Event {
    pub async fn create(
        pool: &PgPool,
        team_id: Uuid,
        trainer_id: Uuid,
        draft: &EventDraft,
    ) -> AppResult<Self> {
        draft.validate()?;
        sqlx::query_as::<_, Event>(&format!(
            r#"
            INSERT INTO events (id, team_id, trainer_id, title, description, start_time, end_time, location, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), NOW())
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(team_id)
        .bind(trainer_id)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.start_time)
        .bind(draft.end_time)
        .bind(&draft.location)
        .fetch_one(pool)
        .await
        .map_err(|e| AppError::from_db(e, "event"))
    }

    pub async fn find_in_team(pool: &PgPool, team_id: Uuid, event_id: Uuid) -> AppResult<Self> {
        sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 AND team_id = $2"
        ))
        .bind(event_id)
        .bind(team_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("event not found".into()))
    }

    pub async fn list_by_team(pool: &PgPool, team_id: Uuid) -> AppResult<Vec<Self>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE team_id = $1 ORDER BY start_time ASC"
        ))
        .bind(team_id)
        .fetch_all(pool)
        .await?;
        Ok(events)
    }

    pub async fn update(pool: &PgPool, event_id: Uuid, draft: &EventDraft) -> AppResult<Self> {
        draft.validate()?;
        sqlx::query_as::<_, Event>(&format!(
            r#"
            UPDATE events
            SET title = $2, description = $3, start_time = $4, end_time = $5,
                location = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(event_id)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.start_time)
        .bind(draft.end_time)
        .bind(&draft.location)
        .fetch_one(pool)
        .await
        .map_err(|e| AppError::from_db(e, "event"))
    }

    pub async fn delete(pool: &PgPool, event_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(event_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// 应用部分更新后的活动内容
    pub fn merged(&self, patch: EventPatch) -> EventDraft {
        EventDraft {
            title: patch.title.unwrap_or_else(|| self.title.clone()),
            description: patch.description.unwrap_or_else(|| self.description.clone()),
            start_time: patch.start_time.unwrap_or(self.start_time),
            end_time: patch.end_time.unwrap_or(self.end_time),
            location: patch.location.unwrap_or_else(|| self.location.clone()),
        }
    }
}

/// 部分更新；`Some(None)` 清空可选字段
#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<Option<DateTime<Utc>>>,
    pub location: Option<Option<String>>,
}
