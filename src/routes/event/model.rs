use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::models::{Event, EventDraft, EventPatch, UserInfo};

/// 整体替换活动（PUT 与 POST）
#[derive(Debug, Deserialize)]
pub struct EventRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub location: Option<String>,
}

impl From<EventRequest> for EventDraft {
    fn from(req: EventRequest) -> Self {
        EventDraft {
            title: req.title.trim().to_string(),
            description: req.description,
            start_time: req.start_time,
            end_time: req.end_time,
            location: req.location.filter(|l| !l.trim().is_empty()),
        }
    }
}

/// PATCH 请求体；缺省的字段保持原值，`null` 清空
#[derive(Debug, Default, Deserialize)]
pub struct EventPatchRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "nullable")]
    pub end_time: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub location: Option<Option<String>>,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl From<EventPatchRequest> for EventPatch {
    fn from(req: EventPatchRequest) -> Self {
        EventPatch {
            title: req.title.map(|t| t.trim().to_string()),
            description: req.description,
            start_time: req.start_time,
            end_time: req.end_time,
            location: req.location,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub id: Uuid,
    pub team: Uuid,
    pub trainer: Option<UserInfo>,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventResponse {
    pub fn new(event: Event, users: &HashMap<Uuid, UserInfo>) -> Self {
        Self {
            id: event.id,
            team: event.team_id,
            trainer: users.get(&event.trainer_id).cloned(),
            title: event.title,
            description: event.description,
            start_time: event.start_time,
            end_time: event.end_time,
            location: event.location,
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_distinguishes_missing_from_null() {
        let req: EventPatchRequest =
            serde_json::from_str(r#"{"location": null, "title": " Final "}"#).unwrap();
        let patch = EventPatch::from(req);
        assert_eq!(patch.location, Some(None));
        assert_eq!(patch.end_time, None);
        assert_eq!(patch.title.as_deref(), Some("Final"));
    }

    #[test]
    fn blank_location_is_stored_as_none() {
        let req: EventRequest = serde_json::from_str(
            r#"{"title":"Training","start_time":"2026-05-01T18:00:00Z","location":"  "}"#,
        )
        .unwrap();
        let draft = EventDraft::from(req);
        assert_eq!(draft.location, None);
        assert_eq!(draft.description, "");
        assert!(draft.validate().is_ok());
    }
}
