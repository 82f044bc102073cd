use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Comment, Post, UserInfo};

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

pub fn validate_post_fields(title: Option<&str>, content: Option<&str>) -> AppResult<()> {
    if let Some(title) = title {
        if title.trim().is_empty() {
            return Err(AppError::InvalidArgument("title is required".into()));
        }
        if title.chars().count() > 200 {
            return Err(AppError::InvalidArgument(
                "title must be at most 200 characters".into(),
            ));
        }
    }
    if content.is_some_and(|c| c.trim().is_empty()) {
        return Err(AppError::InvalidArgument("content is required".into()));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub post: Uuid,
    pub author: Option<UserInfo>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommentResponse {
    pub fn new(comment: Comment, authors: &HashMap<Uuid, UserInfo>) -> Self {
        Self {
            id: comment.id,
            post: comment.post_id,
            author: authors.get(&comment.author_id).cloned(),
            content: comment.content,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub team: Uuid,
    pub author: Option<UserInfo>,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub comments_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<CommentResponse>>,
}

impl PostResponse {
    pub fn new(post: Post, authors: &HashMap<Uuid, UserInfo>, comments_count: i64) -> Self {
        Self {
            id: post.id,
            team: post.team_id,
            author: authors.get(&post.author_id).cloned(),
            title: post.title,
            content: post.content,
            created_at: post.created_at,
            updated_at: post.updated_at,
            comments_count,
            comments: None,
        }
    }

    pub fn with_comments(mut self, comments: Vec<CommentResponse>) -> Self {
        self.comments_count = comments.len() as i64;
        self.comments = Some(comments);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_title_or_content_is_rejected() {
        assert!(validate_post_fields(Some("Match day"), Some("Meet at 9")).is_ok());
        assert!(validate_post_fields(None, None).is_ok());
        assert!(validate_post_fields(Some(" "), Some("x")).is_err());
        assert!(validate_post_fields(Some("x"), Some("")).is_err());
        assert!(validate_post_fields(Some(&"t".repeat(201)), None).is_err());
    }

    #[test]
    fn detail_counts_embedded_comments() {
        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            team_id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            title: "t".into(),
            content: "c".into(),
            created_at: now,
            updated_at: now,
        };
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id: post.id,
            author_id: Uuid::new_v4(),
            content: "nice".into(),
            created_at: now,
            updated_at: now,
        };
        let authors = HashMap::new();
        let response = PostResponse::new(post, &authors, 0)
            .with_comments(vec![CommentResponse::new(comment, &authors)]);
        assert_eq!(response.comments_count, 1);
        assert!(response.author.is_none());
    }
}
