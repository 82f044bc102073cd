use serde::Deserialize;

use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub content: String,
}

impl CommentRequest {
    pub fn content(&self) -> AppResult<&str> {
        let content = self.content.trim();
        if content.is_empty() {
            return Err(AppError::InvalidArgument("content is required".into()));
        }
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_is_trimmed_and_required() {
        let req = CommentRequest {
            content: "  see you there ".into(),
        };
        assert_eq!(req.content().unwrap(), "see you there");

        let req = CommentRequest {
            content: "\n ".into(),
        };
        assert!(matches!(req.content(), Err(AppError::InvalidArgument(_))));
    }
}
