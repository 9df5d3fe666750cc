use super::{ActivityId, PostId, UserId};
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CONTENT_MAX: usize = 2000;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Visible,
    Removed,
}

/// A progress update shared to the community feed.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Post {
    pub id: PostId,
    pub user_id: UserId,
    pub activity_id: ActivityId,
    pub content: String,
    pub progress: Option<u8>,
    pub status: PostStatus,
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn new(user_id: UserId, activity_id: ActivityId, content: &str, progress: Option<u8>) -> Result<Self> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::validation("Post content must not be empty"));
        }
        if content.chars().count() > CONTENT_MAX {
            return Err(AppError::validation(format!(
                "Post content must be at most {CONTENT_MAX} characters"
            )));
        }
        if progress.is_some_and(|p| p > 100) {
            return Err(AppError::validation("Progress must be between 0 and 100"));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            activity_id,
            content: content.to_string(),
            progress,
            status: PostStatus::Visible,
            created_at: Utc::now(),
        })
    }

    pub fn is_visible(&self) -> bool {
        self.status == PostStatus::Visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_content_validation() {
        let user = Uuid::new_v4();
        let activity = Uuid::new_v4();
        assert!(Post::new(user, activity, "   ", None).is_err());
        assert!(Post::new(user, activity, &"a".repeat(CONTENT_MAX + 1), None).is_err());
        assert!(Post::new(user, activity, "Halfway there", Some(101)).is_err());

        let post = Post::new(user, activity, "  Halfway there ", Some(50)).unwrap();
        assert_eq!(post.content, "Halfway there");
        assert!(post.is_visible());
    }
}
