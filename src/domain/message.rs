use super::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A direct message. System notifications have no sender.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Option<UserId>,
    pub recipient_id: UserId,
    pub subject: String,
    pub body: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn system(recipient_id: UserId, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender_id: None,
            recipient_id,
            subject: subject.into(),
            body: body.into(),
            read: false,
            created_at: Utc::now(),
        }
    }
}
