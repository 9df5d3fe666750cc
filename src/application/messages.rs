use super::session::Actor;
use crate::domain::UserId;
use crate::domain::message::Message;
use crate::domain::ports::MessageStoreRef;
use crate::error::{AppError, Result};
use uuid::Uuid;

/// Direct messages, mostly system notifications raised by other services.
#[derive(Clone)]
pub struct MessageService {
    messages: MessageStoreRef,
}

impl MessageService {
    pub fn new(messages: MessageStoreRef) -> Self {
        Self { messages }
    }

    pub async fn send_system(&self, recipient: UserId, subject: &str, body: &str) -> Result<Message> {
        let message = Message::system(recipient, subject, body);
        self.messages.store(message.clone()).await?;
        Ok(message)
    }

    /// Newest first.
    pub async fn inbox(&self, actor: &Actor) -> Result<Vec<Message>> {
        let user_id = actor.require_user()?;
        let mut inbox = self.messages.inbox(user_id).await?;
        inbox.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(inbox)
    }

    pub async fn mark_read(&self, actor: &Actor, id: Uuid) -> Result<Message> {
        let user_id = actor.require_user()?;
        let mut message = self
            .messages
            .get(id)
            .await?
            .filter(|m| m.recipient_id == user_id)
            .ok_or_else(|| AppError::not_found("message", id))?;
        if !message.read {
            message.read = true;
            self.messages.store(message.clone()).await?;
        }
        Ok(message)
    }
}
