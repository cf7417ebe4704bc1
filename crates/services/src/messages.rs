//! # Messaging
//!
//! Direct messages between buyers and sellers. A conversation is not stored;
//! it is the set of messages a user exchanged with one other participant.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, instrument};

use domains::{
    Conversation, DomainError, Message, MessageRepository, MessageView, NewMessage, PropertyId,
    Result, UserId, UserRepository,
};

/// Body of the `POST .../messages` endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct OutgoingMessage {
    pub receiver_id: UserId,
    pub property_id: Option<PropertyId>,
    pub message: String,
}

pub struct MessageService {
    messages: Arc<dyn MessageRepository>,
    users: Arc<dyn UserRepository>,
}

impl MessageService {
    pub fn new(messages: Arc<dyn MessageRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { messages, users }
    }

    #[instrument(skip(self, outgoing), fields(receiver_id = outgoing.receiver_id))]
    pub async fn send(&self, sender_id: UserId, outgoing: OutgoingMessage) -> Result<Message> {
        if outgoing.message.trim().is_empty() {
            return Err(DomainError::validation("message must not be empty"));
        }
        if outgoing.receiver_id == sender_id {
            return Err(DomainError::validation("cannot send a message to yourself"));
        }
        if self.users.find_by_id(outgoing.receiver_id).await?.is_none() {
            return Err(DomainError::not_found("User", outgoing.receiver_id));
        }

        let message = self
            .messages
            .create(NewMessage {
                sender_id,
                receiver_id: outgoing.receiver_id,
                property_id: outgoing.property_id,
                message: outgoing.message,
            })
            .await?;
        info!(message_id = message.id, "message sent");
        Ok(message)
    }

    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<MessageView>> {
        self.messages.list_for_user(user_id).await
    }

    /// Conversations for `user_id`, most recently active first.
    pub async fn conversations(&self, user_id: UserId) -> Result<Vec<Conversation>> {
        let messages = self.messages.list_for_user(user_id).await?;
        Ok(group_conversations(user_id, messages))
    }
}

/// Groups newest-first messages by the non-self participant, keeping the
/// order in which each participant first appears.
pub fn group_conversations(user_id: UserId, messages: Vec<MessageView>) -> Vec<Conversation> {
    let mut conversations: Vec<Conversation> = Vec::new();
    let mut index: HashMap<UserId, usize> = HashMap::new();

    for view in messages {
        let inbound = view.message.receiver_id == user_id;
        let (participant_id, participant_username) = if inbound {
            (view.message.sender_id, view.sender_username.clone())
        } else {
            (view.message.receiver_id, view.receiver_username.clone())
        };
        let unread = inbound && !view.message.is_read;

        match index.get(&participant_id) {
            Some(&i) => {
                let conversation = &mut conversations[i];
                conversation.message_count += 1;
                conversation.unread_count += usize::from(unread);
            }
            None => {
                index.insert(participant_id, conversations.len());
                conversations.push(Conversation {
                    participant_id,
                    participant_username,
                    last_message: view,
                    message_count: 1,
                    unread_count: usize::from(unread),
                });
            }
        }
    }

    conversations
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use domains::{MockMessageRepository, MockUserRepository};

    fn view(id: i64, sender: UserId, receiver: UserId, is_read: bool, age_min: i64) -> MessageView {
        let name = |id: UserId| format!("user{id}");
        MessageView {
            message: Message {
                id,
                sender_id: sender,
                receiver_id: receiver,
                property_id: Some(42),
                message: format!("msg {id}"),
                is_read,
                created_at: Utc::now() - Duration::minutes(age_min),
            },
            sender_username: name(sender),
            receiver_username: name(receiver),
            property_title: Some("Lake house".into()),
        }
    }

    #[test]
    fn test_grouping_by_other_participant() {
        // user 3 talks to 7 and 9; input is newest first
        let messages = vec![
            view(5, 7, 3, false, 1),
            view(4, 3, 9, false, 2),
            view(3, 3, 7, false, 3),
            view(2, 7, 3, true, 4),
            view(1, 9, 3, false, 5),
        ];

        let conversations = group_conversations(3, messages);

        assert_eq!(conversations.len(), 2);
        assert_eq!(conversations[0].participant_id, 7);
        assert_eq!(conversations[0].participant_username, "user7");
        assert_eq!(conversations[0].last_message.message.id, 5);
        assert_eq!(conversations[0].message_count, 3);
        assert_eq!(conversations[0].unread_count, 1);

        assert_eq!(conversations[1].participant_id, 9);
        assert_eq!(conversations[1].message_count, 2);
        // the outbound message to 9 never counts as unread
        assert_eq!(conversations[1].unread_count, 1);
    }

    #[tokio::test]
    async fn test_send_to_unknown_user_is_not_found() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|_| Ok(None));
        let mut messages = MockMessageRepository::new();
        messages.expect_create().never();

        let service = MessageService::new(Arc::new(messages), Arc::new(users));
        let err = service
            .send(
                3,
                OutgoingMessage { receiver_id: 99, property_id: None, message: "hi".into() },
            )
            .await
            .unwrap_err();

        assert_eq!(err, DomainError::not_found("User", 99));
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected() {
        let service = MessageService::new(
            Arc::new(MockMessageRepository::new()),
            Arc::new(MockUserRepository::new()),
        );
        let result = service
            .send(3, OutgoingMessage { receiver_id: 7, property_id: None, message: "  ".into() })
            .await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }
}
