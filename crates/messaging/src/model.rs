//! Rows of the message store.

use std::collections::BTreeSet;

use config::Role;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub role: Role,
    pub created_at: Timestamp,
}

/// Input for creating a user.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewUser {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Role,
}

/// A set of users exchanging messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversation {
    pub id: Uuid,
    pub participants: BTreeSet<Uuid>,
    pub created_at: Timestamp,
}

impl Conversation {
    /// Whether `user` takes part in the conversation.
    pub fn includes(&self, user: Uuid) -> bool {
        self.participants.contains(&user)
    }
}

/// One message, optionally replying to another in the same conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender: Uuid,
    pub receiver: Uuid,
    pub content: String,
    pub created_at: Timestamp,
    pub edited: bool,
    pub parent_id: Option<Uuid>,
    pub read: bool,
}

impl Message {
    /// Whether `user` sent or received the message.
    pub fn involves(&self, user: Uuid) -> bool {
        self.sender == user || self.receiver == user
    }
}

/// Input for sending a message.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewMessage {
    pub receiver: Uuid,
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

/// The content a message had before an edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageHistory {
    pub id: Uuid,
    pub message_id: Uuid,
    pub old_content: String,
    pub edited_at: Timestamp,
    /// Cleared when the editor's account is deleted.
    pub edited_by: Option<Uuid>,
}

/// Tells a user about a message they received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub message_id: Uuid,
    pub created_at: Timestamp,
    pub read: bool,
}

/// A message and its replies, depth first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Thread {
    pub message: Message,
    pub replies: Vec<Thread>,
}

impl Thread {
    /// Number of messages in the thread, the root included.
    pub fn count(&self) -> usize {
        1 + self.replies.iter().map(Thread::count).sum::<usize>()
    }
}
