//! Messaging operations. Each one runs as a unit of work through the pipeline.

use std::collections::BTreeSet;

use config::{Role, StorageConfig};
use jiff::Timestamp;
use unit_of_work::{MemoCache, Pipeline, RetryPolicy};
use uuid::Uuid;

use crate::error::StoreError;
use crate::hooks;
use crate::model::{Conversation, Message, MessageHistory, NewMessage, NewUser, Notification, Thread, User};
use crate::query::{MessageFilter, Page};
use crate::store::{Database, Tables};

/// Users, conversations and messages on top of a [`Database`].
///
/// Every method blocks: retries sleep on the calling thread.
pub struct MessagingService {
    pipeline: Pipeline<Database>,
    users_by_name: MemoCache<String, User>,
}

impl MessagingService {
    pub fn new(database: Database, config: &StorageConfig) -> Self {
        Self {
            pipeline: Pipeline::new(database, RetryPolicy::from(&config.retry)),
            users_by_name: MemoCache::from_config(&config.cache),
        }
    }

    /// The underlying database.
    pub fn database(&self) -> &Database {
        self.pipeline.connector()
    }

    /// Registers a user. Anyone may register as a guest or member; higher roles are granted
    /// by an admin `actor`, except for the first user, who bootstraps the deployment.
    pub fn create_user(&self, actor: Option<Uuid>, new: NewUser) -> Result<User, StoreError> {
        if new.username.trim().is_empty() {
            return Err(StoreError::Invalid("username must not be empty".into()));
        }

        self.pipeline
            .execute("INSERT INTO users (id, username, email, role)", |connection| {
                let tables = connection.tables();

                if tables.user_by_name(&new.username).is_some() {
                    return Err(StoreError::Invalid(format!("username '{}' is taken", new.username)));
                }

                if new.role > Role::Member && !tables.users.is_empty() {
                    let granted_by_admin = match actor {
                        Some(actor) => tables.user(actor)?.role == Role::Admin,
                        None => false,
                    };

                    if !granted_by_admin {
                        return Err(StoreError::Forbidden(format!(
                            "only admins can grant the {} role",
                            new.role
                        )));
                    }
                }

                let user = User {
                    id: Uuid::new_v4(),
                    username: new.username.clone(),
                    email: new.email.clone(),
                    role: new.role,
                    created_at: Timestamp::now(),
                };

                connection.tables_mut().users.insert(user.id, user.clone());

                Ok(user)
            })
            .inspect(|user| log::info!("Created user '{}' ({})", user.username, user.id))
    }

    /// Looks a user up by exact username. Results are memoized until the user is deleted.
    pub fn find_user_by_name(&self, username: &str) -> Result<User, StoreError> {
        self.pipeline.cached(
            "SELECT * FROM users WHERE username = ?",
            &self.users_by_name,
            &username.to_string(),
            |connection, username| {
                connection
                    .tables()
                    .user_by_name(username)
                    .cloned()
                    .ok_or_else(|| StoreError::not_found("User", username))
            },
        )
    }

    pub fn get_user(&self, id: Uuid) -> Result<User, StoreError> {
        self.pipeline
            .execute("SELECT * FROM users WHERE id = ?", |connection| {
                connection.tables().user(id).cloned()
            })
    }

    /// Role of `id`, used for access decisions.
    pub fn role_of(&self, id: Uuid) -> Result<Role, StoreError> {
        self.get_user(id).map(|user| user.role)
    }

    /// Deletes a user with everything that hangs off them: messages they sent or received,
    /// replies to those, edit history and notifications of removed messages, and their
    /// conversation memberships. Users may delete themselves, admins anyone.
    pub fn delete_user(&self, actor: Uuid, id: Uuid) -> Result<User, StoreError> {
        let deleted = self.pipeline.execute("DELETE FROM users WHERE id = ?", |connection| {
            let acting = connection.tables().user(actor)?;

            if acting.id != id && acting.role != Role::Admin {
                return Err(StoreError::Forbidden("only admins can delete other users".into()));
            }

            let tables = connection.tables_mut();
            let user = tables.users.remove(&id).ok_or_else(|| StoreError::not_found("User", id))?;

            cascade_user_deletion(tables, id);

            Ok(user)
        })?;

        self.users_by_name.invalidate(&deleted.username);
        log::info!("Deleted user '{}' ({})", deleted.username, deleted.id);

        Ok(deleted)
    }

    /// Starts a conversation between `actor` and `participants`.
    pub fn create_conversation(&self, actor: Uuid, participants: &[Uuid]) -> Result<Conversation, StoreError> {
        self.pipeline
            .execute("INSERT INTO conversations (id, participants)", |connection| {
                let tables = connection.tables();

                let mut members = BTreeSet::from([tables.user(actor)?.id]);

                for &participant in participants {
                    members.insert(tables.user(participant)?.id);
                }

                if members.len() < 2 {
                    return Err(StoreError::Invalid(
                        "a conversation needs at least one other participant".into(),
                    ));
                }

                let conversation = Conversation {
                    id: Uuid::new_v4(),
                    participants: members,
                    created_at: Timestamp::now(),
                };

                connection
                    .tables_mut()
                    .conversations
                    .insert(conversation.id, conversation.clone());

                Ok(conversation)
            })
    }

    /// Conversations `actor` takes part in, oldest first.
    pub fn list_conversations(&self, actor: Uuid) -> Result<Vec<Conversation>, StoreError> {
        self.pipeline
            .execute("SELECT * FROM conversations WHERE participant = ?", |connection| {
                let tables = connection.tables();
                tables.user(actor)?;

                let mut conversations: Vec<_> = tables
                    .conversations
                    .values()
                    .filter(|conversation| conversation.includes(actor))
                    .cloned()
                    .collect();

                conversations.sort_by_key(|conversation| conversation.created_at);

                Ok(conversations)
            })
    }

    /// Sends a message in a conversation both sender and receiver take part in. The
    /// receiver is notified.
    pub fn send_message(&self, actor: Uuid, conversation_id: Uuid, new: NewMessage) -> Result<Message, StoreError> {
        if new.content.trim().is_empty() {
            return Err(StoreError::Invalid("message content must not be empty".into()));
        }

        self.pipeline.execute(
            "INSERT INTO messages (id, conversation_id, sender, receiver, content, parent_id)",
            |connection| {
                let tables = connection.tables();
                let conversation = participating(tables, actor, conversation_id)?;

                if !conversation.includes(new.receiver) {
                    return Err(StoreError::Invalid(format!(
                        "receiver {} is not a participant of conversation {conversation_id}",
                        new.receiver
                    )));
                }

                if let Some(parent_id) = new.parent_id {
                    let parent = tables.message(parent_id)?;

                    if parent.conversation_id != conversation_id {
                        return Err(StoreError::Invalid(format!(
                            "message {parent_id} belongs to another conversation"
                        )));
                    }
                }

                let message = Message {
                    id: Uuid::new_v4(),
                    conversation_id,
                    sender: actor,
                    receiver: new.receiver,
                    content: new.content.clone(),
                    created_at: Timestamp::now(),
                    edited: false,
                    parent_id: new.parent_id,
                    read: false,
                };

                let tables = connection.tables_mut();

                tables.messages.push(message.clone());
                hooks::on_message_created(tables, &message);

                Ok(message)
            },
        )
    }

    /// A message visible to `actor`.
    pub fn get_message(&self, actor: Uuid, id: Uuid) -> Result<Message, StoreError> {
        self.pipeline
            .execute("SELECT * FROM messages WHERE id = ?", |connection| {
                visible_message(connection.tables(), actor, id).cloned()
            })
    }

    /// Replaces the content of a message. Only its sender may edit it. A changed content
    /// records the previous one in the history and marks the message edited.
    pub fn edit_message(&self, actor: Uuid, id: Uuid, content: &str) -> Result<Message, StoreError> {
        if content.trim().is_empty() {
            return Err(StoreError::Invalid("message content must not be empty".into()));
        }

        self.pipeline
            .execute("UPDATE messages SET content = ? WHERE id = ?", |connection| {
                let prior = connection.tables().message(id)?.clone();

                if prior.sender != actor {
                    return Err(StoreError::Forbidden("only the sender can edit a message".into()));
                }

                if prior.content == content {
                    return Ok(prior);
                }

                let tables = connection.tables_mut();
                hooks::on_message_updated(tables, &prior, content, actor);

                let message = tables.message_mut(id)?;
                message.content = content.to_string();
                message.edited = true;

                Ok(message.clone())
            })
    }

    /// Previous contents of a message, oldest first.
    pub fn message_history(&self, actor: Uuid, id: Uuid) -> Result<Vec<MessageHistory>, StoreError> {
        self.pipeline
            .execute("SELECT * FROM message_history WHERE message_id = ?", |connection| {
                let tables = connection.tables();
                visible_message(tables, actor, id)?;

                Ok(tables
                    .history
                    .iter()
                    .filter(|entry| entry.message_id == id)
                    .cloned()
                    .collect())
            })
    }

    /// Messages from `actor`'s conversations matching `filter`, newest first.
    pub fn list_messages(&self, actor: Uuid, filter: &MessageFilter, page: usize) -> Result<Page<Message>, StoreError> {
        self.pipeline.execute("SELECT * FROM messages ORDER BY created_at DESC", |connection| {
            let tables = connection.tables();
            tables.user(actor)?;

            if let Some(conversation_id) = filter.conversation {
                participating(tables, actor, conversation_id)?;
            }

            let visible: Vec<_> = tables
                .messages
                .iter()
                .rev()
                .filter(|message| filter.matches(message))
                .filter(|message| {
                    tables
                        .conversations
                        .get(&message.conversation_id)
                        .is_some_and(|conversation| conversation.includes(actor))
                })
                .cloned()
                .collect();

            Ok(Page::of(visible, page))
        })
    }

    /// A message with all replies below it, depth first.
    pub fn thread(&self, actor: Uuid, id: Uuid) -> Result<Thread, StoreError> {
        self.pipeline
            .execute("SELECT * FROM messages WHERE parent_id = ?", |connection| {
                let tables = connection.tables();
                let root = visible_message(tables, actor, id)?;

                Ok(build_thread(tables, root))
            })
    }

    /// Messages received by `actor` and not read yet, newest first.
    pub fn unread_for_user(&self, actor: Uuid) -> Result<Vec<Message>, StoreError> {
        self.pipeline
            .execute("SELECT * FROM messages WHERE receiver = ? AND read = 0", |connection| {
                let tables = connection.tables();
                tables.user(actor)?;

                Ok(tables
                    .messages
                    .iter()
                    .rev()
                    .filter(|message| message.receiver == actor && !message.read)
                    .cloned()
                    .collect())
            })
    }

    /// Marks a received message and its notifications read.
    pub fn mark_read(&self, actor: Uuid, id: Uuid) -> Result<Message, StoreError> {
        self.pipeline
            .execute("UPDATE messages SET read = 1 WHERE id = ?", |connection| {
                let message = connection.tables().message(id)?;

                if message.receiver != actor {
                    return Err(StoreError::Forbidden(
                        "only the receiver can mark a message read".into(),
                    ));
                }

                if message.read {
                    return Ok(message.clone());
                }

                let tables = connection.tables_mut();

                for notification in &mut tables.notifications {
                    if notification.message_id == id && notification.user_id == actor {
                        notification.read = true;
                    }
                }

                let message = tables.message_mut(id)?;
                message.read = true;

                Ok(message.clone())
            })
    }

    /// Notifications of `actor`, newest first.
    pub fn notifications_for(&self, actor: Uuid) -> Result<Vec<Notification>, StoreError> {
        self.pipeline
            .execute("SELECT * FROM notifications WHERE user_id = ?", |connection| {
                let tables = connection.tables();
                tables.user(actor)?;

                Ok(tables
                    .notifications
                    .iter()
                    .rev()
                    .filter(|notification| notification.user_id == actor)
                    .cloned()
                    .collect())
            })
    }
}

fn participating(tables: &Tables, actor: Uuid, conversation_id: Uuid) -> Result<&Conversation, StoreError> {
    tables.user(actor)?;
    let conversation = tables.conversation(conversation_id)?;

    if !conversation.includes(actor) {
        return Err(StoreError::Forbidden(format!(
            "not a participant of conversation {conversation_id}"
        )));
    }

    Ok(conversation)
}

fn visible_message(tables: &Tables, actor: Uuid, id: Uuid) -> Result<&Message, StoreError> {
    let message = tables.message(id)?;
    participating(tables, actor, message.conversation_id)?;

    Ok(message)
}

fn build_thread(tables: &Tables, root: &Message) -> Thread {
    let replies = tables
        .messages
        .iter()
        .filter(|message| message.parent_id == Some(root.id))
        .map(|reply| build_thread(tables, reply))
        .collect();

    Thread {
        message: root.clone(),
        replies,
    }
}

fn cascade_user_deletion(tables: &mut Tables, id: Uuid) {
    let mut removed: BTreeSet<Uuid> = tables
        .messages
        .iter()
        .filter(|message| message.involves(id))
        .map(|message| message.id)
        .collect();

    // Replies precede nothing they answer, so one forward pass catches whole threads.
    for message in &tables.messages {
        if message.parent_id.is_some_and(|parent| removed.contains(&parent)) {
            removed.insert(message.id);
        }
    }

    tables.messages.retain(|message| !removed.contains(&message.id));
    tables.history.retain(|entry| !removed.contains(&entry.message_id));
    tables
        .notifications
        .retain(|notification| notification.user_id != id && !removed.contains(&notification.message_id));

    for entry in &mut tables.history {
        if entry.edited_by == Some(id) {
            entry.edited_by = None;
        }
    }

    for conversation in tables.conversations.values_mut() {
        conversation.participants.remove(&id);
    }

    log::debug!("Removed {} message(s) along with user {id}", removed.len());
}
