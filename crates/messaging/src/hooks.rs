//! Side effects of message mutations, called explicitly where the mutation happens.

use jiff::Timestamp;
use uuid::Uuid;

use crate::model::{Message, MessageHistory, Notification};
use crate::store::Tables;

/// A new message notifies its receiver.
pub(crate) fn on_message_created(tables: &mut Tables, message: &Message) {
    let notification = Notification {
        id: Uuid::new_v4(),
        user_id: message.receiver,
        message_id: message.id,
        created_at: message.created_at,
        read: false,
    };

    log::debug!("Notifying user {} of message {}", message.receiver, message.id);
    tables.notifications.push(notification);
}

/// An edit that changes the content keeps the previous content.
pub(crate) fn on_message_updated(tables: &mut Tables, prior: &Message, new_content: &str, editor: Uuid) {
    if prior.content == new_content {
        return;
    }

    tables.history.push(MessageHistory {
        id: Uuid::new_v4(),
        message_id: prior.id,
        old_content: prior.content.clone(),
        edited_at: Timestamp::now(),
        edited_by: Some(editor),
    });
}
