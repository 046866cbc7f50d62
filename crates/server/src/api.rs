//! REST endpoints of the messaging service.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post},
};
use config::IdentityConfig;
use jiff::Timestamp;
use messaging::{
    Conversation, Message, MessageFilter, MessageHistory, MessagingService, NewMessage, NewUser, Notification, Page,
    StoreError, Thread, User,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::identity::{self, Actor};

/// Shared by all handlers.
#[derive(Clone)]
pub(crate) struct AppState {
    pub service: Arc<MessagingService>,
    pub identity: Arc<IdentityConfig>,
}

impl AppState {
    /// Runs a service call on the blocking pool; retries sleep on the thread they run on.
    async fn run<T, F>(&self, op: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&MessagingService) -> Result<T, StoreError> + Send + 'static,
    {
        let service = self.service.clone();

        let result = tokio::task::spawn_blocking(move || op(&service))
            .await
            .map_err(|e| ApiError::Internal(format!("Blocking task failed: {e}")))?;

        Ok(result?)
    }
}

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/users", get(find_user).post(create_user))
        .route("/users/{id}", delete(delete_user))
        .route("/conversations", get(list_conversations).post(create_conversation))
        .route(
            "/conversations/{id}/messages",
            get(conversation_messages).post(send_message),
        )
        .route("/messages", get(list_messages))
        .route("/messages/unread", get(unread_messages))
        .route("/messages/{id}", get(get_message).patch(edit_message))
        .route("/messages/{id}/history", get(message_history))
        .route("/messages/{id}/thread", get(thread))
        .route("/messages/{id}/read", post(mark_read))
        .route("/notifications", get(notifications))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct UserQuery {
    username: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NewConversation {
    participants: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EditMessage {
    content: String,
}

/// Query string of message listings.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct MessagesQuery {
    page: Option<usize>,
    conversation: Option<Uuid>,
    participant: Option<Uuid>,
    created_after: Option<Timestamp>,
    created_before: Option<Timestamp>,
}

impl MessagesQuery {
    fn into_parts(self) -> (MessageFilter, usize) {
        let filter = MessageFilter {
            conversation: self.conversation,
            participant: self.participant,
            created_after: self.created_after,
            created_before: self.created_before,
        };

        (filter, self.page.unwrap_or(1))
    }
}

async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(new): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    // Registration is open; the caller's identity only matters for privileged roles.
    let actor = identity::user_id(&headers, &state.identity);
    let user = state.run(move |service| service.create_user(actor, new)).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

async fn find_user(
    State(state): State<AppState>,
    _actor: Actor,
    Query(query): Query<UserQuery>,
) -> Result<Json<User>, ApiError> {
    let user = state
        .run(move |service| service.find_user_by_name(&query.username))
        .await?;

    Ok(Json(user))
}

async fn delete_user(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.run(move |service| service.delete_user(actor, id)).await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn list_conversations(
    State(state): State<AppState>,
    Actor(actor): Actor,
) -> Result<Json<Vec<Conversation>>, ApiError> {
    let conversations = state.run(move |service| service.list_conversations(actor)).await?;

    Ok(Json(conversations))
}

async fn create_conversation(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(new): Json<NewConversation>,
) -> Result<(StatusCode, Json<Conversation>), ApiError> {
    let conversation = state
        .run(move |service| service.create_conversation(actor, &new.participants))
        .await?;

    Ok((StatusCode::CREATED, Json(conversation)))
}

async fn conversation_messages(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Page<Message>>, ApiError> {
    let (mut filter, page) = query.into_parts();
    filter.conversation = Some(id);

    let messages = state
        .run(move |service| service.list_messages(actor, &filter, page))
        .await?;

    Ok(Json(messages))
}

async fn send_message(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    Json(new): Json<NewMessage>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let message = state.run(move |service| service.send_message(actor, id, new)).await?;

    Ok((StatusCode::CREATED, Json(message)))
}

async fn list_messages(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Page<Message>>, ApiError> {
    let (filter, page) = query.into_parts();

    let messages = state
        .run(move |service| service.list_messages(actor, &filter, page))
        .await?;

    Ok(Json(messages))
}

async fn unread_messages(
    State(state): State<AppState>,
    Actor(actor): Actor,
) -> Result<Json<Vec<Message>>, ApiError> {
    let messages = state.run(move |service| service.unread_for_user(actor)).await?;

    Ok(Json(messages))
}

async fn get_message(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Message>, ApiError> {
    let message = state.run(move |service| service.get_message(actor, id)).await?;

    Ok(Json(message))
}

async fn edit_message(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    Json(edit): Json<EditMessage>,
) -> Result<Json<Message>, ApiError> {
    let message = state
        .run(move |service| service.edit_message(actor, id, &edit.content))
        .await?;

    Ok(Json(message))
}

async fn message_history(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<MessageHistory>>, ApiError> {
    let history = state.run(move |service| service.message_history(actor, id)).await?;

    Ok(Json(history))
}

async fn thread(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Thread>, ApiError> {
    let thread = state.run(move |service| service.thread(actor, id)).await?;

    Ok(Json(thread))
}

async fn mark_read(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Message>, ApiError> {
    let message = state.run(move |service| service.mark_read(actor, id)).await?;

    Ok(Json(message))
}

async fn notifications(
    State(state): State<AppState>,
    Actor(actor): Actor,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let notifications = state.run(move |service| service.notifications_for(actor)).await?;

    Ok(Json(notifications))
}
