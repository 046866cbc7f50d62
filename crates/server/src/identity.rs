//! Who is making a request.
//!
//! Authentication happens in front of this server, which only reads the user id a trusted
//! proxy put into the configured header.

use axum::extract::FromRequestParts;
use config::IdentityConfig;
use http::{HeaderMap, request::Parts};
use uuid::Uuid;

use crate::api::AppState;
use crate::error::ApiError;

/// Raw value of the identity header, if present and readable.
pub(crate) fn header_value<'a>(headers: &'a HeaderMap, config: &IdentityConfig) -> Option<&'a str> {
    headers.get(config.header.as_str())?.to_str().ok()
}

/// The user id carried by the identity header.
pub(crate) fn user_id(headers: &HeaderMap, config: &IdentityConfig) -> Option<Uuid> {
    header_value(headers, config)?.trim().parse().ok()
}

/// The authenticated user performing a request.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Actor(pub Uuid);

impl FromRequestParts<AppState> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        user_id(&parts.headers, &state.identity)
            .map(Actor)
            .ok_or_else(|| ApiError::Unauthenticated(state.identity.header.clone()))
    }
}
