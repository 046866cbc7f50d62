//! Restricts protected paths to users with an allowed role.

use std::{
    fmt::Display,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use axum::{body::Body, response::IntoResponse};
use config::{IdentityConfig, Role, RoleConfig};
use http::{Request, Response};
use messaging::MessagingService;
use tower::Layer;
use uuid::Uuid;

use crate::error::ApiError;
use crate::identity;

#[derive(Clone)]
pub(crate) struct RoleLayer {
    config: Arc<RoleConfig>,
    identity: Arc<IdentityConfig>,
    service: Arc<MessagingService>,
}

impl RoleLayer {
    pub fn new(config: RoleConfig, identity: Arc<IdentityConfig>, service: Arc<MessagingService>) -> Self {
        Self {
            config: Arc::new(config),
            identity,
            service,
        }
    }
}

impl<Service> Layer<Service> for RoleLayer
where
    Service: Send + Clone,
{
    type Service = RoleService<Service>;

    fn layer(&self, next: Service) -> Self::Service {
        RoleService {
            next,
            layer: self.clone(),
        }
    }
}

#[derive(Clone)]
pub(crate) struct RoleService<Service> {
    next: Service,
    layer: RoleLayer,
}

impl<Service, ReqBody> tower::Service<Request<ReqBody>> for RoleService<Service>
where
    Service: tower::Service<Request<ReqBody>, Response = Response<Body>> + Send + Clone + 'static,
    Service::Future: Send,
    Service::Error: Display + 'static,
    ReqBody: http_body::Body + Send + 'static,
{
    type Response = Response<Body>;
    type Error = Service::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response<Body>, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.next.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let mut next = self.next.clone();
        let layer = self.layer.clone();

        Box::pin(async move {
            if !layer.config.protects(req.uri().path()) {
                return next.call(req).await;
            }

            let user = identity::user_id(req.headers(), &layer.identity);

            let role = match user {
                Some(id) => role_of(layer.service.clone(), id).await,
                None => None,
            };

            if let Some(role) = role
                && layer.config.allowed_roles.contains(&role)
            {
                return next.call(req).await;
            }

            log::debug!(
                "Request to {} refused for user {user:?} with role {role:?}",
                req.uri().path()
            );

            let error = ApiError::Forbidden("your role may not access this resource".to_string());

            Ok(error.into_response())
        })
    }
}

/// The user's role, or `None` if it cannot be determined.
async fn role_of(service: Arc<MessagingService>, id: Uuid) -> Option<Role> {
    match tokio::task::spawn_blocking(move || service.role_of(id)).await {
        Ok(Ok(role)) => Some(role),
        Ok(Err(e)) => {
            log::debug!("No role for user {id}: {e}");
            None
        }
        Err(e) => {
            log::error!("Role lookup for user {id} failed: {e}");
            None
        }
    }
}
