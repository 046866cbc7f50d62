//! Appends one line per request to the request log file.

use std::{
    fmt::Display,
    future::Future,
    path::{Path, PathBuf},
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use axum::body::Body;
use config::{IdentityConfig, RequestLogConfig};
use http::{Request, Response};
use jiff::Zoned;
use tokio::{fs::OpenOptions, io::AsyncWriteExt};
use tower::Layer;

use crate::identity;

/// Shown for requests without an identity header.
const ANONYMOUS: &str = "Anonymous";

#[derive(Clone)]
pub(crate) struct RequestLogLayer {
    path: Arc<PathBuf>,
    identity: Arc<IdentityConfig>,
}

impl RequestLogLayer {
    pub fn new(config: &RequestLogConfig, identity: Arc<IdentityConfig>) -> Self {
        let path = config.path();
        log::debug!("Logging requests to {}", path.display());

        Self {
            path: Arc::new(path),
            identity,
        }
    }
}

impl<Service> Layer<Service> for RequestLogLayer
where
    Service: Send + Clone,
{
    type Service = RequestLogService<Service>;

    fn layer(&self, next: Service) -> Self::Service {
        RequestLogService {
            next,
            layer: self.clone(),
        }
    }
}

#[derive(Clone)]
pub(crate) struct RequestLogService<Service> {
    next: Service,
    layer: RequestLogLayer,
}

impl<Service, ReqBody> tower::Service<Request<ReqBody>> for RequestLogService<Service>
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
            let user = identity::header_value(req.headers(), &layer.identity).unwrap_or(ANONYMOUS);
            let line = log_line(&Zoned::now(), user, req.uri().path());

            if let Err(e) = append(&layer.path, &line).await {
                log::warn!("Failed to write request log {}: {e}", layer.path.display());
            }

            next.call(req).await
        })
    }
}

fn log_line(now: &Zoned, user: &str, path: &str) -> String {
    format!("{} - User: {user} - Path: {path}\n", now.strftime("%Y-%m-%d %H:%M:%S%.6f"))
}

async fn append(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path).await?;
    file.write_all(line.as_bytes()).await
}
