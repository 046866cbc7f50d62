//! Rate limiting middleware for HTTP requests.

use std::{
    fmt::Display,
    future::Future,
    net::{IpAddr, SocketAddr},
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};

use axum::{body::Body, extract::ConnectInfo, response::IntoResponse};
use http::{Request, Response, StatusCode, header::RETRY_AFTER};
use rate_limit::{RateLimitError, RateLimitManager, RateLimitRequest};
use tokio::time::MissedTickBehavior;
use tower::Layer;

#[derive(Clone)]
pub(crate) struct RateLimitLayer(Arc<RateLimitManager>);

impl RateLimitLayer {
    pub fn new(manager: Arc<RateLimitManager>) -> Self {
        Self(manager)
    }
}

impl<Service> Layer<Service> for RateLimitLayer
where
    Service: Send + Clone,
{
    type Service = RateLimitService<Service>;

    fn layer(&self, next: Service) -> Self::Service {
        RateLimitService {
            next,
            manager: self.0.clone(),
        }
    }
}

#[derive(Clone)]
pub(crate) struct RateLimitService<Service> {
    next: Service,
    manager: Arc<RateLimitManager>,
}

impl<Service, ReqBody> tower::Service<Request<ReqBody>> for RateLimitService<Service>
where
    Service: tower::Service<Request<ReqBody>, Response = Response<Body>> + Send + Clone + 'static,
    Service::Future: Send,
    Service::Error: Display + 'static,
    ReqBody: http_body::Body + Send + 'static,
{
    type Response = http::Response<Body>;
    type Error = Service::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response<Body>, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.next.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let mut next = self.next.clone();
        let manager = self.manager.clone();

        Box::pin(async move {
            // Only the configured methods count, reads pass untouched.
            if !manager.applies_to(req.method().as_str()) {
                return next.call(req).await;
            }

            let mut builder = RateLimitRequest::builder();

            if let Some(ip) = extract_client_ip(&req) {
                builder = builder.ip(ip);
            }

            let err = match manager.check_request(&builder.build()) {
                Ok(()) => return next.call(req).await,
                Err(err) => err,
            };

            log::debug!("Request rejected due to rate limit: {err}");

            Ok(too_many_requests(&err))
        })
    }
}

fn too_many_requests(err: &RateLimitError) -> Response<Body> {
    let retry_after = err.retry_after().unwrap_or(Duration::from_secs(1));

    // Whole seconds, rounded up, never zero.
    let seconds = (retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0)).max(1);

    (
        StatusCode::TOO_MANY_REQUESTS,
        [(RETRY_AFTER, seconds.to_string())],
        "Too many requests",
    )
        .into_response()
}

/// Extract client IP address from request.
fn extract_client_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    // First try to get from ConnectInfo (direct connection)
    if let Some(connect_info) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return Some(connect_info.0.ip());
    }

    // Try X-Forwarded-For header (for proxied requests)
    if let Some(forwarded_for) = req.headers().get("x-forwarded-for") {
        let value = forwarded_for.to_str().ok()?;

        // Take the first IP in the chain
        let ip_str = value.split(',').next()?;

        return ip_str.trim().parse::<IpAddr>().ok();
    }

    // Try X-Real-IP header
    let ip_str = req.headers().get("x-real-ip")?.to_str().ok()?;

    ip_str.trim().parse::<IpAddr>().ok()
}

/// Periodically forgets clients whose window ran empty, so the store does not keep every
/// address ever seen.
pub(crate) async fn purge_idle_windows(manager: Arc<RateLimitManager>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        manager.purge_expired();
    }
}
