//! Refuses requests outside the configured hours of the day.

use std::{
    fmt::Display,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use axum::{body::Body, response::IntoResponse};
use config::AccessHoursConfig;
use http::{Request, Response};
use jiff::Zoned;
use tower::Layer;

use crate::error::ApiError;

type HourSource = Arc<dyn Fn() -> u8 + Send + Sync>;

/// Current hour in the server's local time zone.
fn local_hour() -> u8 {
    u8::try_from(Zoned::now().hour()).unwrap_or_default()
}

#[derive(Clone)]
pub(crate) struct AccessHoursLayer {
    hours: AccessHoursConfig,
    hour: HourSource,
}

impl AccessHoursLayer {
    pub fn new(hours: AccessHoursConfig) -> Self {
        Self {
            hours,
            hour: Arc::new(local_hour),
        }
    }

    #[cfg(test)]
    fn at_hour(hours: AccessHoursConfig, hour: u8) -> Self {
        Self {
            hours,
            hour: Arc::new(move || hour),
        }
    }
}

impl<Service> Layer<Service> for AccessHoursLayer
where
    Service: Send + Clone,
{
    type Service = AccessHoursService<Service>;

    fn layer(&self, next: Service) -> Self::Service {
        AccessHoursService {
            next,
            hours: self.hours,
            hour: self.hour.clone(),
        }
    }
}

#[derive(Clone)]
pub(crate) struct AccessHoursService<Service> {
    next: Service,
    hours: AccessHoursConfig,
    hour: HourSource,
}

impl<Service, ReqBody> tower::Service<Request<ReqBody>> for AccessHoursService<Service>
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
        let hours = self.hours;
        let hour = (self.hour)();

        Box::pin(async move {
            if hours.allows(hour) {
                return next.call(req).await;
            }

            log::debug!("Request to {} refused at hour {hour}", req.uri().path());

            let error = ApiError::Forbidden(format!(
                "access is only allowed between {:02}:00 and {:02}:00",
                hours.start_hour, hours.end_hour
            ));

            Ok(error.into_response())
        })
    }
}
