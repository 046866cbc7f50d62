//! HTTP middleware. [`crate::serve`] stacks them outermost first: request log, access hours,
//! role permission, rate limit.

mod access_hours;
mod rate_limit;
mod request_log;
mod role;

pub(crate) use access_hours::AccessHoursLayer;
pub(crate) use rate_limit::{RateLimitLayer, purge_idle_windows};
pub(crate) use request_log::RequestLogLayer;
pub(crate) use role::RoleLayer;
