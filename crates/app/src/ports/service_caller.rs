//! Service caller port — "invoke service S on entity E with data P".

use std::future::Future;

use duolight_domain::error::HubError;
use duolight_domain::service::ServiceCall;

/// Dispatches service calls to whichever integration owns the target entity.
///
/// Resolving means the call was accepted, not that the target already
/// changed: callers observe the effect through the next state change.
pub trait ServiceCaller: Send + Sync {
    fn call(&self, call: ServiceCall) -> impl Future<Output = Result<(), HubError>> + Send;
}

impl<T: ServiceCaller> ServiceCaller for std::sync::Arc<T> {
    fn call(&self, call: ServiceCall) -> impl Future<Output = Result<(), HubError>> + Send {
        (**self).call(call)
    }
}
