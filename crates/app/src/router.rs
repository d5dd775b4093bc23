//! Service dispatch — routes service calls to composite lights or to the
//! integration owning the target entity.

use std::future::Future;

use duolight_domain::error::HubError;
use duolight_domain::service::ServiceCall;

use crate::platform::PlatformHandle;
use crate::ports::ServiceCaller;

/// [`ServiceCaller`] sending calls for a registered light to its task and
/// everything else to `fallback`.
pub struct ServiceRouter<C> {
    lights: Vec<PlatformHandle>,
    fallback: C,
}

impl<C> ServiceRouter<C> {
    pub fn new(fallback: C) -> Self {
        Self {
            lights: Vec::new(),
            fallback,
        }
    }

    pub fn register(&mut self, light: PlatformHandle) {
        self.lights.push(light);
    }

    /// Number of registered lights.
    #[must_use]
    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    /// Remove every registered light, waiting for each teardown.
    ///
    /// # Errors
    ///
    /// Returns the first teardown failure; the remaining lights are still
    /// removed.
    pub async fn shutdown(self) -> Result<(), HubError> {
        let mut result = Ok(());
        for light in self.lights {
            let entity_id = light.entity_id().clone();
            if let Err(err) = light.remove().await {
                tracing::error!(%entity_id, %err, "failed to remove light");
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }
        result
    }
}

impl<C: ServiceCaller> ServiceCaller for ServiceRouter<C> {
    fn call(&self, call: ServiceCall) -> impl Future<Output = Result<(), HubError>> + Send {
        let light = self
            .lights
            .iter()
            .find(|light| light.entity_id() == &call.entity_id);
        async move {
            tracing::debug!(%call, routed_to_light = light.is_some(), "dispatching service call");
            match light {
                Some(light) => light.call(call).await,
                None => self.fallback.call(call).await,
            }
        }
    }
}
