//! Light platform — builds dual entity lights from configuration.
//!
//! [`setup`] subscribes to the event bus right away but defers creating the
//! light until the hub announces [`EventType::HubStarted`], so both source
//! entities have had a chance to appear in the state store. From then on a
//! single task owns the light: it republishes on source changes, runs the
//! optional refresh timer and executes service calls, one at a time.

use std::time::Duration;

use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval};

use duolight_domain::entity::EntityId;
use duolight_domain::error::{HubError, NotFoundError, ValidationError};
use duolight_domain::event::{Event, EventType};
use duolight_domain::service::ServiceCall;

use crate::light::{DualEntityLight, Identity};
use crate::ports::{EventSubscriber, ServiceCaller, StateStore};

/// Declarative configuration of one dual entity light.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformConfig {
    /// Display name.
    pub name: String,
    /// Entity providing power (on/off).
    pub onoff_entity: EntityId,
    /// Entity providing brightness, color and effects.
    pub feature_entity: EntityId,
    /// Explicit id for the composite; derived from the sources when absent.
    #[serde(default)]
    pub entity_id: Option<EntityId>,
    /// Re-read and republish on this period, in seconds.
    #[serde(default)]
    pub scan_interval_secs: Option<u64>,
}

impl PlatformConfig {
    /// Check invariants serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the name is blank, both sources are
    /// the same entity, the light's id names one of its sources, or the scan
    /// interval is zero.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.onoff_entity == self.feature_entity {
            return Err(ValidationError::SameSourceEntity(
                self.onoff_entity.to_string(),
            ));
        }
        if let Some(entity_id) = &self.entity_id {
            if entity_id == &self.onoff_entity || entity_id == &self.feature_entity {
                return Err(ValidationError::SelfReference(entity_id.to_string()));
            }
        }
        if self.scan_interval_secs == Some(0) {
            return Err(ValidationError::ZeroScanInterval);
        }
        Ok(())
    }

    /// Identity the light will have once created.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] if no entity id can be derived.
    pub fn identity(&self) -> Result<Identity, HubError> {
        Identity::derive(
            &self.onoff_entity,
            &self.feature_entity,
            self.entity_id.as_ref(),
        )
    }
}

type Reply = oneshot::Sender<Result<(), HubError>>;

/// Handle on a light set up by [`setup`].
///
/// Dropping the handle stops the light as well; [`remove`](Self::remove)
/// additionally waits for the teardown to finish.
pub struct PlatformHandle {
    entity_id: EntityId,
    commands: mpsc::Sender<(ServiceCall, Reply)>,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl PlatformHandle {
    /// Id the light publishes under.
    #[must_use]
    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    /// Run a service call on the light and wait for it to be forwarded.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] before the hub has started or after the
    /// light is gone, or whatever the light's own handling returns.
    pub async fn call(&self, call: ServiceCall) -> Result<(), HubError> {
        let (reply, response) = oneshot::channel();
        if self.commands.send((call, reply)).await.is_err() {
            return Err(self.not_found());
        }
        response.await.unwrap_or_else(|_| Err(self.not_found()))
    }

    /// Stop the light, release its subscription and drop its published state.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Runtime`] if the light's task panicked.
    pub async fn remove(mut self) -> Result<(), HubError> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.task
            .await
            .map_err(|err| HubError::Runtime(Box::new(err)))
    }

    fn not_found(&self) -> HubError {
        NotFoundError {
            entity: "Light",
            id: self.entity_id.to_string(),
        }
        .into()
    }
}

/// Set up one dual entity light.
///
/// The light is created, activated and published once the bus delivers
/// [`EventType::HubStarted`]. It is torn down through the returned handle,
/// on [`EventType::HubStopping`], or when the bus closes.
///
/// # Errors
///
/// Returns [`HubError::Validation`] when `config` is invalid.
pub fn setup<S, C>(
    config: PlatformConfig,
    store: S,
    caller: C,
    bus: &impl EventSubscriber,
) -> Result<PlatformHandle, HubError>
where
    S: StateStore + 'static,
    C: ServiceCaller + 'static,
{
    config.validate()?;
    let entity_id = config.identity()?.entity_id;
    let events = bus.subscribe();
    let (commands_tx, commands) = mpsc::channel(16);
    let (stop_tx, stop) = oneshot::channel();

    tracing::info!(%entity_id, name = %config.name, "dual entity light waiting for hub start");
    let task = tokio::spawn(run(
        config,
        store,
        caller,
        Channels {
            events,
            commands,
            stop,
        },
    ));

    Ok(PlatformHandle {
        entity_id,
        commands: commands_tx,
        stop: Some(stop_tx),
        task,
    })
}

struct Channels {
    events: broadcast::Receiver<Event>,
    commands: mpsc::Receiver<(ServiceCall, Reply)>,
    stop: oneshot::Receiver<()>,
}

async fn run<S, C>(config: PlatformConfig, store: S, caller: C, mut channels: Channels)
where
    S: StateStore,
    C: ServiceCaller,
{
    if !wait_for_start(&config, &mut channels).await {
        return;
    }

    let light = match DualEntityLight::new(
        config.name,
        config.onoff_entity,
        config.feature_entity,
        config.entity_id,
        store,
        caller,
    ) {
        Ok(light) => light,
        Err(err) => {
            tracing::error!(%err, "failed to create dual entity light");
            return;
        }
    };

    if let Err(err) = light.write_state().await {
        tracing::warn!(%err, entity_id = %light.entity_id(), "failed to publish initial state");
    }
    tracing::info!(
        entity_id = %light.entity_id(),
        switch = %light.switch_entity(),
        feature = %light.feature_entity(),
        "dual entity light activated"
    );

    let mut refresh = config.scan_interval_secs.map(|secs| {
        let period = Duration::from_secs(secs);
        tokio::time::interval_at(Instant::now() + period, period)
    });

    loop {
        tokio::select! {
            _ = &mut channels.stop => break,
            () = tick(refresh.as_mut()) => {
                let state = light.refresh();
                if let Err(err) = light.write_state_from(&state).await {
                    tracing::warn!(%err, entity_id = %light.entity_id(), "failed to republish state");
                }
            }
            Some((call, reply)) = channels.commands.recv() => {
                let result = light.handle_service_call(call).await;
                if let Err(err) = &result {
                    tracing::warn!(%err, entity_id = %light.entity_id(), "service call failed");
                }
                let _ = reply.send(result);
            }
            received = channels.events.recv() => match received {
                Ok(event) if event.event_type == EventType::HubStopping => break,
                Ok(event) => {
                    if let Err(err) = light.handle_event(&event).await {
                        tracing::warn!(%err, entity_id = %light.entity_id(), "failed to republish state");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, entity_id = %light.entity_id(), "event subscription lagged, resyncing");
                    if let Err(err) = light.write_state().await {
                        tracing::warn!(%err, entity_id = %light.entity_id(), "failed to republish state");
                    }
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    drop(channels.events);
    match light.remove_state().await {
        Ok(_) => tracing::info!(entity_id = %light.entity_id(), "dual entity light removed"),
        Err(err) => {
            tracing::warn!(%err, entity_id = %light.entity_id(), "failed to remove published state");
        }
    }
}

/// Wait for the hub to start, refusing commands meanwhile.
///
/// Returns `false` if the light was removed or the bus closed first.
async fn wait_for_start(config: &PlatformConfig, channels: &mut Channels) -> bool {
    loop {
        tokio::select! {
            _ = &mut channels.stop => {
                tracing::debug!(name = %config.name, "removed before hub start");
                return false;
            }
            Some((call, reply)) = channels.commands.recv() => {
                let _ = reply.send(Err(NotFoundError {
                    entity: "Light",
                    id: call.entity_id.to_string(),
                }
                .into()));
            }
            received = channels.events.recv() => match received {
                Ok(event) if event.event_type == EventType::HubStarted => return true,
                Ok(event) if event.event_type == EventType::HubStopping => {
                    tracing::debug!(name = %config.name, "hub stopping before start");
                    return false;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, name = %config.name, "event subscription lagged before hub start");
                }
                Err(RecvError::Closed) => return false,
            },
        }
    }
}

async fn tick(interval: Option<&mut Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
