//! # duolightd — duolight daemon
//!
//! Composition root that wires the in-process runtime, the integrations and
//! the configured dual entity lights together.
//!
//! ## Responsibilities
//! - Parse configuration (env vars, config file)
//! - Initialise logging
//! - Construct the event bus and state store
//! - Set up integrations, then one platform task per configured light
//! - Announce hub start, wait for shutdown (SIGTERM/SIGINT), tear down
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;

use duolight_adapter_virtual::VirtualIntegration;
use duolight_app::event_bus::InProcessEventBus;
use duolight_app::platform;
use duolight_app::ports::EventPublisher;
use duolight_app::router::ServiceRouter;
use duolight_app::state_store::InMemoryStateStore;
use duolight_domain::event::Event;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&config.logging.filter))
        .with_target(true)
        .init();

    // Runtime
    let bus = Arc::new(InProcessEventBus::new(256));
    let store = Arc::new(InMemoryStateStore::new(Arc::clone(&bus)));

    // Integrations
    let integration = if config.integrations.virtual_enabled {
        VirtualIntegration::demo(Arc::clone(&store)).context("building virtual integration")?
    } else {
        VirtualIntegration::new(Arc::clone(&store))
    };
    let integration = Arc::new(integration);
    integration
        .setup()
        .await
        .with_context(|| format!("setting up {} integration", integration.name()))?;

    // Lights
    let mut router = ServiceRouter::new(Arc::clone(&integration));
    for light in config.lights {
        let name = light.name.clone();
        let handle = platform::setup(light, Arc::clone(&store), Arc::clone(&integration), &bus)
            .with_context(|| format!("setting up light {name:?}"))?;
        router.register(handle);
    }

    bus.publish(Event::hub_started()).await?;
    tracing::info!(lights = router.light_count(), "duolightd started");
    tracing::debug!(entities = ?store.entity_ids(), "initial states");

    shutdown_signal().await;

    bus.publish(Event::hub_stopping()).await?;
    router.shutdown().await.context("removing lights")?;
    tracing::info!("duolightd stopped");

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(%err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
