//! # fieldnoded — fieldnode device daemon
//!
//! Composition root that wires all adapters together and runs the device.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Install the tracing subscriber
//! - Resolve the device identity and register the configured channels
//! - Initialize the `SQLite` flag store and run migrations
//! - Start the network event handler and the MQTT event loop
//! - Run provisioning, then serve commands until shutdown (SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use fieldnode_adapter_mqtt::RumqttBus;
use fieldnode_adapter_storage_sqlite_sqlx::SqliteFlagStore;
use fieldnode_adapter_virtual::{LogIndicator, StaticHardwareAddress, VirtualNetwork};
use fieldnode_app::identity::resolve_device_id;
use fieldnode_app::network::NetworkEventHandler;
use fieldnode_app::provisioning::ProvisioningOrchestrator;
use fieldnode_app::rendezvous::Rendezvous;

use crate::config::Config;

const NETWORK_EVENT_CAPACITY: usize = 16;

fn initialize_tracing(filter: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    initialize_tracing(&config.logging.filter);

    // Identity and channels
    let hardware: StaticHardwareAddress = config.device.mac.parse()?;
    let device_id = resolve_device_id(&hardware)?;
    let device = config.build_device(device_id)?;
    tracing::info!(
        device_id = %device.id(),
        name = device.name(),
        channels = device.channels().len(),
        "device configured"
    );

    // Flag store
    let db = fieldnode_adapter_storage_sqlite_sqlx::Config {
        database_url: config.storage.database_url.clone(),
    }
    .build()
    .await?;
    let store = SqliteFlagStore::with_namespace(
        db.pool().clone(),
        config.storage.namespace.clone(),
    );

    let rendezvous = Arc::new(Rendezvous::new());

    // Network
    let (event_tx, event_rx) = mpsc::channel(NETWORK_EVENT_CAPACITY);
    let network = Arc::new(
        VirtualNetwork::new(config.network.provisioned, event_tx)
            .with_attempts(config.network.attempts()),
    );
    let network_task =
        NetworkEventHandler::new(Arc::clone(&network), Arc::clone(&rendezvous)).spawn(event_rx);

    // Message bus
    let (inbox_tx, inbox_rx) = mpsc::channel(config.mqtt.capacity.max(1));
    let (bus, bus_task) = RumqttBus::connect(
        &config.mqtt,
        device.id().as_str(),
        Arc::clone(&rendezvous),
        inbox_tx,
    );

    // Provisioning
    let mut orchestrator = ProvisioningOrchestrator::new(
        device,
        store,
        bus,
        network,
        LogIndicator::default(),
        rendezvous,
        inbox_rx,
    )
    .with_config(config.provisioning_config());
    orchestrator.run().await?;

    // Steady state
    let runtime = orchestrator.into_runtime();
    tokio::select! {
        result = runtime.run() => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutdown requested"),
    }

    network_task.abort();
    bus_task.abort();
    Ok(())
}
