//! Storefront API server entry point.

use std::error::Error;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use storefront_api::config::AppConfig;
use storefront_api::error::AppError;
use storefront_api::state::AppState;
use storefront_bus::channel::{BusMessage, ChannelBus};
use storefront_bus::kafka_rest::KafkaRestBus;
use storefront_core::bus::MessageBus;
use storefront_core::clock::{Clock, SystemClock};
use storefront_outbox::dispatcher::PublishDispatcher;
use storefront_outbox_store::pg_outbox_store::PgOutboxStore;
use storefront_outbox_store::schema::run_migrations;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Storefront API server");

    let config = AppConfig::from_env()?;

    // Create database connection pool and bring the schema up to date.
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(AppError::from)?;
    run_migrations(&pool).await.map_err(AppError::from)?;

    let store = Arc::new(PgOutboxStore::new(pool));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let dispatcher = if config.dispatcher.enabled {
        let bus = build_bus(&config)?;
        Some(PublishDispatcher::new(store.clone(), bus, config.dispatcher.clone()).start())
    } else {
        tracing::info!("publish dispatcher disabled");
        None
    };

    let app = storefront_api::app(AppState::new(clock, store, dispatcher.is_some()));

    let addr = config.socket_addr()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(AppError::from)?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::from)?;

    if let Some(handle) = dispatcher {
        handle.shutdown().await;
    }
    tracing::info!("Storefront API server stopped");

    Ok(())
}

/// Picks the Kafka REST proxy when configured, otherwise an in-process
/// channel whose messages are logged.
fn build_bus(config: &AppConfig) -> Result<Arc<dyn MessageBus>, AppError> {
    if let Some(url) = &config.kafka_rest_url {
        tracing::info!(url = %url, "publishing outbox events through Kafka REST proxy");
        return Ok(Arc::new(KafkaRestBus::new(
            url,
            config.dispatcher.send_timeout,
        )?));
    }

    tracing::warn!("KAFKA_REST_URL not set; publishing outbox events to an in-process channel");
    let bus = ChannelBus::default();
    tokio::spawn(log_messages(bus.subscribe()));
    Ok(Arc::new(bus))
}

async fn log_messages(mut receiver: broadcast::Receiver<BusMessage>) {
    loop {
        match receiver.recv().await {
            Ok(message) => {
                tracing::info!(topic = %message.topic, payload = %message.payload, "message delivered");
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "channel log subscriber fell behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
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
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
