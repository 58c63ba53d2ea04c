//! robot-relay server entry point.
//!
//! Wires storage, the access oracle, the identity provider and the event
//! sink, then serves the REST and WebSocket endpoints.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use robot_relay::access::{AccessOracle, PostgresAccessOracle, StaticAccessOracle};
use robot_relay::app_state::AppState;
use robot_relay::auth::JwtIdentity;
use robot_relay::build_app;
use robot_relay::config::{LogFormat, RelayConfig};
use robot_relay::domain::{EventBus, GroupRegistry};
use robot_relay::persistence::{EventLogStore, InMemoryEventLog, PostgresEventLog};
use robot_relay::service::RelayService;

/// How long shutdown waits for queued audit events to be written.
const SINK_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = RelayConfig::from_env().context("loading configuration")?;

    // Initialize tracing
    init_tracing(config.log_format);
    tracing::info!(addr = %config.listen_addr, "starting robot-relay");

    // Build storage and access layer
    let (event_store, oracle) = build_backends(&config).await?;

    // Build domain and service layer
    let (event_bus, sink) = EventBus::spawn(config.event_bus_capacity, event_store);
    let registry = Arc::new(GroupRegistry::new());
    let relay = Arc::new(RelayService::new(registry, event_bus, oracle));

    // Build application state
    let app_state = AppState {
        relay,
        identity: Arc::new(JwtIdentity::new(&config.jwt_secret)),
        session_outbound_capacity: config.session_outbound_capacity,
    };
    let app = build_app(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving")?;

    if tokio::time::timeout(SINK_DRAIN_TIMEOUT, sink).await.is_err() {
        tracing::warn!("event sink still busy at shutdown, pending events may be lost");
    }
    tracing::info!("robot-relay stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

async fn build_backends(
    config: &RelayConfig,
) -> anyhow::Result<(Arc<dyn EventLogStore>, Arc<dyn AccessOracle>)> {
    if !config.persistence_enabled {
        tracing::warn!("persistence disabled: event log kept in memory, access from ACCESS_GRANTS");
        let oracle = StaticAccessOracle::parse(&config.access_grants).context("parsing ACCESS_GRANTS")?;
        return Ok((
            Arc::new(InMemoryEventLog::new(config.event_log_memory_capacity)),
            Arc::new(oracle),
        ));
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect(&config.database_url)
        .await
        .context("connecting to PostgreSQL")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("running migrations")?;
    tracing::info!("event log migrations applied");

    Ok((
        Arc::new(PostgresEventLog::new(pool.clone())),
        Arc::new(PostgresAccessOracle::new(pool)),
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
