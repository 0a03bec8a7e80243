//! Server construction and process lifecycle.

mod config;
mod state_builders;

pub use config::ServerConfig;
pub use state_builders::{Services, build_services};

use std::io;
use std::sync::Arc;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use tokio::sync::watch;
use tracing::{info, warn};

use stylebot::inbound::http::health::{HealthState, live, ready};
use stylebot::inbound::http::state::HttpState;
use stylebot::inbound::http::webhook::receive_update;
use stylebot::outbound::persistence::{DbPool, run_pending_migrations};
use stylebot::settings::BotConfig;

fn build_app(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(health_state)
        .app_data(http_state)
        .service(receive_update)
        .service(ready)
        .service(live)
}

/// Construct the webhook server.
///
/// # Errors
///
/// Propagates [`io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> io::Result<Server> {
    let ServerConfig {
        bind_addr,
        http_state,
    } = config;
    let server_health_state = health_state.clone();

    let server = HttpServer::new(move || {
        build_app(server_health_state.clone(), http_state.clone())
    })
    .bind(bind_addr)?
    .run();

    info!(%bind_addr, "webhook server listening");
    Ok(server)
}

/// Resolve on SIGINT, or SIGTERM on Unix.
async fn shutdown_signal() -> io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result,
            _ = terminate.recv() => Ok(()),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}

/// Migrate, wire adapters, and run until a shutdown signal arrives.
///
/// The queue consumer finishes its in-flight batch before the process exits.
///
/// # Errors
///
/// Returns [`io::Error`] for migration, pool, adapter, or bind failures.
pub async fn run(config: BotConfig) -> io::Result<()> {
    run_pending_migrations(config.database_url.as_str())
        .await
        .map_err(io::Error::other)?;
    let pool = DbPool::new(config.pool_config())
        .await
        .map_err(io::Error::other)?;
    let Services {
        http_state,
        consumer,
    } = build_services(&config, pool.clone())?;

    let mut health = HealthState::new().with_check(Arc::new(pool));
    if config.run_mode.runs_worker() {
        health = health.with_check(Arc::new(consumer.heartbeat()));
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer_task = config
        .run_mode
        .runs_worker()
        .then(|| tokio::spawn(async move { consumer.run(shutdown_rx).await }));

    if config.run_mode.serves_http() {
        let health_state = web::Data::new(health);
        let server = create_server(
            health_state.clone(),
            ServerConfig::new(config.bind_addr, http_state),
        )?;
        health_state.mark_ready();
        // Actix installs its own signal handlers and returns once drained.
        let served = server.await;
        health_state.mark_unhealthy();
        served?;
    } else {
        info!("running queue consumer only");
        shutdown_signal().await?;
    }

    if shutdown_tx.send(true).is_err() {
        warn!("queue consumer exited before shutdown");
    }
    if let Some(task) = consumer_task {
        task.await.map_err(io::Error::other)?;
    }
    info!("shutdown complete");
    Ok(())
}
