#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![deny(warnings)]
#![allow(clippy::multiple_crate_versions)]

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use passkey_store::{
    handlers::{health, serve_static},
    passkey::{PasskeyRepository, PasskeyStore, WebauthnRepository},
    settings::PasskeyStoreSettings,
    PostgresStore,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from Settings.toml and environment variables
    // This also loads .env file and initializes the logger
    let settings = PasskeyStoreSettings::load()
        .map_err(|e| anyhow::anyhow!("Failed to load settings: {e}"))?;

    let store = Arc::new(PostgresStore::new(settings.database.clone()));
    store.connect().await.context("Failed to connect DB")?;

    if settings.database.run_migrations {
        store
            .run_migrations()
            .await
            .context("Failed to run database migrations")?;
    }

    let repository: WebauthnRepository =
        PasskeyRepository::new(store.clone(), settings.sessions.ttl());
    let repository = web::Data::new(repository);

    spawn_session_sweeper(repository.clone(), settings.sessions.purge_interval());

    let result = start_server(repository, settings).await;
    store.close().await;
    result
}

/// Periodically drop ceremony sessions nobody came back to finish
fn spawn_session_sweeper(repository: web::Data<WebauthnRepository>, every: std::time::Duration) {
    if repository.session_ttl().is_none() {
        log::info!("Session expiry disabled; abandoned ceremonies are kept until restart");
        return;
    }

    actix_web::rt::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            repository.purge_expired_sessions().await;
        }
    });
}

/// Start the HTTP server serving the static front end and health endpoint
///
/// # Errors
///
/// Returns an error if:
/// - Server binding fails
/// - Server fails to start
async fn start_server(
    repository: web::Data<WebauthnRepository>,
    settings: PasskeyStoreSettings,
) -> anyhow::Result<()> {
    let bind_address = settings.get_bind_address();
    print_startup_info(&bind_address, &settings);

    let settings = web::Data::new(settings);
    HttpServer::new(move || {
        App::new()
            .app_data(repository.clone())
            .app_data(settings.clone())
            .wrap(Logger::default())
            .configure(configure_services)
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {bind_address}"))?
    .run()
    .await
    .context("Server failed")
}

fn configure_services(cfg: &mut web::ServiceConfig) {
    cfg
        // Health endpoint
        .route("/ping", web::get().to(health))
        // Static front end
        .route("/{filename:.*}", web::get().to(serve_static));
}

fn print_startup_info(bind_address: &str, settings: &PasskeyStoreSettings) {
    log::info!("Server starting on http://{bind_address}");
    log::info!(
        "Database: {}:{}/{} (sslmode={})",
        settings.database.host,
        settings.database.port,
        settings.database.name,
        settings.database.sslmode
    );
    log::info!(
        "Ceremony sessions: ttl={}s, purge every {}s",
        settings.sessions.ttl_seconds,
        settings.sessions.purge_interval_seconds
    );
    log::info!("Static files folder: {}", settings.static_files.assets_folder);
}
