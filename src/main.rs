use anyhow::Result;

use bistro_boss_backend::{
    app, auth::TokenService, config, db, logging, services::PhotoStore, store::Store,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = config::Settings::from_env()?;

    // Initialize logging
    logging::init_logging(&settings)?;

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        "Starting Bistro Boss backend"
    );

    // Acquire the store once; every request shares this handle
    let store = match &settings.database_url {
        Some(url) => {
            let pool = db::create_pool(&settings, url).await?;
            db::ensure_schema(&pool).await?;
            Store::postgres(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set - using in-memory store, data is lost on restart");
            Store::in_memory()
        }
    };

    let tokens = TokenService::new(
        &settings.jwt_secret,
        chrono::Duration::seconds(settings.jwt_ttl_seconds),
    );
    let photos = PhotoStore::new(settings.upload_dir.clone(), &settings.public_base_url)?;

    // Create application state
    let state = app::AppState::new(settings.clone(), store.clone(), tokens, photos);

    // Build application
    let app = app::create_app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("Listening on {}", settings.server_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    tracing::info!("Server stopped");

    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
