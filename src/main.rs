use colab_markdown::config::Config;
use colab_markdown::routes::{create_app, WEBSOCKET_PATH};
use colab_markdown::AppState;
use std::panic;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Load configuration before logging so LOG_LEVEL can shape the filter
    let loaded = Config::load();
    let config = loaded.as_ref().cloned().unwrap_or_default();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_filter().into()))
        .init();

    match &loaded {
        Ok(_) => info!("Configuration loaded successfully"),
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            warn!("Using default configuration");
        }
    }

    info!("Starting {}...", config.service_name);

    let address = config.server_address();
    let (app_state, broadcaster_task) = AppState::new(config);
    let app_routes = create_app(app_state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", address));

    info!("🚀 Server running on http://{}", address);
    info!("📡 WebSocket available at ws://{}{}", address, WEBSOCKET_PATH);
    info!("📚 Swagger UI available at http://{}/swagger", address);

    axum::serve(listener, app_routes)
        .await
        .expect("Server failed to start");

    broadcaster_task.abort();
}
