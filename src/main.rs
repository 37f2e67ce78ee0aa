use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use sticker_studio::{api, config, GeminiClient, WorkflowController};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    config::Config::dotenv_load();
    let config = match config::Config::new() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    config::Config::print_env_vars();

    // Without a key the session still serves uploads and settings, but every
    // generation request answers with the startup error.
    let client = match GeminiClient::from_config(&config) {
        Ok(c) => Some(c),
        Err(e) => {
            tracing::error!("{}", e);
            None
        }
    };
    let controller = WorkflowController::new(client, config.model.clone());
    let state = Arc::new(api::AppState::new(controller));
    let app = api::router(state);

    // Run our application with safe parsing
    let host_str = config.api_host.clone();
    let port_str = config.api_port.clone();
    let ip: std::net::IpAddr = host_str.parse().unwrap_or_else(|_| {
        tracing::warn!("Invalid API_HOST '{}', falling back to 127.0.0.1", host_str);
        std::net::IpAddr::from([127, 0, 0, 1])
    });
    let port: u16 = port_str.parse().unwrap_or_else(|_| {
        tracing::warn!("Invalid API_PORT '{}', falling back to 8190", port_str);
        8190
    });
    let socket_address = SocketAddr::new(ip, port);
    tracing::info!("listening on {}", socket_address);
    if let Err(e) = axum::Server::bind(&socket_address)
        .serve(app.into_make_service())
        .await
    {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
