pub mod api;
pub mod auth;
pub mod cli;
pub mod client;
pub mod presence;

use api::create_api_router;
use axum::{Router, response::Redirect, routing::get};
use client::ApiClient;
use presence::PresenceHub;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use url::Url;

pub struct ServerConfig {
    /// Base URL of the backend API (e.g., "https://api.example.com/v1")
    pub api_url: Url,
    /// Whether to set Secure flag on cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
    /// Where unauthenticated users are sent
    pub sign_in_path: String,
    /// Where users land after a successful sign-in
    pub dashboard_path: String,
}

impl ServerConfig {
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            secure_cookies: false,
            sign_in_path: "/sign-in".to_string(),
            dashboard_path: "/dashboard".to_string(),
        }
    }
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    create_app_with_hub(config, PresenceHub::new())
}

/// Create the application router around an existing presence hub.
pub fn create_app_with_hub(config: &ServerConfig, hub: Arc<PresenceHub>) -> Router {
    let api = ApiClient::new(&config.api_url);

    let api_router = create_api_router(
        api,
        hub,
        config.secure_cookies,
        config.sign_in_path.clone(),
        config.dashboard_path.clone(),
    );

    Router::new()
        .route("/", get(Redirect::temporary(&config.dashboard_path)))
        .route("/health", get(|| async { "ok" }))
        .nest("/api", api_router)
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        run_server(config, listener).await.ok();
    });

    Ok((handle, local_addr))
}
