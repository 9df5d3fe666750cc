//! JSON API over the application services.

pub mod api;
pub mod error;
pub mod extract;
pub mod webhook;

use crate::application::Services;
use crate::config::Config;
use crate::error::Result;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use webhook::WebhookVerifier;

pub struct AppState {
    pub services: Services,
    pub webhook: WebhookVerifier,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(services: Services, config: &Config) -> SharedState {
        Arc::new(Self {
            services,
            webhook: WebhookVerifier::new(config.webhook_secret.clone(), config.webhook_tolerance),
        })
    }
}

pub fn build_router(state: SharedState) -> Router {
    api::api_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn serve(config: &Config, services: Services) -> Result<()> {
    let app = build_router(AppState::new(services, config));

    let address = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&address).await?;
    info!(%address, demo_mode = config.demo_mode, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "failed to install terminate handler");
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
}
