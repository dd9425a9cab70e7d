mod handlers;

use crate::auth::{Authorizer, require_admin};
use crate::config::Config;
use crate::store::Store;
use anyhow::{Context, Result};
use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<Store>,
    pub authorizer: Arc<dyn Authorizer>,
}

impl AppContext {
    pub fn new(store: Store, authorizer: impl Authorizer + 'static) -> Self {
        Self {
            store: Arc::new(store),
            authorizer: Arc::new(authorizer),
        }
    }
}

pub fn router(ctx: AppContext) -> Router {
    let admin = Router::new()
        .route("/api/responses", get(handlers::list_responses))
        .route("/api/export", get(handlers::export_responses))
        .route("/api/reset", post(handlers::reset))
        .route_layer(middleware::from_fn_with_state(ctx.clone(), require_admin));

    Router::new()
        .route("/api/ping", get(handlers::ping))
        .route("/api/submit", post(handlers::submit))
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

pub async fn run(config: &Config, ctx: AppContext) -> Result<()> {
    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Server running on {}", address);

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
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
