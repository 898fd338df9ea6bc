//! # CourtCall API
//!
//! The HTTP surface of the match-invite engine: the inbound SMS webhook the
//! carrier calls, and the admin endpoints the club dashboard uses to create
//! and manage match requests.
//!
//! ## Architecture
//!
//! - **Routes**: URL structure, one module per area
//! - **Handlers**: translate requests into [`Engine`] calls
//! - **Middleware**: webhook authentication and error mapping
//! - **Config**: environment-driven server settings
//!
//! Handlers are generic over the store and ranker so the same router serves
//! Postgres in production and the in-memory store in tests.

/// Configuration module for API settings
pub mod config;
/// Request handlers
pub mod handlers;
/// Webhook authentication and error mapping
pub mod middleware;
/// Route definitions and API endpoint structure
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use courtcall_core::store::{CandidateRanker, Store};
use courtcall_sms::engine::Engine;
use eyre::Result;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared application state that is accessible to all request handlers.
pub struct ApiState<S, R> {
    pub engine: Engine<S, R>,
    /// When set, the inbound webhook must carry it as `?token=`.
    pub webhook_token: Option<String>,
}

/// Builds the application router with every route attached to `state`.
pub fn router<S: Store, R: CandidateRanker>(state: Arc<ApiState<S, R>>) -> Router {
    Router::new()
        .merge(routes::health::routes::<S, R>())
        .merge(routes::sms::routes::<S, R>())
        .merge(routes::matches::routes::<S, R>())
        .merge(routes::outbox::routes::<S, R>())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_origin(allowed)
        .allow_credentials(true)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Serves the API until Ctrl-C.
///
/// The caller owns logging setup, the background workers and the engine's
/// timers; this only runs the HTTP server.
pub async fn start_server<S, R>(config: &config::ApiConfig, engine: Engine<S, R>) -> Result<()>
where
    S: Store,
    R: CandidateRanker,
{
    let state = Arc::new(ApiState {
        engine,
        webhook_token: config.webhook_token.clone(),
    });
    if state.webhook_token.is_none() {
        warn!("SMS_WEBHOOK_TOKEN is not set; the inbound webhook is unauthenticated");
    }

    let app = router(state);

    let app = match &config.cors_origins {
        Some(origins) => app.layer(cors_layer(origins)),
        None => app,
    };

    let app = app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout))),
    );

    let addr = config.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
