use axum::{
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use tracing::info;

use crate::api::handler::{fund_account, health_check, AppState};

pub async fn create_app(state: AppState, request_timeout: Duration) -> Router {
    info!("setting up HTTP routes");

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/accounts", post(fund_account))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::very_permissive())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("HTTP routes configured");
    app
}

pub async fn run_server(app: Router, bind_address: &str) -> Result<(), Box<dyn std::error::Error>> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("server listening on: {}", bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}
