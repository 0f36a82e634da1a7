// rest/mod.rs — Public HTTP surface.
//
// Endpoints:
//   GET /                       liveness text
//   GET /api/verificar-patente  plate verdict (always 200, JSON body)
//   GET /health                 daemon health JSON

pub mod routes;

use anyhow::Result;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::AppContext;

pub async fn start_rest_server(ctx: Arc<AppContext>) -> Result<()> {
    let bind = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let addr: SocketAddr = bind.parse()?;

    let router = build_router(ctx);

    info!("listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/api/verificar-patente", get(routes::verificar_patente))
        .route("/health", get(routes::health))
        // The verdict API is called straight from browser frontends.
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}
