// rest/routes.rs — handlers for the public surface.

use crate::model::VerificationResult;
use crate::AppContext;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub async fn index() -> &'static str {
    "veripat backend operativo"
}

#[derive(Deserialize)]
pub struct VerifyParams {
    /// Raw plate as the caller typed it; absent behaves like empty.
    #[serde(default)]
    pub patente: String,
}

/// The verdict endpoint. Always 200 — every failure mode is encoded in the
/// body's `tipo`/`detalle`, never in HTTP status semantics.
pub async fn verificar_patente(
    State(ctx): State<Arc<AppContext>>,
    Query(params): Query<VerifyParams>,
) -> Json<VerificationResult> {
    Json(ctx.verifier.verify(&params.patente).await)
}

pub async fn health(State(ctx): State<Arc<AppContext>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptime_secs": ctx.started_at.elapsed().as_secs(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
