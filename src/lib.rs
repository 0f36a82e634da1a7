//! veripat — verificador de patentes.
//!
//! A small always-on HTTP daemon answering one question: does a vehicle
//! plate belong to a passenger-transport service (collective taxi / taxi /
//! bus), according to the transport regulator's public lookup page. Each
//! request drives its own headless Chromium session against the regulator's
//! form, classifies the rendered text, and returns a JSON verdict.
//!
//! Throughput is bounded by browser process spawn cost: every in-flight
//! verification owns exactly one Chromium process, and nothing is cached
//! between requests. Cap concurrency upstream if that ceiling matters for
//! your deployment.

pub mod classify;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod plate;
pub mod query;
pub mod rest;
pub mod runtime;
pub mod session;

use config::VerifierConfig;
use pipeline::Verifier;
use std::sync::Arc;

/// Shared application state passed to every HTTP handler.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<VerifierConfig>,
    pub verifier: Arc<Verifier>,
    pub started_at: std::time::Instant,
}

impl AppContext {
    pub fn new(config: VerifierConfig) -> Self {
        let config = Arc::new(config);
        Self {
            verifier: Arc::new(Verifier::new(config.clone())),
            config,
            started_at: std::time::Instant::now(),
        }
    }
}
