// SPDX-License-Identifier: MIT
//! The verification pipeline — normalize, acquire, query, classify, retry,
//! release. This is the single recovery point: no failure below this module
//! is allowed to terminate a request abnormally.

use crate::classify::classify;
use crate::config::VerifierConfig;
use crate::error::VerifyError;
use crate::model::{Category, VerificationResult};
use crate::plate::PlateToken;
use crate::runtime::ChromeLocator;
use crate::session::{ChromeSessionFactory, QuerySession, SessionFactory};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::sleep;
use tracing::{debug, info, warn};

pub struct Verifier {
    config: Arc<VerifierConfig>,
    sessions: Arc<dyn SessionFactory>,
}

impl Verifier {
    /// A verifier backed by real Chromium sessions.
    pub fn new(config: Arc<VerifierConfig>) -> Self {
        let locator = ChromeLocator::new(&config.cache_dir);
        Self {
            sessions: Arc::new(ChromeSessionFactory::new(locator)),
            config,
        }
    }

    /// A verifier with an injected session layer (tests).
    pub fn with_sessions(config: Arc<VerifierConfig>, sessions: Arc<dyn SessionFactory>) -> Self {
        Self { config, sessions }
    }

    /// Verify one raw plate string end to end.
    ///
    /// Never fails at this boundary: every pipeline error becomes a
    /// `tipo = "error"` verdict with a string detail, elapsed time stamped
    /// either way.
    pub async fn verify(&self, raw: &str) -> VerificationResult {
        let started = Instant::now();

        let plate = match PlateToken::normalize(raw) {
            Ok(plate) => plate,
            Err(rejected) => {
                debug!(input = raw, "plate rejected before any I/O");
                return VerificationResult::invalid(rejected, elapsed_ms(started));
            }
        };

        match self.lookup(&plate).await {
            Ok(category) => {
                info!(
                    plate = %plate,
                    category = ?category,
                    ms = elapsed_ms(started),
                    "verification complete"
                );
                VerificationResult::classified(&plate, category, elapsed_ms(started))
            }
            Err(e) => {
                warn!(plate = %plate, err = %e, "verification failed");
                VerificationResult::error(
                    plate.as_str().to_string(),
                    e.to_string(),
                    elapsed_ms(started),
                )
            }
        }
    }

    /// Session-scoped portion: acquire, query under the retry policy,
    /// release. Release happens exactly once on every path, and a close
    /// failure can never replace the query outcome.
    async fn lookup(&self, plate: &PlateToken) -> Result<Category, VerifyError> {
        let session = self.sessions.open(&self.config).await?;
        let outcome = run_with_retry(session.as_ref(), plate, &self.config).await;
        session.close().await;
        outcome
    }
}

/// Retry policy: one re-run, on the same open page, only when the first
/// attempt classifies as the non-committal `otro`. The second result is
/// final whatever it says — at most two attempts per request.
async fn run_with_retry(
    session: &dyn QuerySession,
    plate: &PlateToken,
    config: &VerifierConfig,
) -> Result<Category, VerifyError> {
    let snapshot = session.run_query(plate).await?;
    let category = classify(&snapshot, &config.classifier);
    if category != Category::Otro || config.retry.max_attempts < 2 {
        return Ok(category);
    }

    debug!(
        backoff_ms = config.retry.backoff_ms,
        "ambiguous render — retrying once"
    );
    sleep(config.retry.backoff()).await;

    let snapshot = session.run_query(plate).await?;
    Ok(classify(&snapshot, &config.classifier))
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
