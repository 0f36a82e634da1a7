//! Daemon configuration: network binding, lookup target, and the per-step
//! budgets of a query attempt.
//!
//! Every timeout the pipeline uses lives here so tests can shrink them;
//! nothing sleeps on a literal at a call site.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_LOOKUP_URL: &str = "https://apps.mtt.cl/consultaweb";

const DEFAULT_NAVIGATION_MS: u64 = 30_000;
const DEFAULT_FIELD_MS: u64 = 5_000;
const DEFAULT_READY_MS: u64 = 20_000;
const DEFAULT_POLL_MS: u64 = 250;
const DEFAULT_READY_TEXT_THRESHOLD: usize = 1_500;

const DEFAULT_MAX_ATTEMPTS: u32 = 2;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 1_800;

const SERVICE_MARKER: &str = "tipo de servicio";
const NO_RESULT_MARKERS: &[&str] = &["no existen resultados", "no se encontraron resultados"];

fn default_bind_address() -> String {
    // The verdict API is meant to be reachable from outside the host.
    "0.0.0.0".to_string()
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("veripat")
}

// ─── VerifierConfig ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// HTTP port for the verdict API.
    pub port: u16,
    pub bind_address: String,
    /// Fixed lookup URL on the regulator's site.
    pub lookup_url: String,
    /// Root directory scanned for an installed Chromium
    /// (override: `VERIPAT_CACHE_DIR`).
    pub cache_dir: PathBuf,
    pub budgets: QueryBudgets,
    pub retry: RetryPolicy,
    pub classifier: ClassifierConfig,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_address: default_bind_address(),
            lookup_url: DEFAULT_LOOKUP_URL.to_string(),
            cache_dir: default_cache_dir(),
            budgets: QueryBudgets::default(),
            retry: RetryPolicy::default(),
            classifier: ClassifierConfig::default(),
        }
    }
}

impl VerifierConfig {
    /// Defaults with CLI/env overrides applied on top.
    pub fn new(
        port: Option<u16>,
        bind_address: Option<String>,
        cache_dir: Option<PathBuf>,
        lookup_url: Option<String>,
    ) -> Self {
        let mut config = Self::default();
        if let Some(p) = port {
            config.port = p;
        }
        if let Some(b) = bind_address {
            config.bind_address = b;
        }
        if let Some(d) = cache_dir {
            config.cache_dir = d;
        }
        if let Some(u) = lookup_url {
            config.lookup_url = u;
        }
        config
    }

    /// Every budget shrunk so a test suite never sleeps for real.
    pub fn for_tests() -> Self {
        Self {
            budgets: QueryBudgets::for_tests(),
            retry: RetryPolicy::instant(),
            ..Self::default()
        }
    }
}

// ─── QueryBudgets ────────────────────────────────────────────────────────────

/// Per-step timeout budgets for one query attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryBudgets {
    /// Navigation budget. Generous — the target is a slow public site.
    pub navigation_ms: u64,
    /// How long to wait for the first visible text input to appear.
    pub field_ms: u64,
    /// Result-ready polling budget. Expiry is absorbed, not fatal.
    pub ready_ms: u64,
    /// Interval between polls of the rendered text.
    pub poll_ms: u64,
    /// Last-resort ready signal: the rendered text grew past this length.
    pub ready_text_threshold: usize,
}

impl Default for QueryBudgets {
    fn default() -> Self {
        Self {
            navigation_ms: DEFAULT_NAVIGATION_MS,
            field_ms: DEFAULT_FIELD_MS,
            ready_ms: DEFAULT_READY_MS,
            poll_ms: DEFAULT_POLL_MS,
            ready_text_threshold: DEFAULT_READY_TEXT_THRESHOLD,
        }
    }
}

impl QueryBudgets {
    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    pub fn field(&self) -> Duration {
        Duration::from_millis(self.field_ms)
    }

    pub fn ready(&self) -> Duration {
        Duration::from_millis(self.ready_ms)
    }

    pub fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }

    pub fn for_tests() -> Self {
        Self {
            navigation_ms: 10,
            field_ms: 10,
            ready_ms: 10,
            poll_ms: 1,
            ready_text_threshold: 200,
        }
    }
}

// ─── RetryPolicy ─────────────────────────────────────────────────────────────

/// Retry policy for ambiguous renders. Never more than two attempts per
/// request — the second result is final whatever it says.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts per request, including the first. 1 disables the retry.
    pub max_attempts: u32,
    /// Fixed pause before the second attempt.
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    /// Retry still enabled, but with no real waiting (unit tests).
    pub fn instant() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_ms: 1,
        }
    }
}

// ─── ClassifierConfig ────────────────────────────────────────────────────────

/// Knobs for the page-text classifier. These encode the site's exact copy,
/// which is the fragile part of the whole design — keep them adjustable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Require the service-type section label before accepting "colectivo".
    /// The word also shows up in unrelated boilerplate, so the gate is on by
    /// default; turn it off to accept the word anywhere on the page.
    pub require_section_marker: bool,
    /// Literal section label the result table renders on a hit.
    pub service_marker: String,
    /// Known "no results" phrasings. The site has used more than one.
    pub no_result_markers: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            require_section_marker: true,
            service_marker: SERVICE_MARKER.to_string(),
            no_result_markers: NO_RESULT_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }
}
