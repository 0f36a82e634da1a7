// SPDX-License-Identifier: MIT
//! Browser runtime location — deciding which Chromium binary to drive.
//!
//! Resolution is a ranked list of strategies, first success wins:
//!   1. whatever chromiumoxide itself detects (system installs, `CHROME`
//!      env override),
//!   2. a PATH probe over the usual binary names,
//!   3. a scan of the configured cache directory for a platform-tagged
//!      managed install (`chrome/<platform>-<version>/...`),
//!   4. (cargo feature `fetcher`) downloading a pinned build into the cache.
//!
//! A miss is a deployment defect and surfaces as
//! [`VerifyError::RuntimeUnavailable`], kept distinct from scraping failures.

use crate::error::VerifyError;
use chromiumoxide::detection::{default_executable, DetectionOptions};
use std::path::{Path, PathBuf};
use tracing::debug;
#[cfg(feature = "fetcher")]
use tracing::warn;

/// Chromium binaries probed on PATH, in preference order.
const CANDIDATE_BROWSERS: &[&str] = &["chromium", "chromium-browser", "google-chrome", "chrome"];

/// One way of finding a runnable browser binary. Strategies are cheap,
/// synchronous filesystem probes; anything that needs the network sits
/// behind the `fetcher` feature instead.
pub trait RuntimeStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn resolve(&self) -> Option<PathBuf>;
}

pub struct ChromeLocator {
    strategies: Vec<Box<dyn RuntimeStrategy>>,
    #[cfg(feature = "fetcher")]
    fetch_root: PathBuf,
}

impl ChromeLocator {
    /// The production strategy ranking, scanning `cache_dir` for installs.
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            strategies: vec![
                Box::new(BundledDetection),
                Box::new(PathProbe),
                Box::new(CacheDirScan::new(cache_dir)),
            ],
            #[cfg(feature = "fetcher")]
            fetch_root: cache_dir.to_path_buf(),
        }
    }

    /// A locator with an explicit strategy list (tests inject fakes here).
    pub fn with_strategies(strategies: Vec<Box<dyn RuntimeStrategy>>) -> Self {
        Self {
            strategies,
            #[cfg(feature = "fetcher")]
            fetch_root: std::env::temp_dir(),
        }
    }

    /// Resolve the executable to drive, or report the deployment defect.
    pub async fn resolve(&self) -> Result<PathBuf, VerifyError> {
        for strategy in &self.strategies {
            if let Some(path) = strategy.resolve() {
                debug!(
                    strategy = strategy.name(),
                    path = %path.display(),
                    "browser runtime resolved"
                );
                return Ok(path);
            }
            debug!(strategy = strategy.name(), "no candidate");
        }

        #[cfg(feature = "fetcher")]
        match self.fetch().await {
            Ok(path) => return Ok(path),
            Err(e) => warn!(err = %e, "browser fetch failed"),
        }

        let tried: Vec<&str> = self.strategies.iter().map(|s| s.name()).collect();
        Err(VerifyError::RuntimeUnavailable(format!(
            "no Chrome/Chromium executable found (strategies tried: {}). \
             Install Chromium or point VERIPAT_CACHE_DIR at a browser cache.",
            tried.join(", ")
        )))
    }

    #[cfg(feature = "fetcher")]
    async fn fetch(&self) -> Result<PathBuf, String> {
        use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};

        tokio::fs::create_dir_all(&self.fetch_root)
            .await
            .map_err(|e| e.to_string())?;
        let options = BrowserFetcherOptions::builder()
            .with_path(&self.fetch_root)
            .build()
            .map_err(|e| e.to_string())?;
        let fetcher = BrowserFetcher::new(options);
        let info = fetcher.fetch().await.map_err(|e| e.to_string())?;
        Ok(info.executable_path)
    }
}

// ─── Strategies ──────────────────────────────────────────────────────────────

/// Strategy 1 — whatever the automation library can already see.
pub struct BundledDetection;

impl RuntimeStrategy for BundledDetection {
    fn name(&self) -> &'static str {
        "bundled-detection"
    }

    fn resolve(&self) -> Option<PathBuf> {
        default_executable(DetectionOptions::default()).ok()
    }
}

/// Strategy 2 — walk PATH for the usual binary names.
pub struct PathProbe;

impl RuntimeStrategy for PathProbe {
    fn name(&self) -> &'static str {
        "path-probe"
    }

    fn resolve(&self) -> Option<PathBuf> {
        let path_var = std::env::var_os("PATH")?;
        for candidate in CANDIDATE_BROWSERS {
            for dir in std::env::split_paths(&path_var) {
                let full = dir.join(candidate);
                if is_executable(&full) {
                    return Some(full);
                }
            }
        }
        None
    }
}

/// Strategy 3 — scan a managed-install cache directory.
///
/// Layout: `<root>/chrome/<platform>-<version>/<platform dir>/<binary>`,
/// e.g. `~/.cache/veripat/chrome/linux-127.0.6533.88/chrome-linux64/chrome`.
/// Candidates must actually be executable before they are accepted.
pub struct CacheDirScan {
    root: PathBuf,
}

impl CacheDirScan {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }
}

impl RuntimeStrategy for CacheDirScan {
    fn name(&self) -> &'static str {
        "cache-dir-scan"
    }

    fn resolve(&self) -> Option<PathBuf> {
        let chrome_root = self.root.join("chrome");
        let entries = std::fs::read_dir(&chrome_root).ok()?;
        let (tag, subpaths) = platform_layout();

        let mut versions: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(tag))
            .map(|entry| entry.path())
            .collect();
        // Highest version wins when several builds are installed.
        versions.sort();

        for dir in versions.into_iter().rev() {
            for subpath in subpaths {
                let candidate = dir.join(subpath);
                if is_executable(&candidate) {
                    return Some(candidate);
                }
            }
        }
        None
    }
}

#[cfg(target_os = "linux")]
fn platform_layout() -> (&'static str, &'static [&'static str]) {
    ("linux", &["chrome-linux64/chrome"])
}

#[cfg(target_os = "macos")]
fn platform_layout() -> (&'static str, &'static [&'static str]) {
    (
        "mac",
        &[
            "chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing",
            "chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing",
        ],
    )
}

#[cfg(target_os = "windows")]
fn platform_layout() -> (&'static str, &'static [&'static str]) {
    ("win64", &["chrome-win64/chrome.exe"])
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn platform_layout() -> (&'static str, &'static [&'static str]) {
    ("", &[])
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
