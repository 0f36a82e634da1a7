//! Plate normalization — raw caller input to a canonical lookup token.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

/// Canonical plate shape: 5–8 uppercase alphanumerics, no separators.
static PLATE_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9]{5,8}$").expect("plate shape pattern"));

/// A normalized, shape-checked plate. Immutable once built; this is the only
/// string the query layer ever types into the lookup form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PlateToken(String);

impl PlateToken {
    /// Normalize arbitrary input: trim, uppercase, strip everything outside
    /// `[A-Z0-9]`, then check the shape.
    ///
    /// On rejection the stripped best-effort value is returned so the caller
    /// can echo it back. Pure — no I/O happens before this check passes.
    pub fn normalize(raw: &str) -> Result<Self, String> {
        let stripped: String = raw
            .trim()
            .to_uppercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();

        if PLATE_SHAPE.is_match(&stripped) {
            Ok(Self(stripped))
        } else {
            Err(stripped)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
