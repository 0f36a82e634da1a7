// SPDX-License-Identifier: MIT
//! Data model: outcome categories, page snapshots, and the wire verdict.

use crate::plate::PlateToken;
use serde::{Deserialize, Serialize};

/// Closed set of verification outcomes. Wire names are the Spanish
/// kebab-case values the API has always spoken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Input failed the plate shape check; nothing was looked up.
    Invalida,
    /// The page confirmed a collective-taxi service. The only positive.
    Colectivo,
    /// The page mentions a taxi service — informative, not a match.
    Taxi,
    /// The page mentions a bus service — informative, not a match.
    Bus,
    /// The render was not classifiable either way.
    Otro,
    /// The site explicitly reported no results for the plate.
    NoEncontrado,
    /// Something broke inside the pipeline; see `detalle`.
    Error,
}

impl Category {
    /// Whether callers should treat this outcome as a positive match.
    pub fn is_match(self) -> bool {
        matches!(self, Category::Colectivo)
    }
}

/// Lower-cased visible text of the result page at one point in time.
///
/// Produced once per query attempt, consumed immediately by the classifier,
/// then discarded — never stored or sent anywhere.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    text: String,
}

impl PageSnapshot {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into().to_lowercase(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Terminal artifact of one verification — serializes directly as the HTTP
/// response body. No mutation after construction.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationResult {
    pub ok: bool,
    #[serde(rename = "tipo")]
    pub category: Category,
    /// Normalized token, or the best-effort stripped input on early
    /// rejection.
    #[serde(rename = "patente")]
    pub plate: String,
    #[serde(rename = "ms")]
    pub elapsed_ms: u64,
    #[serde(rename = "detalle", skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl VerificationResult {
    /// Rejected before any I/O.
    pub fn invalid(echo: String, elapsed_ms: u64) -> Self {
        Self {
            ok: false,
            category: Category::Invalida,
            plate: echo,
            elapsed_ms,
            detail: None,
        }
    }

    /// A classified render. `ok` is derived from the category here so the
    /// "positive iff colectivo" invariant cannot drift.
    pub fn classified(plate: &PlateToken, category: Category, elapsed_ms: u64) -> Self {
        Self {
            ok: category.is_match(),
            category,
            plate: plate.as_str().to_string(),
            elapsed_ms,
            detail: None,
        }
    }

    /// A pipeline failure, folded into the body instead of the transport.
    pub fn error(plate: String, detail: String, elapsed_ms: u64) -> Self {
        Self {
            ok: false,
            category: Category::Error,
            plate,
            elapsed_ms,
            detail: Some(detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_wire_names_are_spanish_kebab_case() {
        assert_eq!(
            serde_json::to_string(&Category::NoEncontrado).unwrap(),
            "\"no-encontrado\""
        );
        assert_eq!(
            serde_json::to_string(&Category::Invalida).unwrap(),
            "\"invalida\""
        );
        assert_eq!(
            serde_json::to_string(&Category::Colectivo).unwrap(),
            "\"colectivo\""
        );
    }

    #[test]
    fn only_colectivo_is_positive() {
        for category in [
            Category::Invalida,
            Category::Taxi,
            Category::Bus,
            Category::Otro,
            Category::NoEncontrado,
            Category::Error,
        ] {
            assert!(!category.is_match(), "{category:?} must not be a match");
        }
        assert!(Category::Colectivo.is_match());
    }

    #[test]
    fn classified_derives_ok_from_category() {
        let plate = PlateToken::normalize("AB123").unwrap();
        assert!(VerificationResult::classified(&plate, Category::Colectivo, 1).ok);
        assert!(!VerificationResult::classified(&plate, Category::Taxi, 1).ok);
    }

    #[test]
    fn verdict_serializes_with_wire_field_names() {
        let plate = PlateToken::normalize("AB123").unwrap();
        let body =
            serde_json::to_string(&VerificationResult::classified(&plate, Category::Taxi, 42))
                .unwrap();
        assert!(body.contains("\"tipo\":\"taxi\""));
        assert!(body.contains("\"patente\":\"AB123\""));
        assert!(body.contains("\"ms\":42"));
        // detalle is omitted entirely when absent.
        assert!(!body.contains("detalle"));
    }

    #[test]
    fn snapshot_lowercases_on_construction() {
        assert_eq!(
            PageSnapshot::new("Tipo de Servicio: COLECTIVO").text(),
            "tipo de servicio: colectivo"
        );
    }
}
