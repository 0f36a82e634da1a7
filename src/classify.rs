// SPDX-License-Identifier: MIT
//! Page-text classification. Pure: snapshot in, category out.
//!
//! The heuristics are coupled to the regulator page's exact copy. When that
//! copy changes, classification degrades to `Otro` rather than raising a
//! structural error — an accepted fragility, which is why everything tunable
//! lives in [`ClassifierConfig`].

use crate::config::ClassifierConfig;
use crate::model::{Category, PageSnapshot};
use once_cell::sync::Lazy;
use regex::Regex;

const COLLECTIVE_MARKER: &str = "colectivo";
const TAXI_MARKER: &str = "taxi";

/// "bus" must match as a whole word: the page's own "Buscar" button would
/// otherwise classify every single render as a bus.
static BUS_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bbus\b").expect("bus word pattern"));

/// Map one snapshot to a category. First match wins; the order is
/// load-bearing because several markers can co-occur on one render.
pub fn classify(snapshot: &PageSnapshot, config: &ClassifierConfig) -> Category {
    let text = snapshot.text();

    let collective = text.contains(COLLECTIVE_MARKER)
        && (!config.require_section_marker || text.contains(config.service_marker.as_str()));
    if collective {
        return Category::Colectivo;
    }

    if config
        .no_result_markers
        .iter()
        .any(|marker| text.contains(marker.as_str()))
    {
        return Category::NoEncontrado;
    }

    if text.contains(TAXI_MARKER) {
        return Category::Taxi;
    }

    if BUS_WORD.is_match(text) {
        return Category::Bus;
    }

    Category::Otro
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(text: &str) -> PageSnapshot {
        PageSnapshot::new(text)
    }

    fn config() -> ClassifierConfig {
        ClassifierConfig::default()
    }

    #[test]
    fn gated_colectivo_is_the_positive_case() {
        assert_eq!(
            classify(&snap("... tipo de servicio: colectivo ..."), &config()),
            Category::Colectivo
        );
    }

    #[test]
    fn colectivo_without_section_marker_stays_ambiguous() {
        // Boilerplate mentioning the word must not count as a hit.
        assert_eq!(
            classify(&snap("red de transporte y colectivos de la región"), &config()),
            Category::Otro
        );
    }

    #[test]
    fn colectivo_beats_no_results_when_both_appear() {
        let text = "tipo de servicio: colectivo — no existen resultados en otras comunas";
        assert_eq!(classify(&snap(text), &config()), Category::Colectivo);
    }

    #[test]
    fn either_no_result_phrasing_is_recognized() {
        assert_eq!(
            classify(
                &snap("no existen resultados para la patente ingresada"),
                &config()
            ),
            Category::NoEncontrado
        );
        assert_eq!(
            classify(&snap("no se encontraron resultados"), &config()),
            Category::NoEncontrado
        );
    }

    #[test]
    fn taxi_is_informative_not_positive() {
        assert_eq!(
            classify(&snap("tipo de servicio: taxi básico"), &config()),
            Category::Taxi
        );
    }

    #[test]
    fn bus_matches_on_word_boundary_only() {
        assert_eq!(
            classify(&snap("recorridos de bus interurbano"), &config()),
            Category::Bus
        );
        // "buscar" contains the substring but is not the word.
        assert_eq!(
            classify(&snap("ingrese la patente y presione buscar"), &config()),
            Category::Otro
        );
    }

    #[test]
    fn unrecognized_text_is_otro() {
        assert_eq!(classify(&snap("cargando..."), &config()), Category::Otro);
        assert_eq!(classify(&snap(""), &config()), Category::Otro);
    }

    #[test]
    fn gate_off_accepts_the_word_anywhere() {
        let relaxed = ClassifierConfig {
            require_section_marker: false,
            ..ClassifierConfig::default()
        };
        assert_eq!(
            classify(&snap("línea de colectivo 18"), &relaxed),
            Category::Colectivo
        );
    }

    #[test]
    fn extended_no_result_list_is_honored() {
        let mut config = ClassifierConfig::default();
        config
            .no_result_markers
            .push("sin coincidencias".to_string());
        assert_eq!(
            classify(&snap("sin coincidencias para su consulta"), &config),
            Category::NoEncontrado
        );
    }

    #[test]
    fn classification_is_idempotent() {
        let snapshot = snap("tipo de servicio: colectivo");
        let first = classify(&snapshot, &config());
        let second = classify(&snapshot, &config());
        assert_eq!(first, second);
    }

    #[test]
    fn snapshot_case_never_matters() {
        assert_eq!(
            classify(&snap("TIPO DE SERVICIO: COLECTIVO"), &config()),
            Category::Colectivo
        );
    }
}
