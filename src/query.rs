// SPDX-License-Identifier: MIT
//! One query attempt against the regulator's lookup page.
//!
//! Each step runs under its own budget from [`QueryBudgets`]. Navigation and
//! the result-ready wait absorb their timeouts — partial renders are common
//! on this site and still classifiable — while a missing input field fails
//! the attempt outright.
//!
//! [`QueryBudgets`]: crate::config::QueryBudgets

use crate::config::VerifierConfig;
use crate::error::VerifyError;
use crate::model::PageSnapshot;
use crate::plate::PlateToken;
use chromiumoxide::{Element, Page};
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, trace, warn};

/// Labels that mark the site's submit control, lower-cased.
const SUBMIT_LABELS: &[&str] = &["buscar", "consultar"];

/// Submit-like elements considered when looking for that control.
const SUBMIT_SELECTOR: &str = "button, input[type='submit'], a";

const INPUT_SELECTOR: &str = "input[type='text']";

/// The page's visible text, lower-cased in the page itself so a snapshot
/// never carries mixed case.
const EXTRACT_TEXT_JS: &str = "document.body ? document.body.innerText.toLowerCase() : ''";

/// Run one attempt: navigate, fill, submit, wait for a classifiable render,
/// extract. Re-running this on the same page is exactly what the retry
/// policy does — navigation resets any earlier state.
pub async fn run_attempt(
    page: &Page,
    plate: &PlateToken,
    config: &VerifierConfig,
) -> Result<PageSnapshot, VerifyError> {
    navigate(page, config).await?;

    let field = find_input(page, config).await?;
    field
        .click()
        .await
        .map_err(|e| VerifyError::Submit(format!("could not focus input: {e}")))?;
    field
        .type_str(plate.as_str())
        .await
        .map_err(|e| VerifyError::Submit(format!("could not type plate: {e}")))?;

    submit(page, &field).await?;
    wait_for_result(page, config).await;
    extract(page).await
}

async fn navigate(page: &Page, config: &VerifierConfig) -> Result<(), VerifyError> {
    match timeout(config.budgets.navigation(), page.goto(config.lookup_url.as_str())).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(VerifyError::Navigation(e.to_string())),
        Err(_) => {
            // The base document usually parses long before the site finishes
            // loading assets; work with whatever is there.
            warn!(url = %config.lookup_url, "navigation budget expired — proceeding with partial load");
            Ok(())
        }
    }
}

/// Poll for the first visible text input. The form is the page's whole
/// purpose, so a short budget is enough; expiry fails the attempt.
async fn find_input(page: &Page, config: &VerifierConfig) -> Result<Element, VerifyError> {
    let budget = config.budgets.field();
    let deadline = Instant::now() + budget;
    loop {
        match page.find_element(INPUT_SELECTOR).await {
            Ok(element) => return Ok(element),
            Err(e) => trace!(err = %e, "input field not present yet"),
        }
        if Instant::now() >= deadline {
            return Err(VerifyError::FieldNotFound(budget));
        }
        sleep(config.budgets.poll()).await;
    }
}

/// Submit the form. The site's submit affordance has not been stable across
/// its own revisions, so two strategies: click a "buscar"-style control when
/// one is present and clickable, otherwise send Enter to the focused field.
async fn submit(page: &Page, field: &Element) -> Result<(), VerifyError> {
    if let Some(control) = find_submit_control(page).await {
        match control.click().await {
            Ok(_) => {
                debug!("submitted via search control");
                return Ok(());
            }
            // Hidden or obscured control: fall through to the key event.
            Err(e) => debug!(err = %e, "search control not clickable — falling back to Enter"),
        }
    }

    field
        .press_key("Enter")
        .await
        .map_err(|e| VerifyError::Submit(e.to_string()))?;
    debug!("submitted via Enter");
    Ok(())
}

async fn find_submit_control(page: &Page) -> Option<Element> {
    let elements = page.find_elements(SUBMIT_SELECTOR).await.ok()?;
    for element in elements {
        let mut label = element.inner_text().await.ok().flatten().unwrap_or_default();
        if label.trim().is_empty() {
            // <input type="submit"> carries its label in `value`.
            label = element.attribute("value").await.ok().flatten().unwrap_or_default();
        }
        let label = label.to_lowercase();
        if SUBMIT_LABELS.iter().any(|wanted| label.contains(wanted)) {
            return Some(element);
        }
    }
    None
}

/// Poll the rendered text until it looks classifiable: the service-type
/// section appeared, a no-results phrase appeared, or the page rendered a
/// substantial amount of text. Expiry is not a failure — the classifier
/// gets whatever state exists.
async fn wait_for_result(page: &Page, config: &VerifierConfig) {
    let deadline = Instant::now() + config.budgets.ready();
    loop {
        if let Ok(text) = page_text(page).await {
            if is_result_ready(&text, config) {
                trace!(len = text.len(), "result-ready signal observed");
                return;
            }
        }
        if Instant::now() >= deadline {
            warn!("result-ready budget expired — extracting current state");
            return;
        }
        sleep(config.budgets.poll()).await;
    }
}

fn is_result_ready(text: &str, config: &VerifierConfig) -> bool {
    text.contains(config.classifier.service_marker.as_str())
        || config
            .classifier
            .no_result_markers
            .iter()
            .any(|marker| text.contains(marker.as_str()))
        || text.len() > config.budgets.ready_text_threshold
}

async fn page_text(page: &Page) -> Result<String, VerifyError> {
    page.evaluate(EXTRACT_TEXT_JS)
        .await
        .map_err(|e| VerifyError::Extract(e.to_string()))?
        .into_value()
        .map_err(|e| VerifyError::Extract(e.to_string()))
}

async fn extract(page: &Page) -> Result<PageSnapshot, VerifyError> {
    Ok(PageSnapshot::new(page_text(page).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VerifierConfig;

    #[test]
    fn service_marker_signals_ready() {
        let config = VerifierConfig::for_tests();
        assert!(is_result_ready("tipo de servicio: taxi", &config));
    }

    #[test]
    fn either_no_result_phrase_signals_ready() {
        let config = VerifierConfig::for_tests();
        assert!(is_result_ready("no existen resultados", &config));
        assert!(is_result_ready("no se encontraron resultados", &config));
    }

    #[test]
    fn substantial_text_signals_ready_as_last_resort() {
        let config = VerifierConfig::for_tests();
        let long = "x".repeat(config.budgets.ready_text_threshold + 1);
        assert!(is_result_ready(&long, &config));
    }

    #[test]
    fn sparse_unrecognized_text_keeps_waiting() {
        let config = VerifierConfig::for_tests();
        assert!(!is_result_ready("cargando...", &config));
    }
}
