// SPDX-License-Identifier: MIT
//! Typed failure taxonomy for the verification pipeline.
//!
//! Nothing here ever crosses the HTTP boundary as a transport error: the
//! pipeline catches every variant and folds it into the verdict body.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerifyError {
    /// No usable Chrome/Chromium executable could be resolved. This is a
    /// deployment defect, not a transient site issue, and is kept distinct
    /// from the scraping failures below.
    #[error("browser runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    /// The browser process could not be started or refused the CDP session.
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("navigation to the lookup page failed: {0}")]
    Navigation(String),

    /// No visible text input appeared within the field budget.
    #[error("no text input found on the lookup page after {0:?}")]
    FieldNotFound(Duration),

    #[error("form submission failed: {0}")]
    Submit(String),

    #[error("page text extraction failed: {0}")]
    Extract(String),
}
