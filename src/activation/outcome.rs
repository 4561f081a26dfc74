use std::fmt;

use serde::{Deserialize, Serialize};

/// What a click on an activator did to the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivationOutcome {
    /// Nothing observable beyond possible DOM changes on the same page
    None,
    /// The document URL changed (different scheme, host or path)
    #[serde(rename = "PAGECHANGE")]
    PageChange { url: String },
    /// A new browsing context was opened (and has been closed again)
    #[serde(rename = "NEWTAB")]
    NewTab { url: String },
    /// A native alert/confirm appeared (and was dismissed)
    Alert,
    /// The element refused the input
    #[serde(rename = "NONINTERACTABLE")]
    NonInteractable,
}

impl ActivationOutcome {
    /// Whether the current page can still be diffed after this click.
    pub fn stays_on_page(&self) -> bool {
        matches!(self, ActivationOutcome::None)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ActivationOutcome::None => "NONE",
            ActivationOutcome::PageChange { .. } => "PAGECHANGE",
            ActivationOutcome::NewTab { .. } => "NEWTAB",
            ActivationOutcome::Alert => "ALERT",
            ActivationOutcome::NonInteractable => "NONINTERACTABLE",
        }
    }
}

impl fmt::Display for ActivationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivationOutcome::PageChange { url } | ActivationOutcome::NewTab { url } => {
                write!(f, "{} ({})", self.label(), url)
            }
            _ => f.write_str(self.label()),
        }
    }
}
