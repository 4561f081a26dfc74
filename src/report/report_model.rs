use serde::{Deserialize, Serialize};

use crate::browser::driver::BrowserDriver;
use crate::element::handle::Element;
use crate::locator::locator::ElementLocator;
use crate::modal::finder::ModalFinder;

// ============================================================================
// Locator report
// ============================================================================

/// One retained element of a finished locator run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementEntry {
    pub tag: String,
    /// Absolute XPath the element was found at
    pub selector: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
    pub displayed_from_start: bool,
    /// Selector of the activator that revealed it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activator: Option<String>,
}

/// Everything `ElementLocator::analyze` learned about a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocatorReport {
    pub url: String,
    pub final_url: String,
    pub elements: Vec<ElementEntry>,
}

impl LocatorReport {
    pub fn from_locator<D: BrowserDriver>(locator: &ElementLocator<D>) -> Self {
        let elements = locator
            .records()
            .map(|record| ElementEntry {
                tag: record.element().tag_name().to_string(),
                selector: record.element().source().to_string(),
                element_id: record.element().element_id().map(str::to_string),
                displayed_from_start: record.displayed_from_start(),
                activator: record.activating_element().map(|a| a.source().to_string()),
            })
            .collect();
        Self {
            url: locator.activity().url.clone(),
            final_url: locator.final_url().to_string(),
            elements,
        }
    }

    /// Elements that only show up after clicking something.
    pub fn revealed(&self) -> impl Iterator<Item = &ElementEntry> {
        self.elements.iter().filter(|e| !e.displayed_from_start)
    }
}

// ============================================================================
// Modal report
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModalEntry {
    pub activator: String,
    pub activator_tag: String,
    /// Empty when the click opened nothing
    pub modal: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModalReport {
    pub url: String,
    pub probed: usize,
    pub ignored_elements: usize,
    pub modals: Vec<ModalEntry>,
}

impl ModalReport {
    /// Only activators that opened a dialog are listed.
    pub fn from_finder<D: BrowserDriver>(url: &str, finder: &ModalFinder<'_, D>) -> Self {
        let modals = finder
            .modals()
            .iter()
            .filter(|(_, modal)| !modal.is_empty())
            .map(|(activator, modal)| ModalEntry {
                activator: activator.source().to_string(),
                activator_tag: activator.tag_name().to_string(),
                modal: modal.iter().map(|m: &Element| m.source().to_string()).collect(),
            })
            .collect();
        Self {
            url: url.to_string(),
            probed: finder.modals().len(),
            ignored_elements: finder.ignored_count(),
            modals,
        }
    }
}
