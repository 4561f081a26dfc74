use std::fmt;

use serde::{Deserialize, Serialize};

use crate::element::handle::Element;

/// Where an `ElementLocator` is in its single analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanPhase {
    Uninitialized,
    /// Initial inventory of target elements
    Scanning,
    /// Activation sweep
    Probing,
    /// Never-displayed records have been pruned
    Finalized,
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanPhase::Uninitialized => "uninitialized",
            ScanPhase::Scanning => "scanning",
            ScanPhase::Probing => "probing",
            ScanPhase::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

/// What the locator knows about one discovered element.
///
/// `displayed_ever` only ever goes from false to true and the first
/// activator that reveals the element is the one that is kept.
#[derive(Debug, Clone)]
pub struct ElementRecord {
    element: Element,
    displayed_from_start: bool,
    displayed_ever: bool,
    activating_element: Option<Element>,
}

impl ElementRecord {
    pub fn new(element: Element, displayed: bool) -> Self {
        Self {
            element,
            displayed_from_start: displayed,
            displayed_ever: displayed,
            activating_element: None,
        }
    }

    /// Record that clicking `activator` made this element visible.
    ///
    /// Returns false when nothing changed: the element was visible from the
    /// start, or an earlier activator already revealed it.
    pub fn mark_revealed_by(&mut self, activator: &Element) -> bool {
        if self.displayed_from_start || self.activating_element.is_some() {
            return false;
        }
        self.activating_element = Some(activator.clone());
        self.displayed_ever = true;
        true
    }

    pub fn element(&self) -> &Element {
        &self.element
    }

    pub fn displayed_from_start(&self) -> bool {
        self.displayed_from_start
    }

    pub fn displayed_ever(&self) -> bool {
        self.displayed_ever
    }

    pub fn activating_element(&self) -> Option<&Element> {
        self.activating_element.as_ref()
    }
}
