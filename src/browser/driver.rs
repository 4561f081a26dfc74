use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::BrowserError;

/// Opaque driver-native element reference.
///
/// Only valid until the next navigation or DOM replacement; keep an
/// `Element` around instead of holding on to one of these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef(pub String);

impl ElementRef {
    pub fn new(id: impl Into<String>) -> Self {
        ElementRef(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Element geometry in CSS pixels, relative to the document origin.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ElementRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }
}

/// Everything needed to build a durable `Element` from a native reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDescription {
    /// Lower-case tag name
    pub tag_name: String,
    /// Absolute indexed XPath, e.g. `/html[1]/body[1]/div[2]`
    pub xpath: String,
    /// outerHTML at description time
    pub outer_html: String,
}

/// The browser automation boundary the locator is written against.
///
/// All calls are blocking round-trips against a single session. A lost
/// element must be reported as `StaleElement`/`NoSuchElement` and a refused
/// click as `NotInteractable`/`ClickIntercepted` so callers can tell those
/// expected conditions apart from session loss.
pub trait BrowserDriver {
    fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    fn current_url(&mut self) -> Result<String, BrowserError>;

    fn find_elements_by_tag(&mut self, tag: &str) -> Result<Vec<ElementRef>, BrowserError>;

    /// Document-level XPath query.
    fn find_elements_by_xpath(&mut self, xpath: &str) -> Result<Vec<ElementRef>, BrowserError>;

    /// XPath query evaluated with `parent` as the context node.
    fn find_child_elements_by_xpath(
        &mut self,
        parent: &ElementRef,
        xpath: &str,
    ) -> Result<Vec<ElementRef>, BrowserError>;

    fn describe(&mut self, element: &ElementRef) -> Result<ElementDescription, BrowserError>;

    fn tag_name(&mut self, element: &ElementRef) -> Result<String, BrowserError>;

    fn is_displayed(&mut self, element: &ElementRef) -> Result<bool, BrowserError>;

    fn is_enabled(&mut self, element: &ElementRef) -> Result<bool, BrowserError>;

    fn attribute(&mut self, element: &ElementRef, name: &str)
    -> Result<Option<String>, BrowserError>;

    /// All attributes of the element as name/value pairs, in markup order.
    fn attributes(&mut self, element: &ElementRef) -> Result<Vec<(String, String)>, BrowserError>;

    fn text(&mut self, element: &ElementRef) -> Result<String, BrowserError>;

    fn rect(&mut self, element: &ElementRef) -> Result<ElementRect, BrowserError>;

    /// Computed style value, e.g. `css_value(el, "position") == "fixed"`.
    fn css_value(&mut self, element: &ElementRef, property: &str) -> Result<String, BrowserError>;

    /// Native (pointer) click.
    fn click(&mut self, element: &ElementRef) -> Result<(), BrowserError>;

    /// Script-dispatched click that bypasses interactability checks.
    fn js_click(&mut self, element: &ElementRef) -> Result<(), BrowserError>;

    /// Neutralise `window.print` so print buttons cannot block the session.
    fn suppress_print_dialogs(&mut self) -> Result<(), BrowserError>;

    /// Dismiss an open alert/confirm. `Ok(false)` when none was open.
    fn dismiss_alert(&mut self) -> Result<bool, BrowserError>;

    fn window_handles(&mut self) -> Result<Vec<String>, BrowserError>;

    fn switch_to_window(&mut self, handle: &str) -> Result<(), BrowserError>;

    /// Close the current window.
    fn close_window(&mut self) -> Result<(), BrowserError>;

    fn set_window_size(&mut self, width: u32, height: u32) -> Result<(), BrowserError>;
}
