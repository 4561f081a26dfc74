use serde::{Deserialize, Serialize};

use crate::browser::driver::{BrowserDriver, ElementRect};
use crate::element::handle::Element;
use crate::error::ScanError;

/// Minimum size for a clickable to be worth probing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClickableBounds {
    pub min_width: f64,
    pub min_height: f64,
}

impl Default for ClickableBounds {
    fn default() -> Self {
        Self {
            min_width: 20.0,
            min_height: 5.0,
        }
    }
}

impl ClickableBounds {
    pub fn admits(&self, rect: &ElementRect) -> bool {
        rect.width > self.min_width && rect.height > self.min_height
    }
}

/// Geometry of something that looks like a dialog rather than a banner or toast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DialogBounds {
    /// Offset from the viewport origin required on at least one axis
    pub min_offset: f64,
    pub min_width: f64,
    pub min_height: f64,
}

impl Default for DialogBounds {
    fn default() -> Self {
        Self {
            min_offset: 10.0,
            min_width: 70.0,
            min_height: 70.0,
        }
    }
}

impl DialogBounds {
    pub fn position_like_modal_dialog(&self, rect: &ElementRect) -> bool {
        (rect.x > self.min_offset || rect.y > self.min_offset)
            && rect.width > self.min_width
            && rect.height > self.min_height
    }
}

/// Computed style values that decide whether a div is a backdrop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackdropStyle {
    pub position: String,
    pub top: String,
    pub right: String,
    pub bottom: String,
    pub left: String,
}

impl BackdropStyle {
    pub fn read(element: &Element, driver: &mut dyn BrowserDriver) -> Result<Self, ScanError> {
        Ok(Self {
            position: element.css_value(driver, "position")?,
            top: element.css_value(driver, "top")?,
            right: element.css_value(driver, "right")?,
            bottom: element.css_value(driver, "bottom")?,
            left: element.css_value(driver, "left")?,
        })
    }

    /// Fixed and pinned to all four edges with exactly `0px`.
    ///
    /// Overlays built with percentages or the `inset` shorthand are not
    /// recognised.
    pub fn is_backdrop(&self) -> bool {
        self.position == "fixed"
            && [&self.top, &self.right, &self.bottom, &self.left]
                .iter()
                .all(|v| v.as_str() == "0px")
    }
}

/// Whether `markup` mentions any of the stop words.
pub fn has_stop_word(markup: &str, stop_words: &[String]) -> bool {
    stop_words.iter().any(|word| markup.contains(word.as_str()))
}
