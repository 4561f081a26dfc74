use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::activation::classifier::ActivatorClassifier;
use crate::activation::outcome::ActivationOutcome;
use crate::browser::driver::{BrowserDriver, ElementRect, ElementRef};
use crate::error::{ScanError, lost_context};

/// A DOM element with a durable identity.
///
/// The native reference handed out by the driver goes stale on every
/// navigation; `Element` keeps the absolute XPath it was found at and
/// transparently re-locates the node when the cached reference stops
/// working. Equality and hashing only look at that descriptor and the tag,
/// never at the native reference, so two handles for the same node obtained
/// from separate queries compare equal.
pub struct Element {
    source: String,
    tag_name: String,
    markup: String,
    element_id: Option<String>,
    native: RefCell<Option<ElementRef>>,
    cached_attrs: RefCell<Option<Vec<(String, String)>>>,
}

impl Element {
    /// Wrap a freshly found native reference.
    pub fn from_native(
        native: ElementRef,
        driver: &mut dyn BrowserDriver,
    ) -> Result<Element, ScanError> {
        let description = driver
            .describe(&native)
            .map_err(|e| lost_context(e, native.as_str(), "describing a new element"))?;
        let element_id = driver
            .attribute(&native, "id")
            .map_err(|e| lost_context(e, &description.xpath, "reading its id"))?
            .filter(|id| !id.is_empty());

        Ok(Element {
            source: description.xpath,
            tag_name: description.tag_name,
            markup: description.outer_html,
            element_id,
            native: RefCell::new(Some(native)),
            cached_attrs: RefCell::new(None),
        })
    }

    /// Wrap every reference, dropping the ones that vanish while being wrapped.
    pub fn from_native_list(
        natives: Vec<ElementRef>,
        driver: &mut dyn BrowserDriver,
    ) -> Result<Vec<Element>, ScanError> {
        let mut elements = Vec::with_capacity(natives.len());
        for native in natives {
            match Element::from_native(native, driver) {
                Ok(element) => elements.push(element),
                Err(e) if e.is_lost() => {
                    tracing::debug!(error = %e, "element vanished before it could be wrapped");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(elements)
    }

    /// Absolute indexed XPath the element was discovered at.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    /// outerHTML captured when the handle was created.
    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn element_id(&self) -> Option<&str> {
        self.element_id.as_deref()
    }

    /// sha1 of the captured markup.
    pub fn markup_fingerprint(&self) -> String {
        crate::element::safe::fingerprint(&self.markup)
    }

    /// Re-locate the live native element.
    ///
    /// The cached reference is validated with a cheap tag read first; only
    /// when that reports a stale reference is the XPath queried again.
    pub fn resolve(&self, driver: &mut dyn BrowserDriver) -> Result<ElementRef, ScanError> {
        let cached = self.native.borrow().clone();
        if let Some(native) = cached {
            match driver.tag_name(&native) {
                Ok(_) => return Ok(native),
                Err(e) if e.is_lost() => {}
                Err(e) => return Err(e.into()),
            }
        }

        let found = driver
            .find_elements_by_xpath(&self.source)
            .map_err(|e| lost_context(e, &self.source, "re-locating"))?;
        let native = found
            .into_iter()
            .next()
            .ok_or_else(|| ScanError::lost(&self.source, "re-locating"))?;
        *self.native.borrow_mut() = Some(native.clone());
        Ok(native)
    }

    /// Run `operation` against this element; a lost element yields `on_lost()`.
    ///
    /// Anything other than a lost element (session loss, selector bugs)
    /// still propagates.
    pub fn safe_operation<T>(
        &self,
        driver: &mut dyn BrowserDriver,
        operation: impl FnOnce(&Element, &mut dyn BrowserDriver) -> Result<T, ScanError>,
        on_lost: impl FnOnce() -> T,
    ) -> Result<T, ScanError> {
        match operation(self, driver) {
            Ok(value) => Ok(value),
            Err(e) if e.is_lost() => {
                tracing::debug!(element = %self, "element lost during safe operation");
                Ok(on_lost())
            }
            Err(e) => Err(e),
        }
    }

    fn with_native<T>(
        &self,
        driver: &mut dyn BrowserDriver,
        context: &str,
        op: impl FnOnce(&mut dyn BrowserDriver, &ElementRef) -> Result<T, crate::error::BrowserError>,
    ) -> Result<T, ScanError> {
        let native = self.resolve(driver)?;
        op(driver, &native).map_err(|e| lost_context(e, &self.source, context))
    }

    pub fn is_displayed(&self, driver: &mut dyn BrowserDriver) -> Result<bool, ScanError> {
        self.with_native(driver, "checking visibility", |d, n| d.is_displayed(n))
    }

    pub fn is_enabled(&self, driver: &mut dyn BrowserDriver) -> Result<bool, ScanError> {
        self.with_native(driver, "checking enabled state", |d, n| d.is_enabled(n))
    }

    pub fn rect(&self, driver: &mut dyn BrowserDriver) -> Result<ElementRect, ScanError> {
        self.with_native(driver, "reading geometry", |d, n| d.rect(n))
    }

    pub fn text(&self, driver: &mut dyn BrowserDriver) -> Result<String, ScanError> {
        self.with_native(driver, "getting text", |d, n| d.text(n))
    }

    pub fn css_value(
        &self,
        driver: &mut dyn BrowserDriver,
        property: &str,
    ) -> Result<String, ScanError> {
        self.with_native(driver, "reading computed style", |d, n| d.css_value(n, property))
    }

    /// Attribute map, cached after the first read unless `force` is set.
    pub fn attributes(
        &self,
        driver: &mut dyn BrowserDriver,
        force: bool,
    ) -> Result<Vec<(String, String)>, ScanError> {
        if !force {
            if let Some(attrs) = self.cached_attrs.borrow().as_ref() {
                return Ok(attrs.clone());
            }
        }
        let attrs = self.with_native(driver, "reading attributes", |d, n| d.attributes(n))?;
        *self.cached_attrs.borrow_mut() = Some(attrs.clone());
        Ok(attrs)
    }

    pub fn attribute(
        &self,
        driver: &mut dyn BrowserDriver,
        name: &str,
        force: bool,
    ) -> Result<Option<String>, ScanError> {
        Ok(self
            .attributes(driver, force)?
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v))
    }

    /// Elements matching a relative XPath evaluated under this element.
    pub fn find_by_xpath(
        &self,
        driver: &mut dyn BrowserDriver,
        xpath: &str,
    ) -> Result<Vec<Element>, ScanError> {
        let natives = self.with_native(driver, "searching by xpath", |d, n| {
            d.find_child_elements_by_xpath(n, xpath)
        })?;
        Element::from_native_list(natives, driver)
    }

    pub fn parent(&self, driver: &mut dyn BrowserDriver) -> Result<Option<Element>, ScanError> {
        Ok(self.find_by_xpath(driver, "./parent::*")?.into_iter().next())
    }

    /// At least 2x2 pixels, displayed and enabled.
    ///
    /// Lost elements and elements the driver fails to answer for are
    /// invisible; only session loss propagates.
    pub fn is_visible(&self, driver: &mut dyn BrowserDriver) -> Result<bool, ScanError> {
        let visible = self.safe_operation(
            driver,
            |element, driver| {
                let rect = element.rect(driver)?;
                Ok(rect.width > 1.0
                    && rect.height > 1.0
                    && element.is_displayed(driver)?
                    && element.is_enabled(driver)?)
            },
            || false,
        );
        match visible {
            Err(ScanError::Browser(e)) if !e.is_session_fatal() => {
                tracing::debug!(element = %self, error = %e, "visibility check failed");
                Ok(false)
            }
            other => other,
        }
    }

    /// Click and classify what happened, with default settle timings.
    pub fn click(&self, driver: &mut dyn BrowserDriver) -> Result<ActivationOutcome, ScanError> {
        ActivatorClassifier::default().click(self, driver)
    }

    /// Plain native click without classification.
    pub fn raw_click(&self, driver: &mut dyn BrowserDriver) -> Result<(), ScanError> {
        self.with_native(driver, "clicking", |d, n| d.click(n))
    }

    /// Script click that ignores interactability.
    pub fn js_click(&self, driver: &mut dyn BrowserDriver) -> Result<(), ScanError> {
        self.with_native(driver, "script clicking", |d, n| d.js_click(n))
    }
}

impl Clone for Element {
    fn clone(&self) -> Self {
        Element {
            source: self.source.clone(),
            tag_name: self.tag_name.clone(),
            markup: self.markup.clone(),
            element_id: self.element_id.clone(),
            native: RefCell::new(self.native.borrow().clone()),
            cached_attrs: RefCell::new(self.cached_attrs.borrow().clone()),
        }
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.tag_name == other.tag_name
    }
}

impl Eq for Element {}

impl Hash for Element {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
        self.tag_name.hash(state);
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("tag_name", &self.tag_name)
            .field("source", &self.source)
            .field("element_id", &self.element_id)
            .finish()
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}> {}", self.tag_name, self.source)
    }
}
