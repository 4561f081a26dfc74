use sha1::{Digest, Sha1};
use tracing::warn;

use crate::browser::driver::BrowserDriver;
use crate::element::handle::Element;
use crate::error::ScanError;

/// Apply `operation` to every element in order.
///
/// A lost element is logged and skipped; it never aborts the batch. Any
/// other error (session loss, selector bug) stops the loop and propagates.
/// Returns the results of the elements that were still alive.
pub fn batch_for_each<T>(
    elements: &[Element],
    driver: &mut dyn BrowserDriver,
    mut operation: impl FnMut(&Element, &mut dyn BrowserDriver) -> Result<T, ScanError>,
) -> Result<Vec<T>, ScanError> {
    let mut results = Vec::with_capacity(elements.len());
    for element in elements {
        match operation(element, driver) {
            Ok(value) => results.push(value),
            Err(e) if e.is_lost() => warn!(element = %element, "element lost, skipping"),
            Err(e) => return Err(e),
        }
    }
    Ok(results)
}

/// Like `batch_for_each`, but drops lost elements from `elements` in place.
pub fn retain_live(
    elements: &mut Vec<Element>,
    driver: &mut dyn BrowserDriver,
    mut operation: impl FnMut(&Element, &mut dyn BrowserDriver) -> Result<(), ScanError>,
) -> Result<(), ScanError> {
    let mut index = 0;
    while index < elements.len() {
        match operation(&elements[index], driver) {
            Ok(()) => index += 1,
            Err(e) if e.is_lost() => {
                let lost = elements.remove(index);
                warn!(element = %lost, "element lost, dropping");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Keep only the elements for which `predicate` holds; lost elements are dropped.
pub fn filter_live(
    elements: Vec<Element>,
    driver: &mut dyn BrowserDriver,
    mut predicate: impl FnMut(&Element, &mut dyn BrowserDriver) -> Result<bool, ScanError>,
) -> Result<Vec<Element>, ScanError> {
    let mut kept = Vec::with_capacity(elements.len());
    for element in elements {
        if element.safe_operation(driver, &mut predicate, || false)? {
            kept.push(element);
        }
    }
    Ok(kept)
}

pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
