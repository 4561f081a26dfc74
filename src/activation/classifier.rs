use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::activation::outcome::ActivationOutcome;
use crate::browser::driver::BrowserDriver;
use crate::element::handle::Element;
use crate::error::ScanError;

pub const DEFAULT_CLICK_SETTLE: Duration = Duration::from_millis(500);

/// Fixed wait for asynchronous rendering. Zero skips the sleep.
pub fn settle(delay: Duration) {
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
}

/// Same scheme, host, port and path. Query and fragment are ignored.
pub fn is_same_page(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => {
            a.scheme() == b.scheme()
                && a.host_str() == b.host_str()
                && a.port_or_known_default() == b.port_or_known_default()
                && a.path() == b.path()
        }
        _ => strip_fragment(a) == strip_fragment(b),
    }
}

fn strip_fragment(url: &str) -> &str {
    url.split('#').next().unwrap_or(url)
}

/// Clicks an element and reports what the click did, leaving the browser
/// on the page it started from.
///
/// Extra tabs are closed, alerts dismissed, and a page change is undone by
/// navigating back to the pre-click URL. When several effects happen at
/// once the outcome is PAGECHANGE over NEWTAB over ALERT.
#[derive(Debug, Clone)]
pub struct ActivatorClassifier {
    pub click_settle: Duration,
}

impl Default for ActivatorClassifier {
    fn default() -> Self {
        Self {
            click_settle: DEFAULT_CLICK_SETTLE,
        }
    }
}

impl ActivatorClassifier {
    pub fn new(click_settle: Duration) -> Self {
        Self { click_settle }
    }

    /// A lost element surfaces as `Err(ScanError::ElementLost)`.
    pub fn click(
        &self,
        element: &Element,
        driver: &mut dyn BrowserDriver,
    ) -> Result<ActivationOutcome, ScanError> {
        let prev_url = driver.current_url()?;
        let windows_before = driver.window_handles()?;
        driver.suppress_print_dialogs()?;

        match element.raw_click(driver) {
            Ok(()) => {}
            Err(ScanError::Browser(e)) if e.is_not_interactable() => {
                debug!(element = %element, "click refused");
                return Ok(ActivationOutcome::NonInteractable);
            }
            Err(e) => return Err(e),
        }
        settle(self.click_settle);

        let mut outcome = ActivationOutcome::None;

        if driver.dismiss_alert()? {
            outcome = ActivationOutcome::Alert;
        }

        if let Some(url) = close_new_windows(driver, &windows_before)? {
            outcome = ActivationOutcome::NewTab { url };
        }

        let current_url = driver.current_url()?;
        if current_url != prev_url && !is_same_page(&current_url, &prev_url) {
            outcome = ActivationOutcome::PageChange { url: current_url };
            driver.navigate(&prev_url)?;
            settle(self.click_settle);
        }

        debug!(element = %element, %outcome, "classified click");
        Ok(outcome)
    }
}

/// Close every window that was not open before the click and return to the
/// original one. Returns the URL of the first new window.
fn close_new_windows(
    driver: &mut dyn BrowserDriver,
    before: &[String],
) -> Result<Option<String>, ScanError> {
    let after = driver.window_handles()?;
    let mut first_url = None;
    let mut closed_any = false;
    for handle in after.iter().filter(|h| !before.contains(h)) {
        driver.switch_to_window(handle)?;
        let url = driver.current_url()?;
        driver.close_window()?;
        closed_any = true;
        if first_url.is_none() {
            first_url = Some(url);
        }
    }
    if closed_any {
        if let Some(main) = before.first() {
            driver.switch_to_window(main)?;
        }
    }
    Ok(first_url)
}
