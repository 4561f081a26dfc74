use std::time::Duration;

use tracing::{debug, info, warn};

use crate::activation::classifier::{ActivatorClassifier, DEFAULT_CLICK_SETTLE, settle};
use crate::activation::outcome::ActivationOutcome;
use crate::activity::Activity;
use crate::browser::driver::BrowserDriver;
use crate::element::handle::Element;
use crate::error::ScanError;
use crate::locator::record::{ElementRecord, ScanPhase};
use crate::progress::{ProgressCallback, ProgressReport};

/// Tags probed as activators during the sweep.
pub const POTENTIAL_ACTIVATORS: [&str; 4] = ["a", "button", "input", "div"];

/// Tags returned by `get_activatable_elements(None)`.
pub const DEFAULT_TARGET_ELEMENTS: [&str; 6] = ["a", "button", "input", "img", "div", "select"];

// ============================================================================
// Configuration
// ============================================================================

/// Timings and tag sets for one locator.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatorConfig {
    /// Wait after the first page load, for client-side routing and the like
    pub initial_settle: Duration,
    /// Wait after every reset to the final URL
    pub probe_settle: Duration,
    /// Wait between a click and classifying its effect
    pub click_settle: Duration,
    pub potential_activators: Vec<String>,
    pub default_target_elements: Vec<String>,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            initial_settle: Duration::from_secs(5),
            probe_settle: Duration::from_millis(500),
            click_settle: DEFAULT_CLICK_SETTLE,
            potential_activators: POTENTIAL_ACTIVATORS.iter().map(|t| t.to_string()).collect(),
            default_target_elements: DEFAULT_TARGET_ELEMENTS
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

impl LocatorConfig {
    /// Same tag sets, no sleeping. For pages that render synchronously.
    pub fn without_delays(mut self) -> Self {
        self.initial_settle = Duration::ZERO;
        self.probe_settle = Duration::ZERO;
        self.click_settle = Duration::ZERO;
        self
    }
}

// ============================================================================
// Stateless live-DOM queries
// ============================================================================

/// Every element of the given tags on the current page, in tag order then DOM order.
pub fn get_all_of_type(
    driver: &mut dyn BrowserDriver,
    element_types: &[&str],
) -> Result<Vec<Element>, ScanError> {
    let mut elements = Vec::new();
    for tag in element_types {
        let natives = driver.find_elements_by_tag(tag)?;
        elements.extend(Element::from_native_list(natives, driver)?);
    }
    Ok(elements)
}

/// Every element matching a document-level XPath on the current page.
pub fn get_all_by_xpath(
    driver: &mut dyn BrowserDriver,
    xpath: &str,
) -> Result<Vec<Element>, ScanError> {
    let natives = driver.find_elements_by_xpath(xpath)?;
    Element::from_native_list(natives, driver)
}

/// Lost elements and non-fatal driver hiccups are logged; everything else propagates.
fn tolerate(err: ScanError, what: &str) -> Result<(), ScanError> {
    match &err {
        ScanError::ElementLost { .. } => {
            warn!(error = %err, "element lost while {}", what);
            Ok(())
        }
        ScanError::Browser(e) if !e.is_session_fatal() => {
            warn!(error = %err, "browser error while {}", what);
            Ok(())
        }
        _ => Err(err),
    }
}

// ============================================================================
// ElementLocator
// ============================================================================

/// Per-page registry of elements and of the activators that reveal them.
///
/// `analyze` runs once: it loads the page, records which target elements
/// are visible, clicks every potential activator (resetting the page after
/// each one) to find out which hidden elements each of them reveals, and
/// finally drops elements that never became visible. Construct a new
/// locator for every page.
pub struct ElementLocator<D: BrowserDriver> {
    driver: D,
    activity: Activity,
    target_elements: Vec<String>,
    config: LocatorConfig,
    classifier: ActivatorClassifier,
    final_url: String,
    known_elements: Vec<(String, Vec<ElementRecord>)>,
    unreachable: Vec<ElementRecord>,
    phase: ScanPhase,
}

impl<D: BrowserDriver> ElementLocator<D> {
    pub fn new(driver: D, activity: Activity, target_elements: &[&str]) -> Self {
        Self::with_config(driver, activity, target_elements, LocatorConfig::default())
    }

    pub fn with_config(
        driver: D,
        activity: Activity,
        target_elements: &[&str],
        config: LocatorConfig,
    ) -> Self {
        let mut targets: Vec<String> = Vec::new();
        for tag in target_elements {
            let tag = tag.to_lowercase();
            if !targets.contains(&tag) {
                targets.push(tag);
            }
        }
        let final_url = activity.url.clone();
        Self {
            driver,
            activity,
            target_elements: targets,
            classifier: ActivatorClassifier::new(config.click_settle),
            config,
            final_url,
            known_elements: Vec::new(),
            unreachable: Vec::new(),
            phase: ScanPhase::Uninitialized,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    /// URL after redirects, as observed once the page settled.
    pub fn final_url(&self) -> &str {
        &self.final_url
    }

    pub fn target_elements(&self) -> &[String] {
        &self.target_elements
    }

    /// Build the inventory and, unless `fake`, run the activation sweep.
    pub fn analyze(
        &mut self,
        fake: bool,
        mut progress: Option<ProgressCallback<'_>>,
    ) -> Result<(), ScanError> {
        if self.phase != ScanPhase::Uninitialized {
            return Err(ScanError::AlreadyAnalyzed {
                phase: self.phase.to_string(),
            });
        }
        self.phase = ScanPhase::Scanning;
        info!(url = %self.activity.url, fake, "running activator check");

        self.activity.get(&mut self.driver)?;
        settle(self.config.initial_settle);
        self.final_url = self.driver.current_url()?;

        let activators = self.collect_activators()?;
        self.initial_scan(&mut progress)?;

        if !fake && !self.target_elements.is_empty() {
            self.phase = ScanPhase::Probing;
            self.activation_sweep(&activators)?;
        }

        self.prune();
        self.phase = ScanPhase::Finalized;
        Ok(())
    }

    fn collect_activators(&mut self) -> Result<Vec<Element>, ScanError> {
        let mut activators = Vec::new();
        for tag in self.config.potential_activators.clone() {
            let natives = self.driver.find_elements_by_tag(&tag)?;
            for native in natives {
                match Element::from_native(native, &mut self.driver) {
                    Ok(element) => activators.push(element),
                    Err(e) => tolerate(e, "collecting activators")?,
                }
            }
        }
        debug!(count = activators.len(), "collected potential activators");
        Ok(activators)
    }

    fn initial_scan(&mut self, progress: &mut Option<ProgressCallback<'_>>) -> Result<(), ScanError> {
        for tag in self.target_elements.clone() {
            let natives = self.driver.find_elements_by_tag(&tag)?;
            if let Some(callback) = progress.as_mut() {
                callback(&ProgressReport::status(format!(
                    "Element locator adding {} <{}> elements",
                    natives.len(),
                    tag
                )));
            }

            let mut records = Vec::with_capacity(natives.len());
            for native in natives {
                let scanned = Element::from_native(native, &mut self.driver).and_then(|element| {
                    let displayed = element.is_displayed(&mut self.driver)?;
                    Ok(ElementRecord::new(element, displayed))
                });
                match scanned {
                    Ok(record) => records.push(record),
                    Err(e) => tolerate(e, "adding to the inventory")?,
                }
            }
            debug!(tag = %tag, count = records.len(), "initial scan");

            match self.known_elements.iter_mut().find(|(t, _)| *t == tag) {
                Some((_, existing)) => existing.extend(records),
                None => self.known_elements.push((tag, records)),
            }
        }
        info!(
            tags = self.known_elements.len(),
            elements = self.records().count(),
            "initial scan complete"
        );
        Ok(())
    }

    fn activation_sweep(&mut self, activators: &[Element]) -> Result<(), ScanError> {
        let total = activators.len();
        for (index, activator) in activators.iter().enumerate() {
            debug!(activator = %activator, "testing activator {}/{}", index + 1, total);
            match self.classifier.click(activator, &mut self.driver) {
                Ok(ActivationOutcome::None) => self.update_state_diff(activator)?,
                Ok(outcome) => debug!(activator = %activator, %outcome, "no diff for this probe"),
                Err(e) => tolerate(e, "clicking an activator")?,
            }
            if let Err(e) = self.driver.navigate(&self.final_url) {
                tolerate(e.into(), "resetting the page")?;
            }
            settle(self.config.probe_settle);
        }
        Ok(())
    }

    /// Attribute every newly visible record to `activator`. New elements are ignored.
    fn update_state_diff(&mut self, activator: &Element) -> Result<(), ScanError> {
        let mut appeared = 0;
        for (_, records) in self.known_elements.iter_mut() {
            for record in records.iter_mut() {
                if record.displayed_from_start() {
                    continue;
                }
                match record.element().is_displayed(&mut self.driver) {
                    Ok(true) => {
                        if record.mark_revealed_by(activator) {
                            appeared += 1;
                        }
                    }
                    Ok(false) => {}
                    Err(e) => tolerate(e, "diffing visibility")?,
                }
            }
        }
        if appeared > 0 {
            info!(activator = %activator, appeared, "elements appeared");
        }
        Ok(())
    }

    fn prune(&mut self) {
        for (_, records) in self.known_elements.iter_mut() {
            let (kept, dropped): (Vec<_>, Vec<_>) =
                std::mem::take(records).into_iter().partition(|r| r.displayed_ever());
            *records = kept;
            self.unreachable.extend(dropped);
        }
        debug!(pruned = self.unreachable.len(), "pruned never-displayed elements");
    }

    /// Retained records, in scan order.
    pub fn records(&self) -> impl Iterator<Item = &ElementRecord> {
        self.known_elements.iter().flat_map(|(_, records)| records.iter())
    }

    fn record_for(&self, element: &Element) -> Option<&ElementRecord> {
        self.records().find(|r| r.element() == element)
    }

    /// Handles of every retained element whose tag is in `element_types`
    /// (default target set when `None`), in scan order.
    pub fn get_activatable_elements(&self, element_types: Option<&[&str]>) -> Vec<Element> {
        let wanted: Vec<String> = match element_types {
            Some(types) => types.iter().map(|t| t.to_lowercase()).collect(),
            None => self.config.default_target_elements.clone(),
        };
        self.known_elements
            .iter()
            .filter(|(tag, _)| wanted.contains(tag))
            .flat_map(|(_, records)| records.iter().map(|r| r.element().clone()))
            .collect()
    }

    /// `None` when the element is unknown to this locator.
    pub fn is_displayed_from_start(&self, element: &Element) -> Option<bool> {
        self.record_for(element).map(ElementRecord::displayed_from_start)
    }

    /// The activator recorded as revealing `element`, if any.
    pub fn activating_element(&self, element: &Element) -> Option<&Element> {
        self.record_for(element).and_then(ElementRecord::activating_element)
    }

    /// Make sure `element` is visible in the current browser state.
    ///
    /// Reloads the final URL and, for elements that only appear after an
    /// interaction, replays the click on the recorded activator. Elements
    /// this locator never saw are left alone.
    pub fn activate_element(&mut self, element: &Element) -> Result<(), ScanError> {
        if self.unreachable.iter().any(|r| r.element() == element) {
            return Err(ScanError::ElementNeverActivates {
                selector: element.source().to_string(),
            });
        }
        let Some(record) = self.record_for(element).cloned() else {
            debug!(element = %element, "activate_element on an unknown element");
            return Ok(());
        };
        if !record.displayed_ever() {
            return Err(ScanError::ElementNeverActivates {
                selector: element.source().to_string(),
            });
        }

        debug!(url = %self.final_url, "returning to final url");
        self.driver.navigate(&self.final_url)?;
        settle(self.config.probe_settle);
        if record.displayed_from_start() {
            return Ok(());
        }

        let activator = record
            .activating_element()
            .ok_or_else(|| ScanError::ElementNeverActivates {
                selector: element.source().to_string(),
            })?;
        activator.raw_click(&mut self.driver)?;
        settle(self.config.probe_settle);
        Ok(())
    }

    /// Click `element` and classify the result.
    pub fn click(&mut self, element: &Element) -> Result<ActivationOutcome, ScanError> {
        self.classifier.click(element, &mut self.driver)
    }
}
