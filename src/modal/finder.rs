use std::collections::HashSet;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::activation::classifier::settle;
use crate::activation::outcome::ActivationOutcome;
use crate::activity::Activity;
use crate::browser::driver::BrowserDriver;
use crate::element::handle::Element;
use crate::error::ScanError;
use crate::locator::locator::{ElementLocator, get_all_by_xpath, get_all_of_type};
use crate::modal::geometry::{BackdropStyle, ClickableBounds, DialogBounds, has_stop_word};

const VISIBLE_DIVS_XPATH: &str = "//body//descendant::div";
const CLICKABLES_XPATH: &str = "//body//descendant::*[self::a or self::button or self::div[@role='button'] or self::span[@role='button']]";

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ModalConfig {
    /// How long the baseline noise filter keeps watching the idle page
    pub baseline_budget: Duration,
    /// Pause between two baseline snapshots
    pub baseline_poll: Duration,
    /// Wait after the script-click fallback
    pub js_click_settle: Duration,
    /// Clickables whose markup contains one of these are never probed
    pub stop_words: Vec<String>,
    pub clickable: ClickableBounds,
    pub dialog: DialogBounds,
    pub backdrop_min_height: f64,
}

impl Default for ModalConfig {
    fn default() -> Self {
        Self {
            baseline_budget: Duration::from_secs(10),
            baseline_poll: Duration::ZERO,
            js_click_settle: Duration::from_millis(1500),
            stop_words: vec!["menu".to_string()],
            clickable: ClickableBounds::default(),
            dialog: DialogBounds::default(),
            backdrop_min_height: 200.0,
        }
    }
}

impl ModalConfig {
    pub fn without_delays(mut self) -> Self {
        self.baseline_budget = Duration::ZERO;
        self.baseline_poll = Duration::ZERO;
        self.js_click_settle = Duration::ZERO;
        self
    }
}

/// A dialog that appeared after clicking `activator`.
#[derive(Debug, Clone, PartialEq)]
pub struct ModalCandidate {
    pub activator: Element,
    pub content: Element,
    /// The overlay the content was found in, when it came from one
    pub backdrop: Option<Element>,
}

// ============================================================================
// ModalFinder
// ============================================================================

/// Finds clickables that open modal dialogs.
///
/// Every visible clickable is clicked from a fresh page load; what appears
/// afterwards is matched against backdrop and dialog geometry. Divs that
/// show up on their own while the page idles are ignored so lazy-loaded
/// chrome is not mistaken for a dialog.
pub struct ModalFinder<'a, D: BrowserDriver> {
    locator: &'a mut ElementLocator<D>,
    activity: Activity,
    config: ModalConfig,
    checked_backdrops: HashSet<String>,
    ignored_elements: HashSet<String>,
    activators: Vec<Element>,
    modals: Vec<(Element, Vec<Element>)>,
    candidates: Vec<ModalCandidate>,
}

impl<'a, D: BrowserDriver> ModalFinder<'a, D> {
    pub fn new(locator: &'a mut ElementLocator<D>, activity: Activity) -> Self {
        Self::with_config(locator, activity, ModalConfig::default())
    }

    pub fn with_config(
        locator: &'a mut ElementLocator<D>,
        activity: Activity,
        config: ModalConfig,
    ) -> Self {
        Self {
            locator,
            activity,
            config,
            checked_backdrops: HashSet::new(),
            ignored_elements: HashSet::new(),
            activators: Vec::new(),
            modals: Vec::new(),
            candidates: Vec::new(),
        }
    }

    /// Activators that opened a dialog, in probe order.
    pub fn activators(&self) -> &[Element] {
        &self.activators
    }

    /// Activator -> modal content for every probed activator (empty when nothing opened).
    pub fn modals(&self) -> &[(Element, Vec<Element>)] {
        &self.modals
    }

    pub fn modal_for(&self, activator: &Element) -> Option<&[Element]> {
        self.modals
            .iter()
            .find(|(a, _)| a == activator)
            .map(|(_, modal)| modal.as_slice())
    }

    pub fn candidates(&self) -> &[ModalCandidate] {
        &self.candidates
    }

    pub fn is_ignored(&self, element: &Element) -> bool {
        self.ignored_elements.contains(element.source())
    }

    pub fn ignored_count(&self) -> usize {
        self.ignored_elements.len()
    }

    fn driver(&mut self) -> &mut dyn BrowserDriver {
        self.locator.driver_mut()
    }

    fn visible_divs(&mut self) -> Result<Vec<Element>, ScanError> {
        let divs = get_all_by_xpath(self.driver(), VISIBLE_DIVS_XPATH)?;
        let mut visible = Vec::with_capacity(divs.len());
        for div in divs {
            if div.is_visible(self.driver())? {
                visible.push(div);
            }
        }
        Ok(visible)
    }

    /// Watch the freshly loaded page and ignore every div that becomes
    /// visible without any interaction.
    pub fn find_ignored_elements(&mut self) -> Result<(), ScanError> {
        self.activity.get(self.locator.driver_mut())?;
        let start = Instant::now();
        let mut previous = self.visible_divs()?;
        loop {
            settle(self.config.baseline_poll);
            let current = self.visible_divs()?;
            for div in &current {
                if !previous.contains(div) && self.ignored_elements.insert(div.source().to_string()) {
                    debug!(element = %div, "ignoring div that appeared on its own");
                }
            }
            previous = current;
            if start.elapsed() >= self.config.baseline_budget {
                break;
            }
        }
        info!(ignored = self.ignored_elements.len(), "baseline noise filter done");
        Ok(())
    }

    fn clickable_is_valid(&mut self, clickable: &Element) -> Result<bool, ScanError> {
        if has_stop_word(clickable.markup(), &self.config.stop_words) {
            return Ok(false);
        }
        let rect = clickable.rect(self.driver())?;
        Ok(self.config.clickable.admits(&rect))
    }

    /// Probe every visible clickable and return the ones that open a dialog.
    pub fn get_all_activators(&mut self) -> Result<Vec<Element>, ScanError> {
        self.find_ignored_elements()?;
        let clickables = get_all_by_xpath(self.driver(), CLICKABLES_XPATH)?;
        let total = clickables.len();

        for (index, clickable) in clickables.iter().enumerate() {
            debug!(clickable = %clickable, "testing {}/{}", index + 1, total);
            if let Err(e) = self.check_is_modal(clickable) {
                self.recover(clickable, e)?;
            }
        }
        info!(
            probed = self.modals.len(),
            with_modal = self.activators.len(),
            "modal search complete"
        );
        Ok(self.activators.clone())
    }

    fn check_is_modal(&mut self, clickable: &Element) -> Result<(), ScanError> {
        if !clickable.is_visible(self.driver())? || !self.clickable_is_valid(clickable)? {
            return Ok(());
        }

        self.locator.activate_element(clickable)?;
        let before: Vec<Element> = self
            .visible_divs()?
            .into_iter()
            .filter(|div| !self.is_ignored(div))
            .collect();

        let found = match self.locator.click(clickable)? {
            ActivationOutcome::None => self.find_modal_on_page(&before)?,
            ActivationOutcome::NonInteractable => {
                clickable.js_click(self.driver())?;
                settle(self.config.js_click_settle);
                self.find_modal_on_page(&before)?
            }
            other => {
                debug!(clickable = %clickable, outcome = %other, "left the page, no modal");
                None
            }
        };

        let modal = match found {
            Some((content, backdrop)) => {
                info!(activator = %clickable, modal = %content, "found modal");
                self.activators.push(clickable.clone());
                self.candidates.push(ModalCandidate {
                    activator: clickable.clone(),
                    content: content.clone(),
                    backdrop,
                });
                vec![content]
            }
            None => Vec::new(),
        };
        self.modals.push((clickable.clone(), modal));
        self.activity.get(self.locator.driver_mut())?;
        Ok(())
    }

    /// Reset the page after a failed probe so the next clickable starts clean.
    /// Session loss and selector bugs still propagate.
    fn recover(&mut self, clickable: &Element, err: ScanError) -> Result<(), ScanError> {
        if err.is_session_fatal() || matches!(err, ScanError::InvalidSelector { .. }) {
            return Err(err);
        }
        warn!(clickable = %clickable, error = %err, "probe failed, resetting page");
        self.activity.get(self.locator.driver_mut())
    }

    /// Modal content currently on the page: empty, or exactly one element.
    pub fn get_modal_on_page(
        &mut self,
        visible_before_click: &[Element],
    ) -> Result<Vec<Element>, ScanError> {
        Ok(self
            .find_modal_on_page(visible_before_click)?
            .map(|(content, _)| vec![content])
            .unwrap_or_default())
    }

    fn find_modal_on_page(
        &mut self,
        visible_before_click: &[Element],
    ) -> Result<Option<(Element, Option<Element>)>, ScanError> {
        let backdrop = self.find_backdrop()?;

        if let Some(backdrop) = &backdrop {
            let descendants = backdrop.find_by_xpath(self.driver(), "descendant::*")?;
            for child in descendants {
                if child == *backdrop
                    || self.is_ignored(&child)
                    || matches!(child.tag_name(), "a" | "button")
                {
                    continue;
                }
                if self.looks_like_dialog(&child)? {
                    return Ok(Some((child, Some(backdrop.clone()))));
                }
            }
        }

        for div in self.visible_divs()? {
            if self.is_ignored(&div)
                || backdrop.as_ref() == Some(&div)
                || visible_before_click.contains(&div)
            {
                continue;
            }
            if self.looks_like_dialog(&div)? {
                return Ok(Some((div, None)));
            }
        }
        Ok(None)
    }

    fn looks_like_dialog(&mut self, element: &Element) -> Result<bool, ScanError> {
        let dialog = self.config.dialog;
        element.safe_operation(
            self.driver(),
            |element, driver| {
                Ok(element.is_visible(driver)?
                    && dialog.position_like_modal_dialog(&element.rect(driver)?))
            },
            || false,
        )
    }

    /// First div under `<body>` that is tall enough and pinned to the viewport.
    ///
    /// Divs rejected once are remembered by markup fingerprint and skipped on
    /// later probes.
    pub fn find_backdrop(&mut self) -> Result<Option<Element>, ScanError> {
        let Some(body) = get_all_of_type(self.driver(), &["body"])?.into_iter().next() else {
            return Ok(None);
        };
        let divs = body.find_by_xpath(self.driver(), "descendant::div")?;
        let min_height = self.config.backdrop_min_height;

        for div in divs {
            let fingerprint = div.markup_fingerprint();
            if self.checked_backdrops.contains(&fingerprint) {
                continue;
            }
            let is_backdrop = div.safe_operation(
                self.driver(),
                |div, driver| {
                    let rect = div.rect(driver)?;
                    Ok(rect.height >= min_height
                        && rect.x >= 0.0
                        && BackdropStyle::read(div, driver)?.is_backdrop())
                },
                || false,
            )?;
            if is_backdrop {
                debug!(backdrop = %div, "found backdrop");
                return Ok(Some(div));
            }
            self.checked_backdrops.insert(fingerprint);
        }
        Ok(None)
    }
}
