pub mod activation;
pub mod activity;
pub mod browser;
pub mod cli;
pub mod element;
pub mod error;
pub mod locator;
pub mod modal;
pub mod progress;
pub mod report;

pub use crate::{
    activation::{classifier::ActivatorClassifier, outcome::ActivationOutcome},
    activity::{Activity, SetupCommand},
    browser::{
        driver::{BrowserDriver, ElementRect, ElementRef},
        fake::{ClickEffect, FakeBrowser, FakeNode, FakePage},
        webdriver::{WebDriverOptions, WebDriverSession},
    },
    element::handle::Element,
    error::{BrowserError, ScanError},
    locator::{
        locator::{ElementLocator, LocatorConfig, get_all_by_xpath, get_all_of_type},
        record::{ElementRecord, ScanPhase},
    },
    modal::finder::{ModalCandidate, ModalConfig, ModalFinder},
    progress::ProgressReport,
};
