use tracing::info;

use crate::activity::Activity;
use crate::browser::driver::BrowserDriver;
use crate::browser::webdriver::{WebDriverOptions, WebDriverSession};
use crate::error::ScanError;
use crate::locator::locator::{ElementLocator, LocatorConfig};
use crate::modal::finder::{ModalConfig, ModalFinder};
use crate::progress::ProgressReport;
use crate::report::console::{format_locator_report, format_modal_report};
use crate::report::report_model::{LocatorReport, ModalReport};

// ============================================================================
// Driver-agnostic runners
// ============================================================================

/// Analyze one page and summarize the retained elements.
pub fn run_locate<D: BrowserDriver>(
    driver: D,
    activity: Activity,
    tags: &[&str],
    fake: bool,
    config: LocatorConfig,
) -> Result<(LocatorReport, D), ScanError> {
    let mut locator = ElementLocator::with_config(driver, activity, tags, config);
    let mut on_progress = |report: &ProgressReport| {
        if let Some(message) = report.message() {
            info!("{}", message);
        }
    };
    locator.analyze(fake, Some(&mut on_progress))?;
    let report = LocatorReport::from_locator(&locator);
    Ok((report, locator.into_driver()))
}

/// Analyze one page, then search it for modal dialogs.
pub fn run_modals<D: BrowserDriver>(
    driver: D,
    activity: Activity,
    fake: bool,
    locator_config: LocatorConfig,
    modal_config: ModalConfig,
) -> Result<(ModalReport, D), ScanError> {
    let targets: Vec<String> = locator_config.default_target_elements.clone();
    let tags: Vec<&str> = targets.iter().map(String::as_str).collect();
    let mut locator = ElementLocator::with_config(driver, activity.clone(), &tags, locator_config);
    locator.analyze(fake, None)?;

    let report = {
        let mut finder = ModalFinder::with_config(&mut locator, activity.clone(), modal_config);
        finder.get_all_activators()?;
        ModalReport::from_finder(&activity.url, &finder)
    };
    Ok((report, locator.into_driver()))
}

// ============================================================================
// locate / modals subcommands
// ============================================================================

pub fn cmd_locate(
    options: &WebDriverOptions,
    activity: Activity,
    tags: &[String],
    fake: bool,
    config: LocatorConfig,
    format: &str,
    output: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let tags: Vec<String> = if tags.is_empty() {
        config.default_target_elements.clone()
    } else {
        tags.to_vec()
    };
    let tag_refs: Vec<&str> = tags.iter().map(String::as_str).collect();

    let session = WebDriverSession::launch(options)?;
    let (report, mut session) = run_locate(session, activity, &tag_refs, fake, config)?;
    session.quit();

    let content = match format {
        "console" => format_locator_report(&report),
        _ => serde_json::to_string_pretty(&report)? + "\n",
    };
    write_output(&content, output)
}

pub fn cmd_modals(
    options: &WebDriverOptions,
    activity: Activity,
    fake: bool,
    locator_config: LocatorConfig,
    modal_config: ModalConfig,
    format: &str,
    output: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = WebDriverSession::launch(options)?;
    let (report, mut session) = run_modals(session, activity, fake, locator_config, modal_config)?;
    session.quit();

    let content = match format {
        "console" => format_modal_report(&report),
        _ => serde_json::to_string_pretty(&report)? + "\n",
    };
    write_output(&content, output)
}

// ============================================================================
// Helpers
// ============================================================================

fn write_output(content: &str, output: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        Some(path) => std::fs::write(path, content)?,
        None => print!("{}", content),
    }
    Ok(())
}
