use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::activity::Activity;
use crate::browser::webdriver::{BrowserKind, WebDriverOptions};
use crate::error::ScanError;
use crate::locator::locator::{DEFAULT_TARGET_ELEMENTS, LocatorConfig, POTENTIAL_ACTIVATORS};
use crate::modal::finder::ModalConfig;

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "element-locator",
    version,
    about = "Finds hidden elements, their activators and modal dialogs on a web page"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// WebDriver endpoint (geckodriver / chromedriver)
    #[arg(long, global = true)]
    pub webdriver: Option<String>,

    /// Path to config file (default: element-locator.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inventory a page and find the activators of hidden elements
    Locate {
        /// Page to analyze
        #[arg(long, required_unless_present = "activity")]
        url: Option<String>,

        /// Activity YAML file (url plus setup commands) instead of --url
        #[arg(long)]
        activity: Option<String>,

        /// Tags to track (default: the configured target elements)
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,

        /// Skip the activation sweep
        #[arg(long, default_value_t = false, action = clap::ArgAction::Set)]
        fake: bool,

        /// Output format: json, console
        #[arg(long, default_value = "json")]
        format: String,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Find clickables that open modal dialogs
    Modals {
        /// Page to analyze
        #[arg(long, required_unless_present = "activity")]
        url: Option<String>,

        /// Activity YAML file (url plus setup commands) instead of --url
        #[arg(long)]
        activity: Option<String>,

        /// Skip the locator's activation sweep before searching
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        fake: bool,

        /// Output format: json, console
        #[arg(long, default_value = "json")]
        format: String,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<String>,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `element-locator.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub webdriver: WebDriverSettings,
    #[serde(default)]
    pub locator: LocatorSettings,
    #[serde(default)]
    pub modal: ModalSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebDriverSettings {
    pub endpoint: Option<String>,

    #[serde(default)]
    pub browser: BrowserKind,

    #[serde(default = "default_true")]
    pub headless: bool,

    pub window_width: Option<u32>,
    pub window_height: Option<u32>,
}

impl Default for WebDriverSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            browser: BrowserKind::Firefox,
            headless: true,
            window_width: None,
            window_height: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocatorSettings {
    #[serde(default = "default_initial_settle_ms")]
    pub initial_settle_ms: u64,

    #[serde(default = "default_settle_ms")]
    pub probe_settle_ms: u64,

    #[serde(default = "default_settle_ms")]
    pub click_settle_ms: u64,

    #[serde(default = "default_potential_activators")]
    pub potential_activators: Vec<String>,

    #[serde(default = "default_target_elements")]
    pub default_target_elements: Vec<String>,
}

impl Default for LocatorSettings {
    fn default() -> Self {
        Self {
            initial_settle_ms: default_initial_settle_ms(),
            probe_settle_ms: default_settle_ms(),
            click_settle_ms: default_settle_ms(),
            potential_activators: default_potential_activators(),
            default_target_elements: default_target_elements(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModalSettings {
    #[serde(default = "default_baseline_budget_ms")]
    pub baseline_budget_ms: u64,

    #[serde(default)]
    pub baseline_poll_ms: u64,

    #[serde(default = "default_js_click_settle_ms")]
    pub js_click_settle_ms: u64,

    #[serde(default = "default_stop_words")]
    pub stop_words: Vec<String>,
}

impl Default for ModalSettings {
    fn default() -> Self {
        Self {
            baseline_budget_ms: default_baseline_budget_ms(),
            baseline_poll_ms: 0,
            js_click_settle_ms: default_js_click_settle_ms(),
            stop_words: default_stop_words(),
        }
    }
}

// Serde default helpers
fn default_true() -> bool { true }
fn default_initial_settle_ms() -> u64 { 5000 }
fn default_settle_ms() -> u64 { 500 }
fn default_baseline_budget_ms() -> u64 { 10_000 }
fn default_js_click_settle_ms() -> u64 { 1500 }
fn default_stop_words() -> Vec<String> { vec!["menu".to_string()] }
fn default_potential_activators() -> Vec<String> {
    POTENTIAL_ACTIVATORS.iter().map(|t| t.to_string()).collect()
}
fn default_target_elements() -> Vec<String> {
    DEFAULT_TARGET_ELEMENTS.iter().map(|t| t.to_string()).collect()
}

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or("element-locator.yaml");
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = config_path, error = %e, "ignoring malformed config file");
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}

/// Load an activity descriptor. Unlike the config file this one is required.
pub fn load_activity(path: &str) -> Result<Activity, ScanError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ScanError::Config(format!("cannot read activity {}: {}", path, e)))?;
    serde_yaml::from_str(&content)
        .map_err(|e| ScanError::Config(format!("invalid activity {}: {}", path, e)))
}

/// `--activity` wins over `--url`; one of them must be present.
pub fn resolve_activity(url: Option<&str>, activity: Option<&str>) -> Result<Activity, ScanError> {
    match (activity, url) {
        (Some(path), _) => load_activity(path),
        (None, Some(url)) => Ok(Activity::new(url, url)),
        (None, None) => Err(ScanError::Config("either --url or --activity is required".into())),
    }
}

// ============================================================================
// Config Builders (merge CLI args with config file)
// ============================================================================

pub fn build_locator_config(config: &AppConfig) -> LocatorConfig {
    let settings = &config.locator;
    LocatorConfig {
        initial_settle: Duration::from_millis(settings.initial_settle_ms),
        probe_settle: Duration::from_millis(settings.probe_settle_ms),
        click_settle: Duration::from_millis(settings.click_settle_ms),
        potential_activators: settings.potential_activators.clone(),
        default_target_elements: settings.default_target_elements.clone(),
    }
}

pub fn build_modal_config(config: &AppConfig) -> ModalConfig {
    let settings = &config.modal;
    ModalConfig {
        baseline_budget: Duration::from_millis(settings.baseline_budget_ms),
        baseline_poll: Duration::from_millis(settings.baseline_poll_ms),
        js_click_settle: Duration::from_millis(settings.js_click_settle_ms),
        stop_words: settings.stop_words.clone(),
        ..ModalConfig::default()
    }
}

/// Endpoint resolution: CLI > config > default.
pub fn build_webdriver_options(config: &AppConfig, cli_endpoint: Option<&str>) -> WebDriverOptions {
    let settings = &config.webdriver;
    let defaults = WebDriverOptions::default();
    WebDriverOptions {
        endpoint: cli_endpoint
            .map(str::to_string)
            .or_else(|| settings.endpoint.clone())
            .unwrap_or(defaults.endpoint),
        browser: settings.browser,
        headless: settings.headless,
        window_size: settings.window_width.zip(settings.window_height),
    }
}
