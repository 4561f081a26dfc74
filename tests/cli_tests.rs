use std::time::Duration;

use clap::Parser;
use element_locator::cli::config::{
    AppConfig, Cli, Commands, build_locator_config, build_modal_config, build_webdriver_options,
    load_activity, load_config, resolve_activity,
};
use element_locator::browser::webdriver::BrowserKind;
use element_locator::{ScanError, SetupCommand};

// ============================================================================
// CLI Argument Parsing Tests
// ============================================================================

#[test]
fn cli_parse_locate_minimal() {
    let cli = Cli::parse_from(["element-locator", "locate", "--url", "https://example.com"]);
    match cli.command {
        Commands::Locate {
            url,
            activity,
            tags,
            fake,
            format,
            output,
        } => {
            assert_eq!(url.as_deref(), Some("https://example.com"));
            assert!(activity.is_none());
            assert!(tags.is_empty());
            assert!(!fake);
            assert_eq!(format, "json");
            assert!(output.is_none());
        }
        _ => panic!("Expected Locate command"),
    }
}

#[test]
fn cli_parse_locate_all_args() {
    let cli = Cli::parse_from([
        "element-locator",
        "locate",
        "--url",
        "https://test.com",
        "--tags",
        "a,button,select",
        "--fake",
        "true",
        "--format",
        "console",
        "-o",
        "out.txt",
    ]);
    match cli.command {
        Commands::Locate {
            tags,
            fake,
            format,
            output,
            ..
        } => {
            assert_eq!(tags, vec!["a", "button", "select"]);
            assert!(fake);
            assert_eq!(format, "console");
            assert_eq!(output.as_deref(), Some("out.txt"));
        }
        _ => panic!("Expected Locate command"),
    }
}

#[test]
fn cli_parse_modals_skips_sweep_by_default() {
    let cli = Cli::parse_from(["element-locator", "modals", "--activity", "home.yaml"]);
    match cli.command {
        Commands::Modals {
            url,
            activity,
            fake,
            ..
        } => {
            assert!(url.is_none());
            assert_eq!(activity.as_deref(), Some("home.yaml"));
            assert!(fake);
        }
        _ => panic!("Expected Modals command"),
    }
}

#[test]
fn cli_requires_url_or_activity() {
    assert!(Cli::try_parse_from(["element-locator", "locate"]).is_err());
    assert!(Cli::try_parse_from(["element-locator", "modals"]).is_err());
}

#[test]
fn cli_parse_global_flags() {
    let cli = Cli::parse_from([
        "element-locator",
        "-vv",
        "--webdriver",
        "http://grid:4444",
        "--config",
        "custom.yaml",
        "locate",
        "--url",
        "https://example.com",
    ]);
    assert_eq!(cli.verbose, 2);
    assert_eq!(cli.webdriver.as_deref(), Some("http://grid:4444"));
    assert_eq!(cli.config.as_deref(), Some("custom.yaml"));
}

// ============================================================================
// Config File Tests
// ============================================================================

#[test]
fn config_load_missing_file() {
    let config = load_config(Some("nonexistent_file_that_does_not_exist.yaml"));
    assert_eq!(config.locator.initial_settle_ms, 5000);
    assert_eq!(config.modal.stop_words, vec!["menu"]);
}

#[test]
fn config_default_values() {
    let config = AppConfig::default();
    assert!(config.webdriver.endpoint.is_none());
    assert_eq!(config.webdriver.browser, BrowserKind::Firefox);
    assert!(config.webdriver.headless);
    assert_eq!(config.locator.probe_settle_ms, 500);
    assert_eq!(config.locator.potential_activators, vec!["a", "button", "input", "div"]);
    assert_eq!(
        config.locator.default_target_elements,
        vec!["a", "button", "input", "img", "div", "select"]
    );
    assert_eq!(config.modal.baseline_budget_ms, 10_000);
    assert_eq!(config.modal.baseline_poll_ms, 0);
    assert_eq!(config.modal.js_click_settle_ms, 1500);
}

#[test]
fn config_partial_yaml() {
    let yaml = r#"
webdriver:
  browser: chrome
locator:
  initial_settle_ms: 100
modal:
  stop_words: ["menu", "cookie"]
"#;
    let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.webdriver.browser, BrowserKind::Chrome);
    assert!(config.webdriver.headless);
    assert_eq!(config.locator.initial_settle_ms, 100);
    // Other locator fields get defaults
    assert_eq!(config.locator.probe_settle_ms, 500);
    assert_eq!(config.modal.stop_words, vec!["menu", "cookie"]);
    assert_eq!(config.modal.js_click_settle_ms, 1500);
}

#[test]
fn config_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("element-locator.yaml");
    std::fs::write(&path, "locator:\n  click_settle_ms: 50\n").unwrap();

    let config = load_config(path.to_str());
    assert_eq!(config.locator.click_settle_ms, 50);
}

#[test]
fn config_malformed_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.yaml");
    std::fs::write(&path, "locator:\n  initial_settle_ms: soon\n").unwrap();

    let config = load_config(path.to_str());
    assert_eq!(config.locator.initial_settle_ms, 5000);
}

// ============================================================================
// Builder Tests
// ============================================================================

#[test]
fn build_locator_config_wiring() {
    let mut config = AppConfig::default();
    config.locator.initial_settle_ms = 1;
    config.locator.probe_settle_ms = 2;
    config.locator.click_settle_ms = 3;
    config.locator.default_target_elements = vec!["button".into()];

    let locator = build_locator_config(&config);
    assert_eq!(locator.initial_settle, Duration::from_millis(1));
    assert_eq!(locator.probe_settle, Duration::from_millis(2));
    assert_eq!(locator.click_settle, Duration::from_millis(3));
    assert_eq!(locator.default_target_elements, vec!["button"]);
    assert_eq!(locator.potential_activators.len(), 4);
}

#[test]
fn build_modal_config_keeps_geometry_defaults() {
    let mut config = AppConfig::default();
    config.modal.baseline_budget_ms = 250;
    config.modal.stop_words = vec!["nav".into()];

    let modal = build_modal_config(&config);
    assert_eq!(modal.baseline_budget, Duration::from_millis(250));
    assert_eq!(modal.js_click_settle, Duration::from_millis(1500));
    assert_eq!(modal.stop_words, vec!["nav"]);
    assert_eq!(modal.backdrop_min_height, 200.0);
}

#[test]
fn build_webdriver_options_precedence() {
    let mut config = AppConfig::default();
    assert_eq!(
        build_webdriver_options(&config, None).endpoint,
        "http://localhost:4444"
    );

    config.webdriver.endpoint = Some("http://from-config:4444".into());
    config.webdriver.window_width = Some(1280);
    config.webdriver.window_height = Some(800);
    let options = build_webdriver_options(&config, None);
    assert_eq!(options.endpoint, "http://from-config:4444");
    assert_eq!(options.window_size, Some((1280, 800)));

    let options = build_webdriver_options(&config, Some("http://from-cli:9515"));
    assert_eq!(options.endpoint, "http://from-cli:9515");
}

#[test]
fn window_size_needs_both_dimensions() {
    let mut config = AppConfig::default();
    config.webdriver.window_width = Some(1280);
    assert_eq!(build_webdriver_options(&config, None).window_size, None);
}

// ============================================================================
// Activity Files
// ============================================================================

#[test]
fn load_activity_with_setup() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checkout.yaml");
    let yaml = r#"
name: checkout
url: "https://shop.test/cart"
window_size: [1024, 768]
setup:
  - command: click
    xpath: "//button[@id='accept']"
  - command: pause
    ms: 10
"#;
    std::fs::write(&path, yaml).unwrap();

    let activity = load_activity(path.to_str().unwrap()).unwrap();
    assert_eq!(activity.name, "checkout");
    assert_eq!(activity.url, "https://shop.test/cart");
    assert_eq!(activity.window_size, Some((1024, 768)));
    assert_eq!(
        activity.setup,
        vec![
            SetupCommand::Click {
                xpath: "//button[@id='accept']".into()
            },
            SetupCommand::Pause { ms: 10 },
        ]
    );
}

#[test]
fn load_activity_errors_are_config_errors() {
    let err = load_activity("nonexistent_activity.yaml").unwrap_err();
    assert!(matches!(err, ScanError::Config(_)));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.yaml");
    std::fs::write(&path, "name: no url here\n").unwrap();
    let err = load_activity(path.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, ScanError::Config(ref m) if m.contains("invalid activity")));
}

#[test]
fn resolve_activity_prefers_the_file() {
    let activity = resolve_activity(Some("https://example.com"), None).unwrap();
    assert_eq!(activity.url, "https://example.com");
    assert_eq!(activity.name, "https://example.com");
    assert!(activity.setup.is_empty());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.yaml");
    std::fs::write(&path, "url: \"https://file.test/\"\n").unwrap();
    let activity = resolve_activity(Some("https://example.com"), path.to_str()).unwrap();
    assert_eq!(activity.url, "https://file.test/");

    assert!(matches!(
        resolve_activity(None, None).unwrap_err(),
        ScanError::Config(_)
    ));
}
