use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::activation::classifier::settle;
use crate::browser::driver::BrowserDriver;
use crate::error::{ScanError, lost_context};

/// One step of the "get to this state" sequence replayed after loading the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum SetupCommand {
    /// Native click on the first element matching `xpath`
    Click { xpath: String },
    Pause { ms: u64 },
}

/// The page (and page state) under test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(default)]
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub window_size: Option<(u32, u32)>,
    #[serde(default)]
    pub setup: Vec<SetupCommand>,
}

impl Activity {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            window_size: None,
            setup: Vec::new(),
        }
    }

    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_size = Some((width, height));
        self
    }

    pub fn with_setup(mut self, command: SetupCommand) -> Self {
        self.setup.push(command);
        self
    }

    /// Load the page and replay the setup sequence.
    pub fn get(&self, driver: &mut dyn BrowserDriver) -> Result<(), ScanError> {
        if let Some((width, height)) = self.window_size {
            driver.set_window_size(width, height)?;
        }
        driver.navigate(&self.url)?;

        for command in &self.setup {
            debug!(activity = %self.name, ?command, "replaying setup command");
            match command {
                SetupCommand::Click { xpath } => {
                    let target = driver
                        .find_elements_by_xpath(xpath)?
                        .into_iter()
                        .next()
                        .ok_or_else(|| ScanError::lost(xpath, "replaying activity setup"))?;
                    driver
                        .click(&target)
                        .map_err(|e| lost_context(e, xpath, "replaying activity setup"))?;
                }
                SetupCommand::Pause { ms } => settle(Duration::from_millis(*ms)),
            }
        }
        Ok(())
    }
}
