use thiserror::Error;

/// Failures reported by a `BrowserDriver` implementation.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// The native element reference no longer points at a live DOM node
    #[error("stale element reference: {0}")]
    StaleElement(String),

    /// A lookup by selector matched nothing
    #[error("no such element: {0}")]
    NoSuchElement(String),

    /// The element exists but cannot receive pointer input
    #[error("element not interactable: {0}")]
    NotInteractable(String),

    /// Another element would receive the click
    #[error("element click intercepted: {0}")]
    ClickIntercepted(String),

    /// Alert operation requested but no native dialog is open
    #[error("no such alert")]
    NoSuchAlert,

    /// Malformed XPath / tag query
    #[error("invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    /// The automation session itself is gone (crashed browser, killed driver)
    #[error("browser session lost: {0}")]
    SessionLost(String),

    /// Transport failure talking to the WebDriver endpoint
    #[error("webdriver transport error ({context}): {source}")]
    Http {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    /// JSON encoding or decoding failed
    #[error("JSON error ({context}): {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The remote end answered with an error we have no dedicated variant for
    #[error("webdriver command '{command}' failed: {error}")]
    Protocol { command: String, error: String },
}

impl BrowserError {
    /// Stale or vanished element: an expected, frequent condition.
    pub fn is_lost(&self) -> bool {
        matches!(self, BrowserError::StaleElement(_) | BrowserError::NoSuchElement(_))
    }

    pub fn is_not_interactable(&self) -> bool {
        matches!(
            self,
            BrowserError::NotInteractable(_) | BrowserError::ClickIntercepted(_)
        )
    }

    /// Errors after which the session cannot be used any more.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, BrowserError::SessionLost(_) | BrowserError::Http { .. })
    }
}

/// Errors surfaced by the element handle, locator and modal finder.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The element could no longer be found on the page
    #[error("element {selector} lost while {context}")]
    ElementLost { selector: String, context: String },

    /// The locator already determined this element is never reachable
    #[error("element {selector} never becomes visible on this page")]
    ElementNeverActivates { selector: String },

    #[error("invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    /// `analyze()` is a one-shot operation per locator
    #[error("element locator already analyzed (phase: {phase})")]
    AlreadyAnalyzed { phase: String },

    #[error(transparent)]
    Browser(BrowserError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ScanError {
    pub fn lost(selector: impl Into<String>, context: impl Into<String>) -> Self {
        ScanError::ElementLost {
            selector: selector.into(),
            context: context.into(),
        }
    }

    pub fn is_lost(&self) -> bool {
        matches!(self, ScanError::ElementLost { .. })
    }

    pub fn is_session_fatal(&self) -> bool {
        matches!(self, ScanError::Browser(e) if e.is_session_fatal())
    }
}

impl From<BrowserError> for ScanError {
    fn from(err: BrowserError) -> Self {
        match err {
            BrowserError::StaleElement(msg) | BrowserError::NoSuchElement(msg) => {
                ScanError::ElementLost {
                    selector: msg,
                    context: "talking to the browser".into(),
                }
            }
            BrowserError::InvalidSelector { selector, message } => {
                ScanError::InvalidSelector { selector, message }
            }
            other => ScanError::Browser(other),
        }
    }
}

/// Attach the handle's selector and the operation name to a lost-element error.
pub(crate) fn lost_context(err: BrowserError, selector: &str, context: &str) -> ScanError {
    if err.is_lost() {
        ScanError::lost(selector, context)
    } else {
        ScanError::from(err)
    }
}
