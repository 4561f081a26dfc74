use reqwest::Method;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::browser::driver::{BrowserDriver, ElementDescription, ElementRect, ElementRef};
use crate::error::BrowserError;

/// W3C web element identifier key.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

const JS_DESCRIBE: &str = r#"
var el = arguments[0];
var path = [];
var node = el;
while (node && node.nodeType === Node.ELEMENT_NODE) {
    var tag = node.nodeName.toLowerCase();
    var nth = 1;
    var sib = node;
    while ((sib = sib.previousElementSibling)) {
        if (sib.nodeName.toLowerCase() === tag) nth++;
    }
    path.unshift(tag + '[' + nth + ']');
    node = node.parentNode;
}
return {
    tag_name: el.nodeName.toLowerCase(),
    xpath: '/' + path.join('/'),
    outer_html: el.outerHTML
};
"#;

const JS_ATTRIBUTES: &str = r#"
var items = [];
for (var i = 0; i < arguments[0].attributes.length; ++i) {
    items.push([arguments[0].attributes[i].name, arguments[0].attributes[i].value]);
}
return items;
"#;

const JS_PATCH_PRINT: &str = r#"
window.print = function() { console.warn("Print button"); };
Window.prototype.print = window.print;
var oldOpen = window.open;
window.open = function() { var w = oldOpen.apply(window, arguments); if (w) { w.print = window.print; } return w; };
"#;

const JS_CLICK: &str = "arguments[0].click();";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Firefox,
    Chrome,
}

/// How to reach and configure the remote WebDriver endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebDriverOptions {
    /// e.g. `http://localhost:4444` for geckodriver
    pub endpoint: String,
    #[serde(default)]
    pub browser: BrowserKind,
    #[serde(default = "default_true")]
    pub headless: bool,
    #[serde(default)]
    pub window_size: Option<(u32, u32)>,
}

fn default_true() -> bool {
    true
}

impl Default for WebDriverOptions {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:4444".to_string(),
            browser: BrowserKind::Firefox,
            headless: true,
            window_size: None,
        }
    }
}

impl WebDriverOptions {
    /// New-session payload for this browser.
    pub fn capabilities(&self) -> Value {
        match self.browser {
            BrowserKind::Firefox => {
                let mut args = Vec::new();
                if self.headless {
                    args.push("-headless".to_string());
                }
                if let Some((w, h)) = self.window_size {
                    args.push(format!("--width={}", w));
                    args.push(format!("--height={}", h));
                }
                json!({"capabilities": {"alwaysMatch": {
                    "browserName": "firefox",
                    "moz:firefoxOptions": {"args": args}
                }}})
            }
            BrowserKind::Chrome => {
                let mut args = vec!["--no-sandbox".to_string()];
                if self.headless {
                    args.push("--headless=new".to_string());
                    args.push("--disable-gpu".to_string());
                    args.push("--disable-dev-shm-usage".to_string());
                }
                if let Some((w, h)) = self.window_size {
                    args.push(format!("--window-size={},{}", w, h));
                }
                json!({"capabilities": {"alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": {"args": args}
                }}})
            }
        }
    }
}

/// Envelope of every WebDriver response.
#[derive(Debug, Deserialize)]
pub struct WebDriverResponse {
    #[serde(default)]
    pub value: Value,
}

/// `value` payload of a failed command.
#[derive(Debug, Deserialize)]
pub struct WebDriverErrorBody {
    pub error: String,
    #[serde(default)]
    pub message: String,
}

/// Map a W3C error code onto the driver error taxonomy.
pub fn error_from_code(command: &str, code: &str, message: &str) -> BrowserError {
    match code {
        "stale element reference" => BrowserError::StaleElement(message.to_string()),
        "no such element" | "detached shadow root" => {
            BrowserError::NoSuchElement(message.to_string())
        }
        "element not interactable" => BrowserError::NotInteractable(message.to_string()),
        "element click intercepted" => BrowserError::ClickIntercepted(message.to_string()),
        "no such alert" => BrowserError::NoSuchAlert,
        "invalid selector" => BrowserError::InvalidSelector {
            selector: String::new(),
            message: message.to_string(),
        },
        "invalid session id" | "session not created" | "no such window" => {
            BrowserError::SessionLost(message.to_string())
        }
        other => BrowserError::Protocol {
            command: command.to_string(),
            error: format!("{}: {}", other, message),
        },
    }
}

/// Pull element references out of a `find elements` result.
pub fn element_refs(value: &Value) -> Result<Vec<ElementRef>, BrowserError> {
    let items = value.as_array().ok_or_else(|| BrowserError::Protocol {
        command: "find elements".into(),
        error: "expected an array of elements".into(),
    })?;
    items
        .iter()
        .map(|item| {
            item.get(ELEMENT_KEY)
                .and_then(Value::as_str)
                .map(ElementRef::new)
                .ok_or_else(|| BrowserError::Protocol {
                    command: "find elements".into(),
                    error: format!("not a web element: {}", item),
                })
        })
        .collect()
}

fn element_arg(element: &ElementRef) -> Value {
    json!({ ELEMENT_KEY: element.as_str() })
}

fn with_selector(err: BrowserError, selector: &str) -> BrowserError {
    match err {
        BrowserError::InvalidSelector { message, .. } => BrowserError::InvalidSelector {
            selector: selector.to_string(),
            message,
        },
        other => other,
    }
}

/// A blocking W3C WebDriver session (geckodriver, chromedriver).
///
/// One HTTP round-trip per command; the session is deleted on drop.
pub struct WebDriverSession {
    client: Client,
    endpoint: String,
    session_id: String,
    main_window: Option<String>,
    closed: bool,
}

impl WebDriverSession {
    /// Create a new browser session on the given endpoint.
    pub fn launch(options: &WebDriverOptions) -> Result<Self, BrowserError> {
        let client = Client::new();
        let endpoint = options.endpoint.trim_end_matches('/').to_string();
        info!(endpoint = %endpoint, browser = ?options.browser, "starting webdriver session");

        let response = client
            .post(format!("{}/session", endpoint))
            .json(&options.capabilities())
            .send()
            .map_err(|e| BrowserError::Http {
                context: "new session".into(),
                source: e,
            })?;
        let value = Self::read_value(response, "new session")?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::Protocol {
                command: "new session".into(),
                error: "no sessionId in response".into(),
            })?
            .to_string();

        let mut session = WebDriverSession {
            client,
            endpoint,
            session_id,
            main_window: None,
            closed: false,
        };
        let handle = session.send(Method::GET, "window", None, "get window handle")?;
        session.main_window = handle.as_str().map(str::to_string);
        Ok(session)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn read_value(
        response: reqwest::blocking::Response,
        command: &str,
    ) -> Result<Value, BrowserError> {
        let status = response.status();
        let body = response.text().map_err(|e| BrowserError::Http {
            context: command.to_string(),
            source: e,
        })?;
        let parsed: WebDriverResponse =
            serde_json::from_str(&body).map_err(|e| BrowserError::Json {
                context: format!("{} response", command),
                source: e,
            })?;

        if status.is_success() {
            return Ok(parsed.value);
        }

        let error: WebDriverErrorBody =
            serde_json::from_value(parsed.value).map_err(|e| BrowserError::Json {
                context: format!("{} error body", command),
                source: e,
            })?;
        Err(error_from_code(command, &error.error, &error.message))
    }

    /// Send a session-scoped command and return its `value`.
    fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        command: &str,
    ) -> Result<Value, BrowserError> {
        let url = if path.is_empty() {
            format!("{}/session/{}", self.endpoint, self.session_id)
        } else {
            format!("{}/session/{}/{}", self.endpoint, self.session_id, path)
        };
        debug!(command, %url, "webdriver request");

        let mut request = self.client.request(method.clone(), &url);
        if method == Method::POST {
            request = request.json(&body.unwrap_or_else(|| json!({})));
        }
        let response = request.send().map_err(|e| BrowserError::Http {
            context: command.to_string(),
            source: e,
        })?;
        Self::read_value(response, command)
    }

    fn get_element(
        &self,
        element: &ElementRef,
        suffix: &str,
        command: &str,
    ) -> Result<Value, BrowserError> {
        self.send(
            Method::GET,
            &format!("element/{}/{}", element, suffix),
            None,
            command,
        )
    }

    fn execute(&self, script: &str, args: Vec<Value>, command: &str) -> Result<Value, BrowserError> {
        self.send(
            Method::POST,
            "execute/sync",
            Some(json!({ "script": script, "args": args })),
            command,
        )
    }

    /// Delete the session. Best-effort; errors are logged.
    pub fn quit(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.send(Method::DELETE, "", None, "delete session") {
            warn!(error = %e, "failed to delete webdriver session");
        }
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        self.quit();
    }
}

impl BrowserDriver for WebDriverSession {
    fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.send(Method::POST, "url", Some(json!({ "url": url })), "navigate")?;
        Ok(())
    }

    fn current_url(&mut self) -> Result<String, BrowserError> {
        let value = self.send(Method::GET, "url", None, "current url")?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BrowserError::Protocol {
                command: "current url".into(),
                error: "url is not a string".into(),
            })
    }

    fn find_elements_by_tag(&mut self, tag: &str) -> Result<Vec<ElementRef>, BrowserError> {
        let value = self
            .send(
                Method::POST,
                "elements",
                Some(json!({ "using": "tag name", "value": tag })),
                "find elements by tag",
            )
            .map_err(|e| with_selector(e, tag))?;
        element_refs(&value)
    }

    fn find_elements_by_xpath(&mut self, xpath: &str) -> Result<Vec<ElementRef>, BrowserError> {
        let value = self
            .send(
                Method::POST,
                "elements",
                Some(json!({ "using": "xpath", "value": xpath })),
                "find elements by xpath",
            )
            .map_err(|e| with_selector(e, xpath))?;
        element_refs(&value)
    }

    fn find_child_elements_by_xpath(
        &mut self,
        parent: &ElementRef,
        xpath: &str,
    ) -> Result<Vec<ElementRef>, BrowserError> {
        let value = self
            .send(
                Method::POST,
                &format!("element/{}/elements", parent),
                Some(json!({ "using": "xpath", "value": xpath })),
                "find child elements",
            )
            .map_err(|e| with_selector(e, xpath))?;
        element_refs(&value)
    }

    fn describe(&mut self, element: &ElementRef) -> Result<ElementDescription, BrowserError> {
        let value = self.execute(JS_DESCRIBE, vec![element_arg(element)], "describe element")?;
        serde_json::from_value(value).map_err(|e| BrowserError::Json {
            context: "element description".into(),
            source: e,
        })
    }

    fn tag_name(&mut self, element: &ElementRef) -> Result<String, BrowserError> {
        let value = self.get_element(element, "name", "tag name")?;
        Ok(value.as_str().unwrap_or_default().to_lowercase())
    }

    fn is_displayed(&mut self, element: &ElementRef) -> Result<bool, BrowserError> {
        let value = self.get_element(element, "displayed", "is displayed")?;
        Ok(value.as_bool().unwrap_or(false))
    }

    fn is_enabled(&mut self, element: &ElementRef) -> Result<bool, BrowserError> {
        let value = self.get_element(element, "enabled", "is enabled")?;
        Ok(value.as_bool().unwrap_or(false))
    }

    fn attribute(
        &mut self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        let value = self.get_element(element, &format!("attribute/{}", name), "attribute")?;
        Ok(value.as_str().map(str::to_string))
    }

    fn attributes(&mut self, element: &ElementRef) -> Result<Vec<(String, String)>, BrowserError> {
        let value = self.execute(JS_ATTRIBUTES, vec![element_arg(element)], "attributes")?;
        serde_json::from_value(value).map_err(|e| BrowserError::Json {
            context: "attribute list".into(),
            source: e,
        })
    }

    fn text(&mut self, element: &ElementRef) -> Result<String, BrowserError> {
        let value = self.get_element(element, "text", "text")?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    fn rect(&mut self, element: &ElementRef) -> Result<ElementRect, BrowserError> {
        let value = self.get_element(element, "rect", "rect")?;
        serde_json::from_value(value).map_err(|e| BrowserError::Json {
            context: "element rect".into(),
            source: e,
        })
    }

    fn css_value(&mut self, element: &ElementRef, property: &str) -> Result<String, BrowserError> {
        let value = self.get_element(element, &format!("css/{}", property), "css value")?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    fn click(&mut self, element: &ElementRef) -> Result<(), BrowserError> {
        self.send(
            Method::POST,
            &format!("element/{}/click", element),
            None,
            "click",
        )?;
        Ok(())
    }

    fn js_click(&mut self, element: &ElementRef) -> Result<(), BrowserError> {
        self.execute(JS_CLICK, vec![element_arg(element)], "script click")?;
        Ok(())
    }

    fn suppress_print_dialogs(&mut self) -> Result<(), BrowserError> {
        self.execute(JS_PATCH_PRINT, Vec::new(), "patch print")?;
        Ok(())
    }

    fn dismiss_alert(&mut self) -> Result<bool, BrowserError> {
        match self.send(Method::POST, "alert/dismiss", None, "dismiss alert") {
            Ok(_) => Ok(true),
            Err(BrowserError::NoSuchAlert) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn window_handles(&mut self) -> Result<Vec<String>, BrowserError> {
        let value = self.send(Method::GET, "window/handles", None, "window handles")?;
        serde_json::from_value(value).map_err(|e| BrowserError::Json {
            context: "window handles".into(),
            source: e,
        })
    }

    fn switch_to_window(&mut self, handle: &str) -> Result<(), BrowserError> {
        self.send(
            Method::POST,
            "window",
            Some(json!({ "handle": handle })),
            "switch window",
        )?;
        Ok(())
    }

    fn close_window(&mut self) -> Result<(), BrowserError> {
        self.send(Method::DELETE, "window", None, "close window")?;
        if let Some(main) = self.main_window.clone() {
            let remaining = self.window_handles()?;
            if !remaining.contains(&main) {
                warn!("main window was closed");
                self.main_window = remaining.first().cloned();
            }
        }
        Ok(())
    }

    fn set_window_size(&mut self, width: u32, height: u32) -> Result<(), BrowserError> {
        self.send(
            Method::POST,
            "window/rect",
            Some(json!({ "width": width, "height": height })),
            "set window rect",
        )?;
        Ok(())
    }
}
