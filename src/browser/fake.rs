use std::collections::HashMap;

use crate::browser::driver::{BrowserDriver, ElementDescription, ElementRect, ElementRef};
use crate::error::BrowserError;

// ============================================================================
// Page templates
// ============================================================================

/// What happens when a fake element is clicked.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickEffect {
    /// Make the element with this `id` attribute displayed
    Show(String),
    Hide(String),
    Toggle(String),
    /// Detach the element (and its subtree) from the DOM
    Remove(String),
    /// Change a computed style of the element with this `id`; the markup stays the same
    SetCss {
        id: String,
        property: String,
        value: String,
    },
    /// Load another page in the current window
    Navigate(String),
    /// Change the URL without reloading (history API / fragment)
    SetUrl(String),
    OpenTab(String),
    Alert,
    /// Framework re-render: every native reference goes stale, the DOM stays
    Rerender,
}

/// Builder for one element of a fake page.
#[derive(Debug, Clone)]
pub struct FakeNode {
    tag: String,
    attrs: Vec<(String, String)>,
    text: String,
    rect: ElementRect,
    displayed: bool,
    enabled: bool,
    interactable: bool,
    css: HashMap<String, String>,
    on_click: Vec<ClickEffect>,
    reveal_after_queries: Option<usize>,
    vanishes_when_described: bool,
    children: Vec<FakeNode>,
}

impl FakeNode {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_lowercase(),
            attrs: Vec::new(),
            text: String::new(),
            rect: ElementRect::new(0.0, 0.0, 100.0, 20.0),
            displayed: true,
            enabled: true,
            interactable: true,
            css: HashMap::new(),
            on_click: Vec::new(),
            reveal_after_queries: None,
            vanishes_when_described: false,
            children: Vec::new(),
        }
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.retain(|(n, _)| n != name);
        self.attrs.push((name.to_string(), value.to_string()));
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn rect(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.rect = ElementRect::new(x, y, width, height);
        self
    }

    /// Starts out with `display: none`.
    pub fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Native clicks fail with "element not interactable"; script clicks still work.
    pub fn not_interactable(mut self) -> Self {
        self.interactable = false;
        self
    }

    pub fn css(mut self, property: &str, value: &str) -> Self {
        self.css.insert(property.to_string(), value.to_string());
        self
    }

    /// `position: fixed` pinned to all four viewport edges.
    pub fn backdrop_css(self) -> Self {
        self.css("position", "fixed")
            .css("top", "0px")
            .css("right", "0px")
            .css("bottom", "0px")
            .css("left", "0px")
    }

    pub fn on_click(mut self, effect: ClickEffect) -> Self {
        self.on_click.push(effect);
        self
    }

    /// Hidden until the page has answered `n` element queries (lazy-loaded chrome).
    pub fn reveal_after_queries(mut self, n: usize) -> Self {
        self.displayed = false;
        self.reveal_after_queries = Some(n);
        self
    }

    /// Detached from the DOM the first time the driver describes it, so
    /// the node shows up in a query and is gone by the time it is wrapped.
    pub fn vanishing(mut self) -> Self {
        self.vanishes_when_described = true;
        self
    }

    pub fn child(mut self, child: FakeNode) -> Self {
        self.children.push(child);
        self
    }
}

/// A page the fake browser can load: `<html><body>...</body></html>`.
#[derive(Debug, Clone)]
pub struct FakePage {
    pub url: String,
    body: Vec<FakeNode>,
}

impl FakePage {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            body: Vec::new(),
        }
    }

    pub fn child(mut self, node: FakeNode) -> Self {
        self.body.push(node);
        self
    }
}

// ============================================================================
// Live document
// ============================================================================

#[derive(Debug, Clone)]
struct NodeState {
    tag: String,
    attrs: Vec<(String, String)>,
    text: String,
    rect: ElementRect,
    displayed: bool,
    enabled: bool,
    interactable: bool,
    css: HashMap<String, String>,
    on_click: Vec<ClickEffect>,
    reveal_after_queries: Option<usize>,
    vanishes_when_described: bool,
    parent: Option<usize>,
    children: Vec<usize>,
    removed: bool,
}

impl NodeState {
    fn bare(tag: &str, parent: Option<usize>) -> Self {
        NodeState {
            tag: tag.to_string(),
            attrs: Vec::new(),
            text: String::new(),
            rect: ElementRect::new(0.0, 0.0, 1280.0, 800.0),
            displayed: true,
            enabled: true,
            interactable: true,
            css: HashMap::new(),
            on_click: Vec::new(),
            reveal_after_queries: None,
            vanishes_when_described: false,
            parent,
            children: Vec::new(),
            removed: false,
        }
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Virtual document node that parents `<html>`.
const DOC: usize = usize::MAX;

#[derive(Debug, Clone)]
struct Document {
    generation: u64,
    nodes: Vec<NodeState>,
    queries: usize,
}

impl Document {
    fn build(page: Option<&FakePage>, generation: u64) -> Self {
        let mut nodes = vec![NodeState::bare("html", None), NodeState::bare("body", Some(0))];
        nodes[0].children.push(1);
        if let Some(page) = page {
            for node in &page.body {
                Self::push(&mut nodes, node, 1);
            }
        }
        Document {
            generation,
            nodes,
            queries: 0,
        }
    }

    fn push(nodes: &mut Vec<NodeState>, node: &FakeNode, parent: usize) {
        let index = nodes.len();
        nodes.push(NodeState {
            tag: node.tag.clone(),
            attrs: node.attrs.clone(),
            text: node.text.clone(),
            rect: node.rect,
            displayed: node.displayed,
            enabled: node.enabled,
            interactable: node.interactable,
            css: node.css.clone(),
            on_click: node.on_click.clone(),
            reveal_after_queries: node.reveal_after_queries,
            vanishes_when_described: node.vanishes_when_described,
            parent: Some(parent),
            children: Vec::new(),
            removed: false,
        });
        nodes[parent].children.push(index);
        for child in &node.children {
            Self::push(nodes, child, index);
        }
    }

    fn children(&self, node: usize) -> Vec<usize> {
        if node == DOC {
            return vec![0];
        }
        self.nodes[node]
            .children
            .iter()
            .copied()
            .filter(|&c| !self.nodes[c].removed)
            .collect()
    }

    fn descendants(&self, node: usize, out: &mut Vec<usize>) {
        for child in self.children(node) {
            out.push(child);
            self.descendants(child, out);
        }
    }

    fn parent(&self, node: usize) -> Option<usize> {
        if node == DOC {
            return None;
        }
        Some(self.nodes[node].parent.unwrap_or(DOC))
    }

    fn is_displayed(&self, node: usize) -> bool {
        let mut current = Some(node);
        while let Some(index) = current {
            let state = &self.nodes[index];
            if state.removed || !state.displayed {
                return false;
            }
            current = state.parent;
        }
        true
    }

    fn find_by_id(&self, id: &str) -> Option<usize> {
        (0..self.nodes.len()).find(|&i| !self.nodes[i].removed && self.nodes[i].attr("id") == Some(id))
    }

    fn remove(&mut self, node: usize) {
        self.nodes[node].removed = true;
        for child in self.nodes[node].children.clone() {
            self.remove(child);
        }
    }

    fn tick(&mut self) {
        self.queries += 1;
        for node in self.nodes.iter_mut() {
            if let Some(n) = node.reveal_after_queries {
                if self.queries >= n {
                    node.displayed = true;
                    node.reveal_after_queries = None;
                }
            }
        }
    }

    fn xpath_of(&self, node: usize) -> String {
        let mut parts = Vec::new();
        let mut current = node;
        loop {
            let state = &self.nodes[current];
            let siblings = match state.parent {
                Some(p) => self.nodes[p].children.clone(),
                None => vec![current],
            };
            let nth = siblings
                .iter()
                .take_while(|&&s| s != current)
                .filter(|&&s| !self.nodes[s].removed && self.nodes[s].tag == state.tag)
                .count()
                + 1;
            parts.push(format!("{}[{}]", state.tag, nth));
            match state.parent {
                Some(p) => current = p,
                None => break,
            }
        }
        parts.reverse();
        format!("/{}", parts.join("/"))
    }

    fn outer_html(&self, node: usize) -> String {
        let state = &self.nodes[node];
        let mut html = format!("<{}", state.tag);
        for (name, value) in &state.attrs {
            html.push_str(&format!(" {}=\"{}\"", name, value));
        }
        if !state.displayed {
            html.push_str(" style=\"display: none;\"");
        }
        html.push('>');
        html.push_str(&state.text);
        for child in self.children(node) {
            html.push_str(&self.outer_html(child));
        }
        html.push_str(&format!("</{}>", state.tag));
        html
    }

    fn text(&self, node: usize) -> String {
        if !self.is_displayed(node) {
            return String::new();
        }
        let mut parts = vec![self.nodes[node].text.clone()];
        for child in self.children(node) {
            parts.push(self.text(child));
        }
        parts
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ============================================================================
// XPath subset
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    SelfNode,
}

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    Position(usize),
    AttrEquals(String, String),
    /// `self::a or self::div[@role='button']`
    SelfAny(Vec<(String, Option<(String, String)>)>),
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    descendant_prefix: bool,
    axis: Axis,
    name: Option<String>,
    predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
struct XPath {
    absolute: bool,
    steps: Vec<Step>,
}

fn invalid(selector: &str, message: &str) -> BrowserError {
    BrowserError::InvalidSelector {
        selector: selector.to_string(),
        message: message.to_string(),
    }
}

/// Split on `/` outside of brackets and quotes.
fn split_steps(rest: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in rest.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, '/') if depth == 0 => {
                parts.push(&rest[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&rest[start..]);
    parts
}

fn parse_attr_test(selector: &str, text: &str) -> Result<(String, String), BrowserError> {
    let text = text.trim();
    let body = text
        .strip_prefix('@')
        .ok_or_else(|| invalid(selector, "expected attribute test"))?;
    let (name, value) = body
        .split_once('=')
        .ok_or_else(|| invalid(selector, "expected '=' in attribute test"))?;
    let value = value.trim();
    let unquoted = value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
        .ok_or_else(|| invalid(selector, "attribute value must be quoted"))?;
    Ok((name.trim().to_string(), unquoted.to_string()))
}

fn parse_predicate(selector: &str, text: &str) -> Result<Predicate, BrowserError> {
    let text = text.trim();
    if let Ok(n) = text.parse::<usize>() {
        if n == 0 {
            return Err(invalid(selector, "positions start at 1"));
        }
        return Ok(Predicate::Position(n));
    }
    if text.starts_with('@') {
        let (name, value) = parse_attr_test(selector, text)?;
        return Ok(Predicate::AttrEquals(name, value));
    }
    let mut options = Vec::new();
    for part in text.split(" or ") {
        let part = part.trim();
        let body = part
            .strip_prefix("self::")
            .ok_or_else(|| invalid(selector, "unsupported predicate"))?;
        match body.split_once('[') {
            Some((name, attr)) => {
                let attr = attr
                    .strip_suffix(']')
                    .ok_or_else(|| invalid(selector, "unterminated predicate"))?;
                options.push((name.trim().to_string(), Some(parse_attr_test(selector, attr)?)));
            }
            None => options.push((body.to_string(), None)),
        }
    }
    Ok(Predicate::SelfAny(options))
}

fn parse_step(selector: &str, text: &str, descendant_prefix: bool) -> Result<Step, BrowserError> {
    let bracket = text.find('[').unwrap_or(text.len());
    let (head, mut tail) = text.split_at(bracket);
    let (axis, name) = match head.split_once("::") {
        Some((axis, name)) => {
            let axis = match axis {
                "child" => Axis::Child,
                "descendant" => Axis::Descendant,
                "descendant-or-self" => Axis::DescendantOrSelf,
                "parent" => Axis::Parent,
                "self" => Axis::SelfNode,
                _ => return Err(invalid(selector, "unsupported axis")),
            };
            (axis, name)
        }
        None if head == "." => (Axis::SelfNode, "*"),
        None if head == ".." => (Axis::Parent, "*"),
        None => (Axis::Child, head),
    };
    if name.is_empty()
        || !(name == "*" || name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'))
    {
        return Err(invalid(selector, "bad node test"));
    }

    let mut predicates = Vec::new();
    while !tail.is_empty() {
        if !tail.starts_with('[') {
            return Err(invalid(selector, "unexpected characters after node test"));
        }
        let mut depth = 0usize;
        let mut end = None;
        for (i, c) in tail.char_indices() {
            match c {
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let end = end.ok_or_else(|| invalid(selector, "unterminated predicate"))?;
        predicates.push(parse_predicate(selector, &tail[1..end])?);
        tail = &tail[end + 1..];
    }

    Ok(Step {
        descendant_prefix,
        axis,
        name: if name == "*" { None } else { Some(name.to_lowercase()) },
        predicates,
    })
}

fn parse_xpath(selector: &str) -> Result<XPath, BrowserError> {
    let s = selector.trim();
    let (absolute, first_prefix, rest) = if let Some(rest) = s.strip_prefix("//") {
        (true, true, rest)
    } else if let Some(rest) = s.strip_prefix('/') {
        (true, false, rest)
    } else if let Some(rest) = s.strip_prefix(".//") {
        (false, true, rest)
    } else if let Some(rest) = s.strip_prefix("./") {
        (false, false, rest)
    } else {
        (false, false, s)
    };
    if rest.is_empty() {
        return Err(invalid(selector, "empty path"));
    }

    let mut steps = Vec::new();
    let mut prefix = first_prefix;
    for part in split_steps(rest) {
        if part.is_empty() {
            if prefix {
                return Err(invalid(selector, "unexpected '/'"));
            }
            prefix = true;
            continue;
        }
        steps.push(parse_step(selector, part, prefix)?);
        prefix = false;
    }
    if prefix {
        return Err(invalid(selector, "path ends with '/'"));
    }
    Ok(XPath { absolute, steps })
}

impl Document {
    fn matches_name(&self, node: usize, name: &Option<String>) -> bool {
        node != DOC && name.as_ref().is_none_or(|n| &self.nodes[node].tag == n)
    }

    fn predicate_holds(&self, node: usize, predicate: &Predicate) -> bool {
        match predicate {
            Predicate::Position(_) => true,
            Predicate::AttrEquals(name, value) => self.nodes[node].attr(name) == Some(value),
            Predicate::SelfAny(options) => options.iter().any(|(tag, attr)| {
                &self.nodes[node].tag == tag
                    && attr
                        .as_ref()
                        .is_none_or(|(n, v)| self.nodes[node].attr(n) == Some(v))
            }),
        }
    }

    fn evaluate(&self, xpath: &XPath, context: usize) -> Vec<usize> {
        let mut current = vec![if xpath.absolute { DOC } else { context }];
        for step in &xpath.steps {
            if step.descendant_prefix {
                let mut expanded = Vec::new();
                for &node in &current {
                    expanded.push(node);
                    self.descendants(node, &mut expanded);
                }
                current = expanded;
            }
            let mut next = Vec::new();
            for &node in &current {
                let mut candidates = match step.axis {
                    Axis::Child => self.children(node),
                    Axis::Descendant => {
                        let mut out = Vec::new();
                        self.descendants(node, &mut out);
                        out
                    }
                    Axis::DescendantOrSelf => {
                        let mut out = vec![node];
                        self.descendants(node, &mut out);
                        out
                    }
                    Axis::Parent => self.parent(node).into_iter().collect(),
                    Axis::SelfNode => vec![node],
                };
                candidates.retain(|&c| self.matches_name(c, &step.name));
                for predicate in &step.predicates {
                    candidates = match predicate {
                        Predicate::Position(n) => candidates.get(n - 1).copied().into_iter().collect(),
                        other => candidates
                            .into_iter()
                            .filter(|&c| self.predicate_holds(c, other))
                            .collect(),
                    };
                }
                next.extend(candidates);
            }
            next.sort_unstable();
            next.dedup();
            current = next;
        }
        current.retain(|&n| n != DOC);
        current
    }
}

// ============================================================================
// FakeBrowser
// ============================================================================

#[derive(Debug, Clone)]
struct FakeWindow {
    handle: String,
    url: String,
}

/// In-memory browser implementing `BrowserDriver`.
///
/// Every navigation rebuilds the page from its template and bumps the
/// generation, so native references from before the navigation go stale
/// exactly like they do in a real browser.
#[derive(Debug)]
pub struct FakeBrowser {
    pages: HashMap<String, FakePage>,
    document: Document,
    windows: Vec<FakeWindow>,
    current_window: usize,
    next_window: usize,
    generation: u64,
    alert_open: bool,
    session_lost: bool,
    window_size: Option<(u32, u32)>,
    navigations: Vec<String>,
    clicks: Vec<String>,
    print_patched: bool,
    calls: HashMap<String, usize>,
    failures: Vec<(String, usize, String)>,
}

impl Default for FakeBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBrowser {
    pub fn new() -> Self {
        FakeBrowser {
            pages: HashMap::new(),
            document: Document::build(None, 0),
            windows: vec![FakeWindow {
                handle: "window-0".into(),
                url: "about:blank".into(),
            }],
            current_window: 0,
            next_window: 1,
            generation: 0,
            alert_open: false,
            session_lost: false,
            window_size: None,
            navigations: Vec::new(),
            clicks: Vec::new(),
            print_patched: false,
            calls: HashMap::new(),
            failures: Vec::new(),
        }
    }

    pub fn with_page(mut self, page: FakePage) -> Self {
        self.add_page(page);
        self
    }

    pub fn add_page(&mut self, page: FakePage) {
        self.pages.insert(page.url.clone(), page);
    }

    /// URLs passed to `navigate`, in order.
    pub fn navigations(&self) -> &[String] {
        &self.navigations
    }

    /// `id` (or XPath when there is none) of every clicked element, in order.
    pub fn clicks(&self) -> &[String] {
        &self.clicks
    }

    pub fn open_windows(&self) -> usize {
        self.windows.len()
    }

    pub fn alert_open(&self) -> bool {
        self.alert_open
    }

    pub fn print_patched(&self) -> bool {
        self.print_patched
    }

    pub fn window_size(&self) -> Option<(u32, u32)> {
        self.window_size
    }

    /// Invalidate every native reference without changing the DOM.
    pub fn rerender(&mut self) {
        self.generation += 1;
        self.document.generation = self.generation;
    }

    pub fn set_displayed(&mut self, id: &str, displayed: bool) {
        if let Some(node) = self.document.find_by_id(id) {
            self.document.nodes[node].displayed = displayed;
        }
    }

    pub fn remove_element(&mut self, id: &str) {
        if let Some(node) = self.document.find_by_id(id) {
            self.document.remove(node);
        }
    }

    /// Every subsequent call fails as if the browser crashed.
    pub fn kill_session(&mut self) {
        self.session_lost = true;
    }

    /// Make the `nth` call (1-based) of `command` fail with a protocol error.
    /// Commands: `navigate`, `script click`, `element rect`.
    pub fn fail_call(&mut self, command: &str, nth: usize, error: &str) {
        self.failures.push((command.to_string(), nth, error.to_string()));
    }

    fn scripted_failure(&mut self, command: &str) -> Result<(), BrowserError> {
        let count = self.calls.entry(command.to_string()).or_insert(0);
        *count += 1;
        let count = *count;
        match self.failures.iter().find(|(c, n, _)| c == command && *n == count) {
            Some((_, _, error)) => Err(BrowserError::Protocol {
                command: command.to_string(),
                error: error.clone(),
            }),
            None => Ok(()),
        }
    }

    fn check_session(&self) -> Result<(), BrowserError> {
        if self.session_lost {
            return Err(BrowserError::SessionLost("fake session terminated".into()));
        }
        Ok(())
    }

    fn in_main_window(&self) -> bool {
        self.current_window == 0
    }

    fn load(&mut self, url: &str) {
        self.generation += 1;
        let key = url.split('#').next().unwrap_or(url);
        let page = self.pages.get(url).or_else(|| self.pages.get(key));
        self.document = Document::build(page, self.generation);
        self.alert_open = false;
        self.print_patched = false;
        self.windows[0].url = url.to_string();
    }

    fn to_ref(&self, node: usize) -> ElementRef {
        ElementRef::new(format!("{}:{}", self.document.generation, node))
    }

    fn node(&self, element: &ElementRef) -> Result<usize, BrowserError> {
        self.check_session()?;
        let stale = || BrowserError::StaleElement(element.to_string());
        let (generation, index) = element.as_str().split_once(':').ok_or_else(stale)?;
        let generation: u64 = generation.parse().map_err(|_| stale())?;
        let index: usize = index.parse().map_err(|_| stale())?;
        if !self.in_main_window()
            || generation != self.document.generation
            || index >= self.document.nodes.len()
            || self.document.nodes[index].removed
        {
            return Err(stale());
        }
        Ok(index)
    }

    fn query(&mut self, xpath: &str, context: Option<usize>) -> Result<Vec<ElementRef>, BrowserError> {
        self.check_session()?;
        let parsed = parse_xpath(xpath)?;
        if !parsed.absolute && context.is_none() {
            return Err(invalid(xpath, "relative path without a context element"));
        }
        if !self.in_main_window() {
            return Ok(Vec::new());
        }
        self.document.tick();
        let nodes = self.document.evaluate(&parsed, context.unwrap_or(DOC));
        Ok(nodes.into_iter().map(|n| self.to_ref(n)).collect())
    }

    fn apply(&mut self, effects: Vec<ClickEffect>) {
        for effect in effects {
            match effect {
                ClickEffect::Show(id) => self.set_displayed(&id, true),
                ClickEffect::Hide(id) => self.set_displayed(&id, false),
                ClickEffect::Toggle(id) => {
                    if let Some(node) = self.document.find_by_id(&id) {
                        let state = &mut self.document.nodes[node];
                        state.displayed = !state.displayed;
                    }
                }
                ClickEffect::Remove(id) => self.remove_element(&id),
                ClickEffect::SetCss { id, property, value } => {
                    if let Some(node) = self.document.find_by_id(&id) {
                        self.document.nodes[node].css.insert(property, value);
                    }
                }
                ClickEffect::Navigate(url) => {
                    self.load(&url);
                    return;
                }
                ClickEffect::SetUrl(url) => self.windows[0].url = url,
                ClickEffect::OpenTab(url) => {
                    let handle = format!("window-{}", self.next_window);
                    self.next_window += 1;
                    self.windows.push(FakeWindow { handle, url });
                }
                ClickEffect::Alert => self.alert_open = true,
                ClickEffect::Rerender => self.rerender(),
            }
        }
    }

    fn record_click(&mut self, node: usize) {
        let label = self.document.nodes[node]
            .attr("id")
            .map(str::to_string)
            .unwrap_or_else(|| self.document.xpath_of(node));
        self.clicks.push(label);
    }
}

impl BrowserDriver for FakeBrowser {
    fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.check_session()?;
        self.scripted_failure("navigate")?;
        self.navigations.push(url.to_string());
        if self.in_main_window() {
            self.load(url);
        } else {
            self.windows[self.current_window].url = url.to_string();
        }
        Ok(())
    }

    fn current_url(&mut self) -> Result<String, BrowserError> {
        self.check_session()?;
        Ok(self.windows[self.current_window].url.clone())
    }

    fn find_elements_by_tag(&mut self, tag: &str) -> Result<Vec<ElementRef>, BrowserError> {
        if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(invalid(tag, "not a tag name"));
        }
        self.query(&format!("//{}", tag.to_lowercase()), None)
    }

    fn find_elements_by_xpath(&mut self, xpath: &str) -> Result<Vec<ElementRef>, BrowserError> {
        self.query(xpath, None)
    }

    fn find_child_elements_by_xpath(
        &mut self,
        parent: &ElementRef,
        xpath: &str,
    ) -> Result<Vec<ElementRef>, BrowserError> {
        let node = self.node(parent)?;
        self.query(xpath, Some(node))
    }

    fn describe(&mut self, element: &ElementRef) -> Result<ElementDescription, BrowserError> {
        let node = self.node(element)?;
        if self.document.nodes[node].vanishes_when_described {
            self.document.remove(node);
            return Err(BrowserError::StaleElement(element.to_string()));
        }
        Ok(ElementDescription {
            tag_name: self.document.nodes[node].tag.clone(),
            xpath: self.document.xpath_of(node),
            outer_html: self.document.outer_html(node),
        })
    }

    fn tag_name(&mut self, element: &ElementRef) -> Result<String, BrowserError> {
        let node = self.node(element)?;
        Ok(self.document.nodes[node].tag.clone())
    }

    fn is_displayed(&mut self, element: &ElementRef) -> Result<bool, BrowserError> {
        let node = self.node(element)?;
        Ok(self.document.is_displayed(node))
    }

    fn is_enabled(&mut self, element: &ElementRef) -> Result<bool, BrowserError> {
        let node = self.node(element)?;
        Ok(self.document.nodes[node].enabled)
    }

    fn attribute(
        &mut self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        let node = self.node(element)?;
        Ok(self.document.nodes[node].attr(name).map(str::to_string))
    }

    fn attributes(&mut self, element: &ElementRef) -> Result<Vec<(String, String)>, BrowserError> {
        let node = self.node(element)?;
        Ok(self.document.nodes[node].attrs.clone())
    }

    fn text(&mut self, element: &ElementRef) -> Result<String, BrowserError> {
        let node = self.node(element)?;
        Ok(self.document.text(node))
    }

    fn rect(&mut self, element: &ElementRef) -> Result<ElementRect, BrowserError> {
        let node = self.node(element)?;
        self.scripted_failure("element rect")?;
        if !self.document.is_displayed(node) {
            return Ok(ElementRect::default());
        }
        Ok(self.document.nodes[node].rect)
    }

    fn css_value(&mut self, element: &ElementRef, property: &str) -> Result<String, BrowserError> {
        let node = self.node(element)?;
        let value = self.document.nodes[node].css.get(property).cloned();
        Ok(value.unwrap_or_else(|| match property {
            "position" => "static".to_string(),
            "display" if !self.document.is_displayed(node) => "none".to_string(),
            "display" => "block".to_string(),
            _ => "auto".to_string(),
        }))
    }

    fn click(&mut self, element: &ElementRef) -> Result<(), BrowserError> {
        let node = self.node(element)?;
        let state = &self.document.nodes[node];
        if !state.interactable || !self.document.is_displayed(node) {
            return Err(BrowserError::NotInteractable(format!(
                "<{}> could not be scrolled into view",
                state.tag
            )));
        }
        self.record_click(node);
        let effects = self.document.nodes[node].on_click.clone();
        self.apply(effects);
        Ok(())
    }

    fn js_click(&mut self, element: &ElementRef) -> Result<(), BrowserError> {
        let node = self.node(element)?;
        self.scripted_failure("script click")?;
        self.record_click(node);
        let effects = self.document.nodes[node].on_click.clone();
        self.apply(effects);
        Ok(())
    }

    fn suppress_print_dialogs(&mut self) -> Result<(), BrowserError> {
        self.check_session()?;
        self.print_patched = true;
        Ok(())
    }

    fn dismiss_alert(&mut self) -> Result<bool, BrowserError> {
        self.check_session()?;
        Ok(std::mem::replace(&mut self.alert_open, false))
    }

    fn window_handles(&mut self) -> Result<Vec<String>, BrowserError> {
        self.check_session()?;
        Ok(self.windows.iter().map(|w| w.handle.clone()).collect())
    }

    fn switch_to_window(&mut self, handle: &str) -> Result<(), BrowserError> {
        self.check_session()?;
        self.current_window = self
            .windows
            .iter()
            .position(|w| w.handle == handle)
            .ok_or_else(|| BrowserError::SessionLost(format!("no such window: {}", handle)))?;
        Ok(())
    }

    fn close_window(&mut self) -> Result<(), BrowserError> {
        self.check_session()?;
        if self.current_window == 0 {
            return Err(BrowserError::Protocol {
                command: "close window".into(),
                error: "refusing to close the main window".into(),
            });
        }
        self.windows.remove(self.current_window);
        self.current_window = 0;
        Ok(())
    }

    fn set_window_size(&mut self, width: u32, height: u32) -> Result<(), BrowserError> {
        self.check_session()?;
        self.window_size = Some((width, height));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn browser() -> FakeBrowser {
        let page = FakePage::new("https://site.test/")
            .child(FakeNode::new("div").id("first").child(FakeNode::new("a").id("link")))
            .child(
                FakeNode::new("div")
                    .id("second")
                    .attr("role", "button")
                    .child(FakeNode::new("span").attr("role", "button"))
                    .child(FakeNode::new("button").id("btn")),
            );
        let mut browser = FakeBrowser::new().with_page(page);
        browser.navigate("https://site.test/").unwrap();
        browser
    }

    fn ids(browser: &mut FakeBrowser, refs: &[ElementRef]) -> Vec<String> {
        refs.iter()
            .map(|r| {
                let d = browser.describe(r).unwrap();
                browser.attribute(r, "id").unwrap().unwrap_or(d.xpath)
            })
            .collect()
    }

    #[test]
    fn absolute_indexed_paths_round_trip() {
        let mut browser = browser();
        let divs = browser.find_elements_by_tag("div").unwrap();
        let second = browser.describe(&divs[1]).unwrap();
        assert_eq!(second.xpath, "/html[1]/body[1]/div[2]");

        let found = browser.find_elements_by_xpath(&second.xpath).unwrap();
        assert_eq!(found, vec![divs[1].clone()]);
    }

    #[test]
    fn descendant_union_query_keeps_document_order() {
        let mut browser = browser();
        let refs = browser
            .find_elements_by_xpath(
                "//body//descendant::*[self::a or self::button or self::div[@role='button'] or self::span[@role='button']]",
            )
            .unwrap();
        assert_eq!(
            ids(&mut browser, &refs),
            vec!["link", "second", "/html[1]/body[1]/div[2]/span[1]", "btn"]
        );
    }

    #[test]
    fn relative_axes_resolve_against_context() {
        let mut browser = browser();
        let second = browser.find_elements_by_xpath("//div[@id='second']").unwrap();
        let children = browser
            .find_child_elements_by_xpath(&second[0], "descendant::*")
            .unwrap();
        assert_eq!(children.len(), 2);
        let parent = browser
            .find_child_elements_by_xpath(&children[0], "./parent::*")
            .unwrap();
        assert_eq!(parent, second);
    }

    #[test]
    fn malformed_queries_are_rejected() {
        let mut browser = browser();
        for bad in ["//div[", "//", "/html/", "//div[@id=x]", "//following::div", "div"] {
            assert!(
                matches!(
                    browser.find_elements_by_xpath(bad),
                    Err(BrowserError::InvalidSelector { .. })
                ),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn navigation_makes_references_stale() {
        let mut browser = browser();
        let link = browser.find_elements_by_tag("a").unwrap().remove(0);
        browser.navigate("https://site.test/").unwrap();
        assert!(browser.is_displayed(&link).unwrap_err().is_lost());
    }
}
