use element_locator::{
    Activity, BrowserDriver, ClickEffect, Element, ElementLocator, FakeBrowser, FakeNode, FakePage,
    LocatorConfig, get_all_by_xpath,
};

pub const HOME: &str = "https://site.test/";

pub fn browser_with(page: FakePage) -> FakeBrowser {
    FakeBrowser::new().with_page(page)
}

/// Browser already sitting on `page`.
pub fn loaded(page: FakePage) -> FakeBrowser {
    let url = page.url.clone();
    let mut browser = browser_with(page);
    browser.navigate(&url).unwrap();
    browser
}

pub fn home_activity() -> Activity {
    Activity::new("home", HOME)
}

pub fn locator_for(page: FakePage, tags: &[&str]) -> ElementLocator<FakeBrowser> {
    ElementLocator::with_config(
        browser_with(page),
        home_activity(),
        tags,
        LocatorConfig::default().without_delays(),
    )
}

pub fn by_id(driver: &mut dyn BrowserDriver, id: &str) -> Element {
    let found = get_all_by_xpath(driver, &format!("//*[@id='{}']", id)).unwrap();
    assert_eq!(found.len(), 1, "expected exactly one element with id {}", id);
    found.into_iter().next().unwrap()
}

pub fn ids(elements: &[Element]) -> Vec<String> {
    elements
        .iter()
        .map(|e| e.element_id().unwrap_or(e.source()).to_string())
        .collect()
}

/// `<button id=a>` shows `<div id=b>`; `<div id=c>` is never shown.
pub fn reveal_page() -> FakePage {
    FakePage::new(HOME)
        .child(FakeNode::new("button").id("a").on_click(ClickEffect::Show("b".into())))
        .child(FakeNode::new("div").id("b").hidden())
        .child(FakeNode::new("div").id("c").hidden())
}

/// Fixed full-viewport backdrop holding a 300x200 dialog, opened by `<button id=open>`.
pub fn modal_page() -> FakePage {
    FakePage::new(HOME)
        .child(
            FakeNode::new("button")
                .id("open")
                .text("Open")
                .on_click(ClickEffect::Show("backdrop".into())),
        )
        .child(
            FakeNode::new("div")
                .id("backdrop")
                .hidden()
                .backdrop_css()
                .rect(0.0, 0.0, 1280.0, 800.0)
                .child(
                    FakeNode::new("div")
                        .id("dialog")
                        .rect(40.0, 40.0, 300.0, 200.0)
                        .child(FakeNode::new("button").id("close").text("Close")),
                ),
        )
}
