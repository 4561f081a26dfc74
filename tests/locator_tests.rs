use element_locator::{
    Activity, BrowserDriver, BrowserError, ClickEffect, ElementLocator, FakeBrowser, FakeNode,
    FakePage, LocatorConfig, ProgressReport, ScanError, ScanPhase, SetupCommand, get_all_of_type,
};

use crate::common::pages::{HOME, by_id, ids, locator_for, reveal_page};

mod common;

// =========================================================================
// Helpers
// =========================================================================

fn analyzed(page: FakePage, tags: &[&str]) -> ElementLocator<FakeBrowser> {
    let mut locator = locator_for(page, tags);
    locator.analyze(false, None).unwrap();
    locator
}

fn retained_ids(locator: &ElementLocator<FakeBrowser>, tags: &[&str]) -> Vec<String> {
    ids(&locator.get_activatable_elements(Some(tags)))
}

fn activator_id(locator: &mut ElementLocator<FakeBrowser>, id: &str) -> Option<String> {
    let element = by_id(locator.driver_mut(), id);
    locator
        .activating_element(&element)
        .and_then(|a| a.element_id().map(str::to_string))
}

// =========================================================================
// Discovery
// =========================================================================

#[test]
fn hidden_div_is_attributed_to_its_activator() {
    let mut locator = analyzed(reveal_page(), &["div"]);

    assert_eq!(retained_ids(&locator, &["div"]), vec!["b"]);
    assert_eq!(activator_id(&mut locator, "b").as_deref(), Some("a"));

    let b = by_id(locator.driver_mut(), "b");
    assert_eq!(locator.is_displayed_from_start(&b), Some(false));
    assert_eq!(locator.phase(), ScanPhase::Finalized);
}

#[test]
fn never_shown_element_is_pruned() {
    let mut locator = analyzed(reveal_page(), &["div", "button"]);

    let retained = locator.get_activatable_elements(None);
    assert_eq!(ids(&retained), vec!["b", "a"]);
    let c = by_id(locator.driver_mut(), "c");
    assert_eq!(locator.is_displayed_from_start(&c), None);
    assert!(locator.records().all(|r| r.displayed_ever()));
}

#[test]
fn results_follow_target_order_then_dom_order() {
    let page = reveal_page()
        .child(FakeNode::new("div").id("d"))
        .child(FakeNode::new("a").id("link"));
    let locator = analyzed(page, &["a", "div", "button"]);
    assert_eq!(
        retained_ids(&locator, &["button", "div", "a"]),
        vec!["link", "b", "d", "a"]
    );
}

#[test]
fn visible_element_has_no_activator() {
    let page = reveal_page().child(FakeNode::new("div").id("d"));
    let mut locator = analyzed(page, &["div"]);

    let d = by_id(locator.driver_mut(), "d");
    assert_eq!(locator.is_displayed_from_start(&d), Some(true));
    assert_eq!(activator_id(&mut locator, "d"), None);
}

#[test]
fn first_activator_wins() {
    let page = FakePage::new(HOME)
        .child(FakeNode::new("button").id("first").on_click(ClickEffect::Show("b".into())))
        .child(FakeNode::new("button").id("second").on_click(ClickEffect::Show("b".into())))
        .child(FakeNode::new("div").id("b").hidden());
    let mut locator = analyzed(page, &["div"]);
    assert_eq!(activator_id(&mut locator, "b").as_deref(), Some("first"));
}

#[test]
fn sweep_order_does_not_change_retained_set() {
    let forward = FakePage::new(HOME)
        .child(FakeNode::new("button").id("x").on_click(ClickEffect::Show("p".into())))
        .child(FakeNode::new("button").id("y").on_click(ClickEffect::Show("q".into())))
        .child(FakeNode::new("section").id("p").hidden())
        .child(FakeNode::new("section").id("q").hidden());
    let backward = FakePage::new(HOME)
        .child(FakeNode::new("button").id("y").on_click(ClickEffect::Show("q".into())))
        .child(FakeNode::new("button").id("x").on_click(ClickEffect::Show("p".into())))
        .child(FakeNode::new("section").id("p").hidden())
        .child(FakeNode::new("section").id("q").hidden());

    let a = analyzed(forward, &["section"]);
    let b = analyzed(backward, &["section"]);
    assert_eq!(retained_ids(&a, &["section"]), retained_ids(&b, &["section"]));
}

#[test]
fn probes_do_not_leak_into_each_other() {
    let page = FakePage::new(HOME)
        .child(FakeNode::new("button").id("a").on_click(ClickEffect::Toggle("b".into())))
        .child(FakeNode::new("button").id("toggle").on_click(ClickEffect::Toggle("b".into())))
        .child(FakeNode::new("div").id("b").hidden());
    let mut locator = analyzed(page, &["div"]);

    assert_eq!(activator_id(&mut locator, "b").as_deref(), Some("a"));
    let navigations = locator.driver().navigations().len();
    // initial load plus one reset per probed activator (two buttons, one div)
    assert_eq!(navigations, 1 + 3);
}

#[test]
fn visible_element_hidden_by_a_probe_stays_retained() {
    let page = FakePage::new(HOME)
        .child(FakeNode::new("button").id("hide").on_click(ClickEffect::Hide("d".into())))
        .child(FakeNode::new("div").id("d"));
    let mut locator = analyzed(page, &["div"]);

    assert_eq!(retained_ids(&locator, &["div"]), vec!["d"]);
    let d = by_id(locator.driver_mut(), "d");
    assert_eq!(locator.is_displayed_from_start(&d), Some(true));
}

// =========================================================================
// Probes that change context
// =========================================================================

#[test]
fn context_changing_probes_are_not_diffed() {
    let page = FakePage::new(HOME)
        .child(
            FakeNode::new("a")
                .id("popup")
                .on_click(ClickEffect::Show("b".into()))
                .on_click(ClickEffect::OpenTab("https://other.test/".into())),
        )
        .child(
            FakeNode::new("button")
                .id("warn")
                .on_click(ClickEffect::Show("b".into()))
                .on_click(ClickEffect::Alert),
        )
        .child(FakeNode::new("button").id("a").on_click(ClickEffect::Show("b".into())))
        .child(FakeNode::new("div").id("b").hidden());
    let mut locator = analyzed(page, &["div"]);

    assert_eq!(activator_id(&mut locator, "b").as_deref(), Some("a"));
    assert_eq!(locator.driver().open_windows(), 1);
    assert!(!locator.driver().alert_open());
}

#[test]
fn page_change_is_undone_before_the_next_probe() {
    let page = reveal_page().child(
        FakeNode::new("a")
            .id("away")
            .on_click(ClickEffect::Navigate("https://example.com/".into())),
    );
    let mut locator = analyzed(page, &["div"]);

    assert_eq!(activator_id(&mut locator, "b").as_deref(), Some("a"));
    assert_eq!(locator.driver_mut().current_url().unwrap(), HOME);
    let navigations = locator.driver().navigations();
    let back = navigations.iter().filter(|u| u.as_str() == HOME).count();
    // initial load, undo of the page change, one reset per probe (a, away, b, c)
    assert_eq!(back, 1 + 1 + 4);
}

#[test]
fn final_url_follows_setup_navigation() {
    let start = FakePage::new("https://site.test/start")
        .child(FakeNode::new("div").id("enter").on_click(ClickEffect::Navigate(HOME.into())));
    let browser = FakeBrowser::new().with_page(start).with_page(reveal_page());
    let activity = Activity::new("entry", "https://site.test/start").with_setup(SetupCommand::Click {
        xpath: "//div[@id='enter']".into(),
    });

    let mut locator = ElementLocator::with_config(
        browser,
        activity,
        &["div"],
        LocatorConfig::default().without_delays(),
    );
    locator.analyze(false, None).unwrap();

    assert_eq!(locator.final_url(), HOME);
    assert_eq!(retained_ids(&locator, &["div"]), vec!["b"]);
}

// =========================================================================
// Resilience
// =========================================================================

#[test]
fn element_vanishing_during_scan_is_skipped() {
    let page = FakePage::new(HOME)
        .child(FakeNode::new("img").id("gone").vanishing())
        .child(FakeNode::new("img").id("stays"))
        .child(FakeNode::new("button").id("x"));
    let locator = analyzed(page, &["img", "button"]);
    assert_eq!(retained_ids(&locator, &["img", "button"]), vec!["stays", "x"]);
}

#[test]
fn element_removed_by_a_probe_is_skipped_in_the_diff() {
    let page = FakePage::new(HOME)
        .child(FakeNode::new("button").id("kill").on_click(ClickEffect::Remove("b".into())))
        .child(FakeNode::new("button").id("a").on_click(ClickEffect::Show("b".into())))
        .child(FakeNode::new("div").id("b").hidden());
    let mut locator = analyzed(page, &["div"]);
    assert_eq!(activator_id(&mut locator, "b").as_deref(), Some("a"));
}

#[test]
fn rerendering_probe_does_not_break_the_sweep() {
    let page = FakePage::new(HOME)
        .child(
            FakeNode::new("button")
                .id("a")
                .on_click(ClickEffect::Rerender)
                .on_click(ClickEffect::Show("b".into())),
        )
        .child(FakeNode::new("div").id("b").hidden());
    let mut locator = analyzed(page, &["div"]);
    assert_eq!(activator_id(&mut locator, "b").as_deref(), Some("a"));
}

#[test]
fn failed_reset_does_not_abort_the_sweep() {
    let page = FakePage::new(HOME)
        .child(FakeNode::new("button").id("a"))
        .child(FakeNode::new("button").id("b").on_click(ClickEffect::Show("c".into())))
        .child(FakeNode::new("div").id("c").hidden());
    let mut locator = locator_for(page, &["div"]);
    // the first reset after the initial load
    locator.driver_mut().fail_call("navigate", 2, "timeout: page load");

    locator.analyze(false, None).unwrap();
    assert_eq!(retained_ids(&locator, &["div"]), vec!["c"]);
    assert_eq!(activator_id(&mut locator, "c").as_deref(), Some("b"));
}

#[test]
fn session_loss_is_fatal() {
    let mut locator = locator_for(reveal_page(), &["div"]);
    locator.driver_mut().kill_session();

    let err = locator.analyze(false, None).unwrap_err();
    assert!(err.is_session_fatal());
    assert!(matches!(err, ScanError::Browser(BrowserError::SessionLost(_))));
}

#[test]
fn invalid_target_tag_propagates() {
    let mut locator = locator_for(reveal_page(), &["div!"]);
    let err = locator.analyze(true, None).unwrap_err();
    assert!(matches!(err, ScanError::InvalidSelector { .. }));
}

// =========================================================================
// Modes and lifecycle
// =========================================================================

#[test]
fn fake_mode_skips_the_sweep() {
    let mut locator = locator_for(reveal_page(), &["div", "button"]);
    locator.analyze(true, None).unwrap();

    assert!(locator.driver().clicks().is_empty());
    assert_eq!(retained_ids(&locator, &["div", "button"]), vec!["a"]);
}

#[test]
fn empty_target_set_skips_the_sweep() {
    let mut locator = locator_for(reveal_page(), &[]);
    locator.analyze(false, None).unwrap();

    assert!(locator.driver().clicks().is_empty());
    assert!(locator.get_activatable_elements(None).is_empty());
}

#[test]
fn analyze_runs_only_once() {
    let mut locator = analyzed(reveal_page(), &["div"]);
    let err = locator.analyze(false, None).unwrap_err();
    assert!(matches!(err, ScanError::AlreadyAnalyzed { ref phase } if phase == "finalized"));
}

#[test]
fn progress_reports_each_tag() {
    let mut locator = locator_for(reveal_page(), &["div", "button"]);
    let mut messages = Vec::new();
    let mut on_progress = |report: &ProgressReport| {
        messages.push(report.message().unwrap_or_default().to_string());
    };
    locator.analyze(true, Some(&mut on_progress)).unwrap();

    assert_eq!(
        messages,
        vec![
            "Element locator adding 2 <div> elements",
            "Element locator adding 1 <button> elements",
        ]
    );
}

#[test]
fn duplicate_and_uppercase_tags_are_normalized() {
    let locator = locator_for(reveal_page(), &["DIV", "div", "Button"]);
    assert_eq!(locator.target_elements(), ["div", "button"]);
}

// =========================================================================
// activate_element
// =========================================================================

#[test]
fn activate_element_replays_the_activator() {
    let mut locator = analyzed(reveal_page(), &["div"]);
    let b = by_id(locator.driver_mut(), "b");
    assert!(!b.is_displayed(locator.driver_mut()).unwrap());

    locator.activate_element(&b).unwrap();
    assert!(b.is_displayed(locator.driver_mut()).unwrap());
    assert_eq!(locator.driver().clicks().last().map(String::as_str), Some("a"));
}

#[test]
fn activate_visible_element_only_reloads() {
    let page = reveal_page().child(FakeNode::new("div").id("d"));
    let mut locator = analyzed(page, &["div"]);
    let d = by_id(locator.driver_mut(), "d");
    let clicks = locator.driver().clicks().len();

    locator.activate_element(&d).unwrap();
    assert_eq!(locator.driver().clicks().len(), clicks);
    assert_eq!(locator.driver().navigations().last().map(String::as_str), Some(HOME));
}

#[test]
fn activate_pruned_element_fails() {
    let mut locator = analyzed(reveal_page(), &["div"]);
    let c = by_id(locator.driver_mut(), "c");

    let err = locator.activate_element(&c).unwrap_err();
    assert!(matches!(err, ScanError::ElementNeverActivates { ref selector } if selector == c.source()));
}

#[test]
fn activate_unknown_element_is_a_no_op() {
    let mut locator = analyzed(reveal_page(), &["div"]);
    let a = get_all_of_type(locator.driver_mut(), &["button"]).unwrap().remove(0);
    let navigations = locator.driver().navigations().len();

    locator.activate_element(&a).unwrap();
    assert_eq!(locator.driver().navigations().len(), navigations);
}

#[test]
fn locator_click_classifies() {
    let mut locator = analyzed(reveal_page(), &["div"]);
    let a = by_id(locator.driver_mut(), "a");
    assert_eq!(locator.click(&a).unwrap().label(), "NONE");
}
