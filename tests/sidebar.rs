mod common;

use keyboard_types::{Code, Modifiers};
use shellgraft::scripts::sidebar::{self, ToggleOutcome};

use common::{key, render_host_layout, session};

const LAYOUT: &str = "72px 320px minmax(0, 1fr)";
const COLLAPSED: &str = "72px 0px minmax(0, auto)";

#[test]
fn toggling_twice_restores_the_exact_layout() {
    let session = session();
    let page = &session.page;
    let layout = render_host_layout(page, &session.config, LAYOUT);
    let toggle = sidebar::install(page, &session.config).expect("installed");
    assert_eq!(toggle.original_layout(), None);

    assert_eq!(toggle.toggle(page), ToggleOutcome::Collapsed);
    assert_eq!(
        page.dom_ref().style(&layout.wrap, "grid-template-columns").as_deref(),
        Some(COLLAPSED)
    );
    assert_eq!(toggle.toggle(page), ToggleOutcome::Expanded);
    assert_eq!(
        page.dom_ref().style(&layout.wrap, "grid-template-columns").as_deref(),
        Some(LAYOUT)
    );
    assert_eq!(toggle.original_layout().as_deref(), Some(LAYOUT));
}

#[test]
fn original_is_captured_at_first_toggle() {
    let session = session();
    let page = &session.page;
    let wrap_selector = &session.config.host.layout_wrap;
    let layout = render_host_layout(page, &session.config, LAYOUT);
    let toggle = sidebar::install(page, &session.config).expect("installed");

    page.dom()
        .add_author_rule(wrap_selector, "grid-template-columns", "64px 280px 1fr");
    toggle.toggle(page);
    toggle.toggle(page);
    assert_eq!(toggle.original_layout().as_deref(), Some("64px 280px 1fr"));

    page.dom()
        .add_author_rule(wrap_selector, "grid-template-columns", "10px 10px 10px");
    toggle.toggle(page);
    toggle.toggle(page);
    assert_eq!(
        page.dom_ref().style(&layout.wrap, "grid-template-columns").as_deref(),
        Some("64px 280px 1fr"),
        "the captured template is never recomputed"
    );
}

#[test]
fn single_track_layout_is_left_alone() {
    let session = session();
    let page = &session.page;
    let layout = render_host_layout(page, &session.config, "1fr");
    let toggle = sidebar::install(page, &session.config).expect("installed");

    assert_eq!(toggle.toggle(page), ToggleOutcome::Unchanged);
    assert!(!toggle.is_collapsed());
    assert_eq!(page.dom_ref().style(&layout.wrap, "grid-template-columns"), None);
    assert_eq!(toggle.original_layout(), None);
}

#[test]
fn missing_wrap_is_reported() {
    let session = session();
    let toggle = sidebar::install(&session.page, &session.config).expect("installed");
    assert_eq!(toggle.toggle(&session.page), ToggleOutcome::WrapMissing);
}

#[test]
fn tab_lives_in_the_content_area() {
    let session = session();
    let page = &session.page;
    let toggle = sidebar::install(page, &session.config).expect("installed");
    assert!(!page.dom_ref().is_connected(toggle.tab()));

    let layout = render_host_layout(page, &session.config, LAYOUT);
    let dom = page.dom_ref();
    assert_eq!(dom.parent(toggle.tab()), Some(layout.content.clone()));
    assert_eq!(dom.style(&layout.content, "position").as_deref(), Some("relative"));
    assert_eq!(
        dom.attribute(toggle.tab(), "data-direction").as_deref(),
        Some("left")
    );
}

#[test]
fn clicking_the_tab_toggles() {
    let session = session();
    let page = &session.page;
    render_host_layout(page, &session.config, LAYOUT);
    let toggle = sidebar::install(page, &session.config).expect("installed");

    page.dispatch_click(toggle.tab());
    assert!(toggle.is_collapsed());
    assert_eq!(
        page.dom_ref().attribute(toggle.tab(), "data-direction").as_deref(),
        Some("right")
    );
    page.dispatch_click(toggle.tab());
    assert!(!toggle.is_collapsed());
}

#[test]
fn hotkey_toggles_and_ignores_repeats() {
    let session = session();
    let page = &session.page;
    render_host_layout(page, &session.config, LAYOUT);
    let toggle = sidebar::install(page, &session.config).expect("installed");

    page.dispatch_key(key("l", Code::KeyL, Modifiers::ALT));
    assert!(toggle.is_collapsed());

    let mut held = key("l", Code::KeyL, Modifiers::ALT);
    held.repeat = true;
    page.dispatch_key(held);
    assert!(toggle.is_collapsed());

    page.dispatch_key(key("l", Code::KeyL, Modifiers::empty()));
    assert!(toggle.is_collapsed());

    page.dispatch_key(key("L", Code::KeyL, Modifiers::ALT));
    assert!(!toggle.is_collapsed());
}

#[test]
fn tab_follows_a_rerendered_content_area() {
    let session = session();
    let page = &session.page;
    let config = &session.config;
    render_host_layout(page, config, LAYOUT);
    let toggle = sidebar::install(page, config).expect("installed");
    toggle.toggle(page);

    page.dom().replace_body();
    page.flush_mutations();
    assert!(!page.dom_ref().is_connected(toggle.tab()));

    let layout = render_host_layout(page, config, LAYOUT);
    let dom = page.dom_ref();
    assert_eq!(dom.parent(toggle.tab()), Some(layout.content.clone()));
    assert_eq!(dom.count_with_id(&config.artifacts.sidebar_toggle), 1);
    assert!(!toggle.is_collapsed(), "a fresh wrap renders expanded");
    assert_eq!(
        dom.attribute(toggle.tab(), "data-direction").as_deref(),
        Some("left")
    );
}

#[test]
fn first_toggle_after_navigation_collapses() {
    let session = session();
    let page = &session.page;
    let config = &session.config;
    render_host_layout(page, config, LAYOUT);
    let toggle = sidebar::install(page, config).expect("installed");
    assert_eq!(toggle.toggle(page), ToggleOutcome::Collapsed);

    page.dom().replace_body();
    page.flush_mutations();
    let layout = render_host_layout(page, config, LAYOUT);

    assert_eq!(toggle.toggle(page), ToggleOutcome::Collapsed);
    assert!(toggle.is_collapsed());
    assert_eq!(
        page.dom_ref().style(&layout.wrap, "grid-template-columns").as_deref(),
        Some(COLLAPSED)
    );
    assert_eq!(
        page.dom_ref().attribute(toggle.tab(), "data-direction").as_deref(),
        Some("right")
    );
}
