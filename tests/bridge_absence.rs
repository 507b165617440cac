mod common;

use std::rc::Rc;

use keyboard_types::{Code, Modifiers};
use kuchiki::NodeRef;
use shellgraft::bridge::scripted::{Availability, ScriptedHost};
use shellgraft::bridge::ProbeOutcome;
use shellgraft::config::Config;
use shellgraft::overlay::menu::MenuItemId;
use shellgraft::overlay::{self, MaximizeIcon, MenuState};
use shellgraft::page::Page;
use shellgraft::scripts::badge::{ActionSurface, BadgeApi, BadgeDetails};
use shellgraft::{inject_all, PageBuilder};
use url::Url;

use common::{key, page_without_bridge, render_host_layout, settle, CHAT_URL};

struct SilentBadge;

impl BadgeApi for SilentBadge {
    fn set_badge_text(&self, _details: BadgeDetails) {}
}

/// Clicks everything the overlay offers and fires both hotkeys, checking
/// that nothing beyond local menu and sidebar state changed.
async fn exercise(page: &Rc<Page>, config: &Config) {
    render_host_layout(page, config, "72px 320px 1fr");
    inject_all(page, config);
    settle().await;
    let titlebar = overlay::install(page, config);
    assert!(titlebar.is_none(), "already installed by inject_all");

    let host = page
        .dom_ref()
        .element_by_id(&config.artifacts.titlebar_host)
        .expect("titlebar renders without a bridge");
    let shadow = page.dom_ref().shadow_root(&host).expect("shadow root");
    let before = page.dom_ref().outer_html(&shadow);

    let buttons: Vec<NodeRef> = {
        let dom = page.dom_ref();
        let mut stack = vec![shadow.clone()];
        let mut found = Vec::new();
        while let Some(node) = stack.pop() {
            stack.extend(dom.children(&node));
            if dom.tag_name(&node) == Some("button") {
                found.push(node);
            }
        }
        found
    };
    assert!(buttons.len() >= 5, "controls, gear and menu items");
    for button in &buttons {
        page.dispatch_click(button);
        let body = page.dom_ref().body().expect("body");
        page.dispatch_click(&body);
    }
    page.dispatch_key(key("h", Code::KeyH, Modifiers::ALT));
    page.dispatch_key(key("l", Code::KeyL, Modifiers::ALT));
    page.dispatch_key(key("l", Code::KeyL, Modifiers::ALT));
    if let Some(surface) = page.action_surface() {
        surface.set_badge_text(BadgeDetails {
            text: Some("1".to_string()),
        });
    }
    settle().await;

    assert_eq!(page.dom_ref().outer_html(&shadow), before);
}

#[tokio::test]
async fn no_host_global_degrades_to_local_ui() {
    let page = page_without_bridge();
    let config = Config::default();
    page.run_until(exercise(&page, &config)).await;
    assert_eq!(page.bridge().last_probe(), ProbeOutcome::Absent);
}

#[tokio::test]
async fn absent_capabilities_degrade_to_local_ui() {
    let host = ScriptedHost::new();
    host.set_core(Availability::Absent);
    host.set_events(Availability::Absent);
    host.set_window(Availability::Absent);
    let page = PageBuilder::new(Url::parse(CHAT_URL).expect("url"))
        .host(Rc::new(host.clone()))
        .action_surface(ActionSurface::new(Rc::new(SilentBadge)))
        .build();
    let config = Config::default();

    page.run_until(exercise(&page, &config)).await;
    assert!(host.calls().is_empty());
    assert!(host.window_ops().is_empty());
    assert_eq!(page.bridge().last_probe(), ProbeOutcome::Absent);
}

#[tokio::test]
async fn throwing_accessors_are_swallowed() {
    let host = ScriptedHost::new();
    host.set_core(Availability::Broken);
    host.set_events(Availability::Broken);
    host.set_window(Availability::Broken);
    let page = PageBuilder::new(Url::parse(CHAT_URL).expect("url"))
        .host(Rc::new(host.clone()))
        .build();
    let config = Config::default();

    page.run_until(exercise(&page, &config)).await;
    assert!(host.calls().is_empty());
    assert_eq!(page.bridge().last_probe(), ProbeOutcome::Errored);
}

#[tokio::test]
async fn menu_still_opens_and_closes_without_a_bridge() {
    let page = page_without_bridge();
    let config = Config::default();
    page.run_until(async {
        let titlebar = overlay::install(&page, &config).expect("installed");
        settle().await;
        let menu = titlebar.menu();

        page.dispatch_click(menu.button());
        assert_eq!(menu.state(), MenuState::Open);
        let item = menu.item(MenuItemId::Autostart).expect("item");
        page.dispatch_click(&item);
        settle().await;
        assert_eq!(menu.state(), MenuState::Closed);
        assert_eq!(menu.is_checked(&page, MenuItemId::Autostart), Some(false));

        page.dispatch_click(titlebar.controls().maximize_button());
        assert_eq!(titlebar.controls().icon(&page), MaximizeIcon::Maximize);
    })
    .await;
}
