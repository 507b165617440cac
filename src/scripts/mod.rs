use std::rc::Rc;

use kuchiki::NodeRef;
use tracing::{debug, info};

use crate::config::Config;
use crate::dom::Document;
use crate::overlay;
use crate::page::Page;

pub mod badge;
pub mod font;
pub mod hotkeys;
pub mod scrollbar;
pub mod sidebar;

/// Builds a detached `<style id=..>` element.
pub(crate) fn style_element(dom: &mut Document, id: &str, css: &str) -> NodeRef {
    let style = dom.create_element("style");
    dom.set_attribute(&style, "id", id);
    dom.set_text_content(&style, css);
    style
}

/// Runs every injection against `page`, in load order. Running it again on
/// the same page is harmless.
pub fn inject_all(page: &Rc<Page>, config: &Config) {
    if !config.host.applies_to(page.url()) {
        debug!(target = "injector", url = %page.url(), "page origin not configured, skipping");
        return;
    }

    font::install(page, config);
    scrollbar::install(page, config);
    sidebar::install(page, config);
    overlay::install(page, config);
    hotkeys::install(page, config.hotkeys.content_protection.clone());
    badge::install(page);

    info!(target = "injector", installed = page.installed().len(), "injections applied");
}
