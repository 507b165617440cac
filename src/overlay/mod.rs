use std::rc::Rc;

use kuchiki::NodeRef;
use tracing::debug;

use crate::config::Config;
use crate::guard::ArtifactKind;
use crate::injector::{watch, Attachment, Placement, Reconcile, SelfHealing, Startup};
use crate::page::Page;

mod controls;
pub mod menu;
mod settings;
mod style;

pub use controls::{MaximizeIcon, WindowControls};
pub use settings::{MenuState, SettingsMenu};

/// Marks the body as a native window drag region.
const DRAG_REGION_ATTRIBUTE: &str = "data-tauri-drag-region";

pub struct Titlebar {
    host: SelfHealing,
    global_style: SelfHealing,
    menu: Rc<SettingsMenu>,
    controls: Rc<WindowControls>,
}

impl Titlebar {
    fn build(page: &Rc<Page>, config: &Config) -> Self {
        let height = config.titlebar.height;
        let mut dom = page.dom();

        let host = dom.create_element("div");
        dom.set_attribute(&host, "id", config.artifacts.titlebar_host.as_str());
        dom.set_attribute(&host, "role", "presentation");
        let height_px = format!("{height}px");
        for (property, value) in [
            ("position", "fixed"),
            ("top", "0"),
            ("left", "0"),
            ("right", "0"),
            ("height", height_px.as_str()),
            ("z-index", "2147483647"),
            ("pointer-events", "none"),
        ] {
            dom.set_style(&host, property, value);
        }

        let shadow = dom.attach_shadow(&host);
        let sheet = dom.create_element("style");
        dom.set_text_content(&sheet, &style::shadow_css(height));
        let bar = dom.create_element("div");
        dom.set_attribute(&bar, "class", "bar");
        let right = dom.create_element("div");
        dom.set_attribute(&right, "class", "right");

        let controls = WindowControls::build(&mut dom);
        let menu = SettingsMenu::build(
            &mut dom,
            Some(config.hotkeys.content_protection.to_string()),
        );
        // Every node here was just created, so none of these appends can fail.
        for child in controls.buttons() {
            let _ = dom.append_child(&right, child);
        }
        let _ = dom.append_child(&right, menu.button());
        let _ = dom.append_child(&right, menu.dropdown());
        let _ = dom.append_child(&bar, &right);
        let _ = dom.append_child(&shadow, &sheet);
        let _ = dom.append_child(&shadow, &bar);

        let global = dom.create_element("style");
        dom.set_attribute(&global, "id", config.artifacts.titlebar_global_style.as_str());
        dom.set_text_content(&global, &style::global_css(&config.host.drag_exempt));
        drop(dom);

        let menu = Rc::new(menu);
        menu.render(page, &menu.model(false));
        let controls = Rc::new(controls);
        menu.bind(page, &host, &right);
        controls.bind(page);

        Self {
            host: SelfHealing::new("titlebar", host, Placement::BodyStart),
            global_style: SelfHealing::new("titlebar-global-style", global, Placement::HeadOrRoot),
            menu,
            controls,
        }
    }

    pub fn host(&self) -> &NodeRef {
        self.host.node()
    }

    pub fn menu(&self) -> &Rc<SettingsMenu> {
        &self.menu
    }

    pub fn controls(&self) -> &Rc<WindowControls> {
        &self.controls
    }
}

impl Reconcile for Titlebar {
    fn reconcile(&self, page: &Rc<Page>) {
        if self.host.ensure_attached(page) == Attachment::Inserted {
            debug!(target = "injector", "titlebar attached");
        }
        {
            let mut dom = page.dom();
            if let Some(body) = dom.body() {
                dom.set_attribute(&body, DRAG_REGION_ATTRIBUTE, "");
            }
        }
        self.global_style.ensure_attached(page);
    }
}

/// Installs the titlebar once the document is ready and starts syncing it
/// with the native side.
pub fn install(page: &Rc<Page>, config: &Config) -> Option<Rc<Titlebar>> {
    page.install_once(ArtifactKind::Titlebar, |page| {
        let titlebar = Rc::new(Titlebar::build(page, config));
        watch(page, Startup::WhenReady, Rc::clone(&titlebar) as Rc<dyn Reconcile>);

        titlebar.menu.refresh(page);
        titlebar.menu.follow_protection_changes(page);
        page.spawn(Rc::clone(&titlebar.menu).sync_dev_menu(Rc::clone(page)));
        page.spawn(Rc::clone(&titlebar.controls).refresh_maximized(Rc::clone(page)));
        titlebar.controls.follow_resizes(page);
        titlebar
    })
}
