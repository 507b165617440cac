use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures_util::future::try_join;
use keyboard_types::Key;
use kuchiki::NodeRef;
use serde_json::Value;
use tracing::{debug, warn};

use super::controls::close_window;
use super::menu::{EntryKind, MenuEntry, MenuItemId, MenuModel, MenuReflection};
use super::style::gear_icon;
use crate::bridge::{GetContentProtection, GetIsDev, GetSettings, MenuAction, CONTENT_PROTECTION_CHANGED};
use crate::dom::Document;
use crate::page::{EventKind, ListenerTarget, Page, PageEvent, Phase};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuState {
    Closed,
    Open,
}

pub struct SettingsMenu {
    button: NodeRef,
    dropdown: NodeRef,
    shortcut: Option<String>,
    items: RefCell<Vec<(MenuEntry, NodeRef)>>,
    state: Cell<MenuState>,
}

impl SettingsMenu {
    pub(super) fn build(dom: &mut Document, shortcut: Option<String>) -> Self {
        let button = dom.create_element("button");
        dom.set_attribute(&button, "class", "settings-button");
        dom.set_attribute(&button, "type", "button");
        dom.set_attribute(&button, "aria-label", "Settings");
        let gear = gear_icon(dom);
        let _ = dom.append_child(&button, &gear);

        let dropdown = dom.create_element("div");
        dom.set_attribute(&dropdown, "class", "dropdown");
        dom.set_attribute(&dropdown, "data-open", "false");

        Self {
            button,
            dropdown,
            shortcut,
            items: RefCell::new(Vec::new()),
            state: Cell::new(MenuState::Closed),
        }
    }

    pub fn button(&self) -> &NodeRef {
        &self.button
    }

    pub fn dropdown(&self) -> &NodeRef {
        &self.dropdown
    }

    pub fn state(&self) -> MenuState {
        self.state.get()
    }

    /// The rendered button for `id`, if the current model has one.
    pub fn item(&self, id: MenuItemId) -> Option<NodeRef> {
        self.items
            .borrow()
            .iter()
            .find(|(entry, _)| entry.id() == Some(id))
            .map(|(_, node)| node.clone())
    }

    pub fn is_checked(&self, page: &Page, id: MenuItemId) -> Option<bool> {
        self.item(id)
            .map(|node| page.dom_ref().has_class(&node, "is-checked"))
    }

    pub(super) fn model(&self, include_log_levels: bool) -> MenuModel {
        MenuModel::build(include_log_levels, self.shortcut.clone())
    }

    pub fn set_open(&self, page: &Page, open: bool) {
        self.state
            .set(if open { MenuState::Open } else { MenuState::Closed });
        let mut dom = page.dom();
        dom.set_attribute(&self.dropdown, "data-open", if open { "true" } else { "false" });
        dom.set_class(&self.button, "is-open", open);
    }

    /// Rebuilds the dropdown from `model`, dropping the previous items and
    /// their listeners.
    pub(super) fn render(self: &Rc<Self>, page: &Rc<Page>, model: &MenuModel) {
        let stale: Vec<NodeRef> = self
            .items
            .borrow_mut()
            .drain(..)
            .map(|(_, node)| node)
            .collect();
        page.forget_node_listeners(&stale);
        drop(stale);

        let mut rendered = Vec::new();
        {
            let mut dom = page.dom();
            dom.clear_children(&self.dropdown);
            for entry in model.entries() {
                let node = render_entry(&mut dom, entry);
                let _ = dom.append_child(&self.dropdown, &node);
                if entry.kind() != EntryKind::Separator {
                    rendered.push((entry.clone(), node));
                }
            }
        }

        for (entry, node) in &rendered {
            let menu = Rc::clone(self);
            let entry = entry.clone();
            page.add_listener(
                ListenerTarget::Node(node.clone()),
                EventKind::Click,
                Phase::Bubble,
                move |page, event| {
                    event.stop_propagation();
                    menu.activate(page, &entry);
                },
            );
        }
        *self.items.borrow_mut() = rendered;
    }

    fn activate(self: &Rc<Self>, page: &Rc<Page>, entry: &MenuEntry) {
        self.set_open(page, false);
        match entry {
            MenuEntry::Action {
                id: MenuItemId::CloseWindow,
                ..
            } => close_window(page),
            MenuEntry::Action { id, .. } => {
                debug!(target = "menu", menu_id = id.as_str(), "no handler for menu action");
            }
            MenuEntry::Check { id, .. } | MenuEntry::Radio { id, .. } => {
                let Some(invoker) = page.bridge().try_get_invoke() else {
                    debug!(target = "menu", menu_id = id.as_str(), "native invoke not available");
                    return;
                };
                let id = *id;
                let menu = Rc::clone(self);
                let page_ref = Rc::clone(page);
                page.spawn(async move {
                    if let Err(err) = invoker.call(MenuAction { id }).await {
                        warn!(target = "menu", menu_id = id.as_str(), error = %err, "menu action failed");
                    }
                    menu.refresh_state(page_ref).await;
                });
            }
            MenuEntry::Separator => {}
        }
    }

    /// Fetches settings and content protection together and re-derives every
    /// check mark. On failure the rendered state is left as it was. Returns
    /// whether the menu was updated.
    pub async fn refresh_state(self: Rc<Self>, page: Rc<Page>) -> bool {
        let Some(invoker) = page.bridge().try_get_invoke() else {
            debug!(target = "menu", "native invoke not available, menu state not refreshed");
            return false;
        };
        match try_join(invoker.call(GetSettings), invoker.call(GetContentProtection)).await {
            Ok((settings, protected)) => {
                self.reflect(&page, &MenuReflection::from_native(&settings, protected));
                true
            }
            Err(err) => {
                warn!(target = "menu", error = %err, "menu state refresh failed");
                false
            }
        }
    }

    pub(super) fn refresh(self: &Rc<Self>, page: &Rc<Page>) {
        let refresh = Rc::clone(self).refresh_state(Rc::clone(page));
        page.spawn(async move {
            refresh.await;
        });
    }

    fn reflect(&self, page: &Page, reflection: &MenuReflection) {
        let items = self.items.borrow();
        let mut dom = page.dom();
        for (entry, node) in items.iter() {
            if !dom.contains(&self.dropdown, node) {
                continue;
            }
            dom.set_class(node, "is-checked", reflection.is_checked(entry));
        }
    }

    fn set_checked(&self, page: &Page, id: MenuItemId, checked: bool) {
        if let Some(node) = self.item(id) {
            let mut dom = page.dom();
            if dom.contains(&self.dropdown, &node) {
                dom.set_class(&node, "is-checked", checked);
            }
        }
    }

    /// Development builds get the log-level radios. An unanswered
    /// `get_is_dev` counts as `false`.
    pub async fn sync_dev_menu(self: Rc<Self>, page: Rc<Page>) {
        let is_dev = match page.bridge().try_get_invoke() {
            Some(invoker) => invoker.call(GetIsDev).await.unwrap_or_else(|err| {
                warn!(target = "menu", error = %err, "get_is_dev failed");
                false
            }),
            None => false,
        };
        if !is_dev {
            return;
        }
        self.render(&page, &self.model(true));
        self.refresh_state(page).await;
    }

    pub(super) fn follow_protection_changes(self: &Rc<Self>, page: &Rc<Page>) {
        let Some(bus) = page.bridge().try_get_event_bus() else {
            debug!(target = "menu", "event bus not available, protection changes not followed");
            return;
        };
        let menu = Rc::clone(self);
        let weak = Rc::downgrade(page);
        let listened = bus.listen(CONTENT_PROTECTION_CHANGED, move |payload: Value| {
            if let Some(page) = weak.upgrade() {
                let protected = payload.as_bool().unwrap_or(false);
                menu.set_checked(&page, MenuItemId::ContentProtection, protected);
            }
        });
        if let Err(err) = listened {
            warn!(target = "menu", error = %err, "failed to listen for protection changes");
        }
    }

    /// Button toggling, outside clicks and Escape. `inside` is the area
    /// whose clicks keep the menu open.
    pub(super) fn bind(self: &Rc<Self>, page: &Rc<Page>, host: &NodeRef, inside: &NodeRef) {
        let menu = Rc::clone(self);
        page.add_listener(
            ListenerTarget::Node(self.button.clone()),
            EventKind::Click,
            Phase::Bubble,
            move |page, event| {
                event.stop_propagation();
                menu.set_open(page, menu.state() == MenuState::Closed);
            },
        );

        let menu = Rc::clone(self);
        let (host, inside) = (host.clone(), inside.clone());
        page.add_listener(
            ListenerTarget::Document,
            EventKind::Click,
            Phase::Bubble,
            move |page, event: &mut PageEvent| {
                let in_menu_area = event.path_contains(&host)
                    && [&menu.button, &menu.dropdown, &inside]
                        .iter()
                        .any(|node| event.path_contains(node));
                if !in_menu_area {
                    menu.set_open(page, false);
                }
            },
        );

        let menu = Rc::clone(self);
        page.add_listener(
            ListenerTarget::Document,
            EventKind::KeyDown,
            Phase::Bubble,
            move |page, event| {
                if matches!(event.key().map(|key| &key.key), Some(Key::Escape)) {
                    menu.set_open(page, false);
                }
            },
        );
    }
}

fn span(dom: &mut Document, class: &str) -> NodeRef {
    let node = dom.create_element("span");
    if !class.is_empty() {
        dom.set_attribute(&node, "class", class);
    }
    node
}

fn render_entry(dom: &mut Document, entry: &MenuEntry) -> NodeRef {
    let Some(id) = entry.id() else {
        let sep = dom.create_element("div");
        dom.set_attribute(&sep, "class", "sep");
        return sep;
    };

    let kind = entry.kind();
    let button = dom.create_element("button");
    dom.set_attribute(&button, "type", "button");
    dom.set_attribute(&button, "class", "item");
    dom.set_attribute(&button, "data-menu-id", id.as_str());
    dom.set_attribute(&button, "data-menu-type", kind.as_str());
    if kind == EntryKind::Radio {
        dom.set_class(&button, "is-radio", true);
    }

    let check = if kind == EntryKind::Action {
        span(dom, "")
    } else {
        let check = span(dom, "check");
        let mark = span(dom, "check-mark");
        let _ = dom.append_child(&check, &mark);
        check
    };
    let label = span(dom, "label");
    dom.set_text_content(&label, entry.label());
    let shortcut = span(dom, "shortcut");
    dom.set_text_content(&shortcut, entry.shortcut().unwrap_or_default());

    for child in [check, label, shortcut] {
        let _ = dom.append_child(&button, &child);
    }
    button
}
