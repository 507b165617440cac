use std::cell::Cell;
use std::rc::Rc;

use kuchiki::NodeRef;
use tracing::{debug, warn};

use super::style::{control_icon, CLOSE_ICON, MAXIMIZE_ICON, MINIMIZE_ICON, RESTORE_ICON};
use crate::bridge::{BridgeFuture, GetIsMaximized, WindowHandle, RESIZE_EVENT};
use crate::dom::Document;
use crate::page::{EventKind, ListenerTarget, Page, Phase};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaximizeIcon {
    Maximize,
    Restore,
}

impl MaximizeIcon {
    fn for_state(maximized: bool) -> Self {
        if maximized {
            MaximizeIcon::Restore
        } else {
            MaximizeIcon::Maximize
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MaximizeIcon::Maximize => "maximize",
            MaximizeIcon::Restore => "restore",
        }
    }

    fn title(self) -> &'static str {
        match self {
            MaximizeIcon::Maximize => "Maximize",
            MaximizeIcon::Restore => "Restore",
        }
    }
}

pub struct WindowControls {
    close: NodeRef,
    minimize: NodeRef,
    maximize: NodeRef,
    /// Both maximize-button icons, built once and swapped in place.
    maximize_icon: NodeRef,
    restore_icon: NodeRef,
    /// Last state reported by the host, or assumed after a toggle.
    maximized: Cell<bool>,
}

fn control_button(dom: &mut Document, kind: &str, title: &str, icon: &NodeRef) -> NodeRef {
    let button = dom.create_element("button");
    dom.set_attribute(&button, "class", format!("control-button {kind}"));
    dom.set_attribute(&button, "type", "button");
    dom.set_attribute(&button, "title", title);
    let _ = dom.append_child(&button, icon);
    button
}

type WindowOp = fn(&dyn WindowHandle) -> BridgeFuture<()>;

impl WindowControls {
    pub(super) fn build(dom: &mut Document) -> Self {
        let close_icon = control_icon(dom, CLOSE_ICON);
        let close = control_button(dom, "close", "Close", &close_icon);
        let minimize_icon = control_icon(dom, MINIMIZE_ICON);
        let minimize = control_button(dom, "minimize", "Minimize", &minimize_icon);
        let maximize_icon = control_icon(dom, MAXIMIZE_ICON);
        let restore_icon = control_icon(dom, RESTORE_ICON);
        let maximize = control_button(dom, "maximize", "Maximize", &maximize_icon);
        dom.set_attribute(&maximize, "data-state", MaximizeIcon::Maximize.as_str());
        Self {
            close,
            minimize,
            maximize,
            maximize_icon,
            restore_icon,
            maximized: Cell::new(false),
        }
    }

    /// Buttons in display order.
    pub fn buttons(&self) -> [&NodeRef; 3] {
        [&self.close, &self.minimize, &self.maximize]
    }

    pub fn close_button(&self) -> &NodeRef {
        &self.close
    }

    pub fn minimize_button(&self) -> &NodeRef {
        &self.minimize
    }

    pub fn maximize_button(&self) -> &NodeRef {
        &self.maximize
    }

    pub fn icon(&self, page: &Page) -> MaximizeIcon {
        match page.dom_ref().attribute(&self.maximize, "data-state").as_deref() {
            Some("restore") => MaximizeIcon::Restore,
            _ => MaximizeIcon::Maximize,
        }
    }

    fn set_icon(&self, page: &Page, maximized: bool) {
        self.maximized.set(maximized);
        let icon = MaximizeIcon::for_state(maximized);
        let (shown, hidden) = match icon {
            MaximizeIcon::Maximize => (&self.maximize_icon, &self.restore_icon),
            MaximizeIcon::Restore => (&self.restore_icon, &self.maximize_icon),
        };
        let mut dom = page.dom();
        if dom.parent(shown).as_ref() != Some(&self.maximize) {
            dom.remove(hidden);
            let _ = dom.append_child(&self.maximize, shown);
        }
        dom.set_attribute(&self.maximize, "title", icon.title());
        dom.set_attribute(&self.maximize, "data-state", icon.as_str());
    }

    pub(super) fn bind(self: &Rc<Self>, page: &Rc<Page>) {
        let pass_through = |button: &NodeRef, name: &'static str, op: WindowOp| {
            page.add_listener(
                ListenerTarget::Node(button.clone()),
                EventKind::Click,
                Phase::Bubble,
                move |page, _| run_window_op(page, name, op),
            );
        };
        pass_through(&self.minimize, "minimize", |window| window.minimize());
        pass_through(&self.close, "close", |window| window.close());

        let controls = Rc::clone(self);
        page.add_listener(
            ListenerTarget::Node(self.maximize.clone()),
            EventKind::Click,
            Phase::Bubble,
            move |page, _| controls.toggle_maximize(page),
        );
    }

    /// Issues the toggle and flips the icon right away; a failed toggle
    /// resynchronizes from the host.
    pub fn toggle_maximize(self: &Rc<Self>, page: &Rc<Page>) {
        let Some(window) = page.bridge().try_get_window() else {
            debug!(target = "window", "window handle not available, maximize ignored");
            return;
        };
        let toggle = window.toggle_maximize();
        self.set_icon(page, !self.maximized.get());

        let controls = Rc::clone(self);
        let page_ref = Rc::clone(page);
        page.spawn(async move {
            if let Err(err) = toggle.await {
                warn!(target = "window", error = %err, "toggle maximize failed");
                controls.refresh_maximized(page_ref).await;
            }
        });
    }

    /// Reads the real maximize state and redraws the icon. Failures keep the
    /// current icon.
    pub async fn refresh_maximized(self: Rc<Self>, page: Rc<Page>) {
        let Some(invoker) = page.bridge().try_get_invoke() else {
            debug!(target = "window", "native invoke not available, maximize state unknown");
            return;
        };
        match invoker.call(GetIsMaximized).await {
            Ok(maximized) => self.set_icon(&page, maximized),
            Err(err) => warn!(target = "window", error = %err, "failed to read maximize state"),
        }
    }

    /// Resynchronizes the icon on every host resize, preferring the window's
    /// own resize hook over the resize push event.
    pub(super) fn follow_resizes(self: &Rc<Self>, page: &Rc<Page>) {
        let weak = Rc::downgrade(page);
        let controls = Rc::clone(self);
        let resync: Rc<dyn Fn()> = Rc::new(move || {
            if let Some(page) = weak.upgrade() {
                page.spawn(Rc::clone(&controls).refresh_maximized(Rc::clone(&page)));
            }
        });

        if let Some(window) = page.bridge().try_get_window() {
            if let Some(subscribed) = window.on_resized(Rc::clone(&resync)) {
                if let Err(err) = subscribed {
                    warn!(target = "window", error = %err, "failed to subscribe to window resizes");
                }
                return;
            }
        }

        let Some(bus) = page.bridge().try_get_event_bus() else {
            debug!(target = "window", "no resize source available");
            return;
        };
        if let Err(err) = bus.listen(RESIZE_EVENT, move |_| resync()) {
            warn!(target = "window", error = %err, "failed to listen for resize events");
        }
    }
}

fn run_window_op(page: &Rc<Page>, name: &'static str, op: WindowOp) {
    let Some(window) = page.bridge().try_get_window() else {
        debug!(target = "window", op = name, "window handle not available");
        return;
    };
    let pending = op(window.as_ref());
    page.spawn(async move {
        if let Err(err) = pending.await {
            warn!(target = "window", op = name, error = %err, "window operation failed");
        }
    });
}

/// Closes the window on behalf of the menu's close entry.
pub(super) fn close_window(page: &Rc<Page>) {
    run_window_op(page, "close", |window| window.close());
}
