use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use futures_util::future::LocalBoxFuture;
use thiserror::Error;
use tracing::debug;

use crate::bridge::UpdateNotificationBadge;
use crate::guard::ArtifactKind;
use crate::page::Page;

#[derive(Debug, Error)]
#[error("reading the badge text failed: {0}")]
pub struct BadgeReadError(pub String);

pub type BadgeTextFuture = LocalBoxFuture<'static, Result<Option<String>, BadgeReadError>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BadgeDetails {
    pub text: Option<String>,
}

/// The page-provided badge implementation.
pub trait BadgeApi {
    fn set_badge_text(&self, details: BadgeDetails);

    /// `None` when the surface cannot report its current text.
    fn badge_text(&self) -> Option<BadgeTextFuture> {
        None
    }
}

/// The `chrome.action` slot as the page sees it. Page code calls
/// [`ActionSurface::set_badge_text`]; whatever implementation currently sits
/// in the slot handles it.
#[derive(Default)]
pub struct ActionSurface {
    api: RefCell<Option<Rc<dyn BadgeApi>>>,
    relayed: Cell<bool>,
}

impl ActionSurface {
    pub fn new(api: Rc<dyn BadgeApi>) -> Rc<Self> {
        Rc::new(Self {
            api: RefCell::new(Some(api)),
            relayed: Cell::new(false),
        })
    }

    /// A surface without a badge setter.
    pub fn empty() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn is_relayed(&self) -> bool {
        self.relayed.get()
    }

    pub fn set_badge_text(&self, details: BadgeDetails) {
        let api = self.api.borrow().clone();
        if let Some(api) = api {
            api.set_badge_text(details);
        }
    }

    fn current(&self) -> Option<Rc<dyn BadgeApi>> {
        self.api.borrow().clone()
    }

    fn replace(&self, api: Rc<dyn BadgeApi>) {
        *self.api.borrow_mut() = Some(api);
    }
}

fn relay(page: &Page, text: Option<String>) {
    match page.bridge().try_get_invoke() {
        Some(invoker) => invoker.fire(page, UpdateNotificationBadge { text }),
        None => debug!(target = "badge", "native invoke not available, badge not relayed"),
    }
}

struct RelayingBadge {
    original: Rc<dyn BadgeApi>,
    page: Weak<Page>,
}

impl BadgeApi for RelayingBadge {
    fn set_badge_text(&self, details: BadgeDetails) {
        if let Some(page) = self.page.upgrade() {
            relay(&page, details.text.clone());
        }
        self.original.set_badge_text(details);
    }

    fn badge_text(&self) -> Option<BadgeTextFuture> {
        self.original.badge_text()
    }
}

/// Decorates the page's badge setter so every call also reaches
/// `update_notification_badge`. Returns whether a relay is in place; calling
/// it again never wraps twice.
pub fn patch(page: &Rc<Page>) -> bool {
    let Some(surface) = page.action_surface() else {
        return false;
    };
    if surface.is_relayed() {
        return true;
    }
    let Some(original) = surface.current() else {
        debug!(target = "badge", "page has no badge setter");
        return false;
    };

    surface.replace(Rc::new(RelayingBadge {
        original: Rc::clone(&original),
        page: Rc::downgrade(page),
    }));
    surface.relayed.set(true);
    debug!(target = "badge", "badge setter decorated");

    if let Some(read) = original.badge_text() {
        let weak = Rc::downgrade(page);
        page.spawn(async move {
            match read.await {
                Ok(text) => {
                    if let Some(page) = weak.upgrade() {
                        relay(&page, text);
                    }
                }
                Err(err) => debug!(target = "badge", error = %err, "initial badge text unavailable"),
            }
        });
    }
    true
}

pub fn install(page: &Rc<Page>) -> bool {
    page.install_once(ArtifactKind::BadgeRelay, patch)
        .unwrap_or_else(|| {
            page.action_surface()
                .map(|surface| surface.is_relayed())
                .unwrap_or(false)
        })
}
