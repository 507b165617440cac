use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use kuchiki::{Node, NodeRef};
use tracing::debug;

use crate::config::Config;
use crate::dom::Selector;
use crate::guard::ArtifactKind;
use crate::injector::{watch, Attachment, Placement, Reconcile, SelfHealing, Startup};
use crate::page::{EventKind, ListenerTarget, Page, Phase};

use super::hotkeys::on_hotkey;

const GRID_COLUMNS: &str = "grid-template-columns";

/// A `grid-template-columns` value split into tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackList(Vec<String>);

impl TrackList {
    /// Splits on spaces outside parentheses.
    pub fn parse(value: &str) -> Self {
        let mut tracks = Vec::new();
        let mut current = String::new();
        let mut depth = 0usize;
        for ch in value.chars() {
            match ch {
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                ' ' if depth == 0 => {
                    if !current.is_empty() {
                        tracks.push(std::mem::take(&mut current));
                    }
                    continue;
                }
                _ => {}
            }
            current.push(ch);
        }
        if !current.is_empty() {
            tracks.push(current);
        }
        Self(tracks)
    }

    pub fn tracks(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn collapsed(&self) -> Self {
        let mut tracks = self.0.clone();
        if let Some(sidebar) = tracks.get_mut(1) {
            *sidebar = "0px".to_string();
        }
        if let Some(next) = tracks.get_mut(2) {
            *next = "minmax(0, auto)".to_string();
        }
        Self(tracks)
    }
}

impl fmt::Display for TrackList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Collapsed,
    Expanded,
    /// Fewer than two tracks; nothing to collapse.
    Unchanged,
    WrapMissing,
}

struct Templates {
    original: String,
    collapsed: String,
}

struct Chevron {
    upper: NodeRef,
    lower: NodeRef,
}

/// Collapses the sidebar track of the host's grid layout.
///
/// The wrap's column template is read from computed style the first time a
/// toggle takes effect and kept as the original from then on. A wrap that
/// the host re-rendered starts out expanded again.
pub struct SidebarToggle {
    wrap: Selector,
    templates: RefCell<Option<Templates>>,
    collapsed: Cell<bool>,
    /// The wrap element `collapsed` describes.
    seen_wrap: RefCell<Option<Weak<Node>>>,
    tab: SelfHealing,
    chevron: Chevron,
}

impl SidebarToggle {
    fn build(page: &Page, config: &Config) -> Self {
        let mut dom = page.dom();
        let tab = dom.create_element("div");
        dom.set_attribute(&tab, "id", config.artifacts.sidebar_toggle.as_str());
        dom.set_attribute(&tab, "role", "button");
        dom.set_attribute(&tab, "aria-label", "Toggle sidebar");
        dom.set_attribute(
            &tab,
            "title",
            format!("Toggle sidebar ({})", config.hotkeys.sidebar),
        );
        for (property, value) in [
            ("position", "absolute"),
            ("top", "16px"),
            ("left", "0"),
            ("width", "12px"),
            ("height", "40px"),
            ("border-radius", "0 4px 4px 0"),
            ("background", "#fff"),
            ("border", "1px solid #ddd"),
            ("border-left", "none"),
            ("cursor", "pointer"),
            ("z-index", "9999"),
            ("display", "flex"),
            ("align-items", "center"),
            ("justify-content", "center"),
        ] {
            dom.set_style(&tab, property, value);
        }

        let icon = dom.create_element("div");
        for (property, value) in [("width", "10px"), ("height", "10px"), ("position", "relative")] {
            dom.set_style(&icon, property, value);
        }
        let mut line = |top: &str| {
            let line = dom.create_element("div");
            for (property, value) in [
                ("position", "absolute"),
                ("top", top),
                ("left", "2px"),
                ("width", "6px"),
                ("height", "1px"),
                ("background", "#202a43"),
                ("border-radius", "2px"),
                ("transform-origin", "center"),
            ] {
                dom.set_style(&line, property, value);
            }
            line
        };
        let upper = line("2px");
        let lower = line("6px");
        // Freshly created nodes cannot form a cycle.
        let _ = dom.append_child(&icon, &upper);
        let _ = dom.append_child(&icon, &lower);
        let _ = dom.append_child(&tab, &icon);

        Self {
            wrap: config.host.layout_wrap.clone(),
            templates: RefCell::new(None),
            collapsed: Cell::new(false),
            seen_wrap: RefCell::new(None),
            tab: SelfHealing::new(
                "sidebar-toggle",
                tab,
                Placement::Within(config.host.content_area.clone()),
            ),
            chevron: Chevron { upper, lower },
        }
    }

    pub fn tab(&self) -> &NodeRef {
        self.tab.node()
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed.get()
    }

    /// The captured pristine template, once a toggle has taken effect.
    pub fn original_layout(&self) -> Option<String> {
        self.templates
            .borrow()
            .as_ref()
            .map(|templates| templates.original.clone())
    }

    pub fn toggle(&self, page: &Page) -> ToggleOutcome {
        let outcome = self.apply_toggle(page);
        debug!(target = "sidebar", ?outcome, "sidebar toggled");
        outcome
    }

    /// Forgets the collapsed state when the host has swapped in a new wrap
    /// element, which always renders expanded.
    fn follow_wrap(&self, wrap: &NodeRef) {
        let mut seen = self.seen_wrap.borrow_mut();
        let same = seen
            .as_ref()
            .map(|previous| Weak::as_ptr(previous) == Rc::as_ptr(&wrap.0))
            .unwrap_or(false);
        if same {
            return;
        }
        if seen.is_some() && self.collapsed.replace(false) {
            debug!(target = "sidebar", "layout re-rendered, sidebar expanded again");
        }
        *seen = Some(Rc::downgrade(&wrap.0));
    }

    fn apply_toggle(&self, page: &Page) -> ToggleOutcome {
        let mut dom = page.dom();
        let Some(wrap) = dom.query_selector(&self.wrap) else {
            return ToggleOutcome::WrapMissing;
        };
        self.follow_wrap(&wrap);

        let mut templates = self.templates.borrow_mut();
        if templates.is_none() {
            let current = dom
                .computed_style(&wrap, GRID_COLUMNS)
                .unwrap_or_else(|| "none".to_string());
            let tracks = TrackList::parse(&current);
            if tracks.len() < 2 {
                return ToggleOutcome::Unchanged;
            }
            *templates = Some(Templates {
                collapsed: tracks.collapsed().to_string(),
                original: current,
            });
        }
        let Some(templates) = templates.as_ref() else {
            return ToggleOutcome::Unchanged;
        };

        let collapse = !self.collapsed.get();
        let next = if collapse {
            &templates.collapsed
        } else {
            &templates.original
        };
        dom.set_style(&wrap, GRID_COLUMNS, next.as_str());
        self.collapsed.set(collapse);
        drop(dom);

        self.render_direction(page);
        if collapse {
            ToggleOutcome::Collapsed
        } else {
            ToggleOutcome::Expanded
        }
    }

    /// The chevron points right while collapsed.
    fn render_direction(&self, page: &Page) {
        let collapsed = self.collapsed.get();
        let (direction, upper, lower) = if collapsed {
            ("right", "rotate(45deg)", "rotate(-45deg)")
        } else {
            ("left", "rotate(-45deg)", "rotate(45deg)")
        };
        let mut dom = page.dom();
        dom.set_attribute(self.tab.node(), "data-direction", direction);
        dom.set_style(&self.chevron.upper, "transform", upper);
        dom.set_style(&self.chevron.lower, "transform", lower);
    }
}

impl Reconcile for SidebarToggle {
    fn reconcile(&self, page: &Rc<Page>) {
        let wrap = page.dom_ref().query_selector(&self.wrap);
        if let Some(wrap) = wrap {
            self.follow_wrap(&wrap);
        }
        match self.tab.ensure_attached(page) {
            Attachment::ParentMissing | Attachment::Failed => return,
            Attachment::Inserted => debug!(target = "sidebar", "sidebar tab attached"),
            Attachment::Present => {}
        }
        {
            let mut dom = page.dom();
            if let Some(parent) = dom.parent(self.tab.node()) {
                if dom.computed_style(&parent, "position").as_deref() == Some("static") {
                    dom.set_style(&parent, "position", "relative");
                }
            }
        }
        self.render_direction(page);
    }
}

pub fn install(page: &Rc<Page>, config: &Config) -> Option<Rc<SidebarToggle>> {
    page.install_once(ArtifactKind::SidebarToggle, |page| {
        let sidebar = Rc::new(SidebarToggle::build(page, config));

        let on_click = Rc::clone(&sidebar);
        page.add_listener(
            ListenerTarget::Node(sidebar.tab().clone()),
            EventKind::Click,
            Phase::Bubble,
            move |page, _| {
                on_click.toggle(page);
            },
        );

        let on_key = Rc::clone(&sidebar);
        on_hotkey(page, config.hotkeys.sidebar.clone(), move |page| {
            on_key.toggle(page);
        });

        watch(page, Startup::Immediate, Rc::clone(&sidebar) as Rc<dyn Reconcile>);
        sidebar
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_tracks_outside_parentheses() {
        let tracks = TrackList::parse("72px  minmax(200px, 320px) repeat(2, 1fr)");
        assert_eq!(
            tracks.tracks(),
            ["72px", "minmax(200px, 320px)", "repeat(2, 1fr)"]
        );
    }

    #[test]
    fn collapse_zeroes_second_and_relaxes_third() {
        let tracks = TrackList::parse("72px 320px 1fr 48px");
        assert_eq!(
            tracks.collapsed().to_string(),
            "72px 0px minmax(0, auto) 48px"
        );
        assert_eq!(TrackList::parse("72px 1fr").collapsed().to_string(), "72px 0px");
    }

    #[test]
    fn short_layouts_do_not_collapse() {
        let tracks = TrackList::parse("1fr");
        assert_eq!(tracks.collapsed(), tracks);
        assert!(TrackList::parse("").is_empty());
    }
}
