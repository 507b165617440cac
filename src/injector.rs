//! Keeps injected artifacts attached while the host page rebuilds itself.
//!
//! An artifact is created once and then re-inserted, as the same node,
//! whenever a mutation batch shows it has lost its place.

use std::rc::Rc;

use tracing::{debug, trace, warn};

use kuchiki::NodeRef;

use crate::dom::{Document, Selector};
use crate::page::Page;

/// Where an artifact belongs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Last child of `<html>`.
    DocumentElement,
    /// Last child of `<head>`; waits while there is no head.
    Head,
    /// Last child of `<head>`, or of `<html>` while there is no head.
    HeadOrRoot,
    /// First child of `<body>`.
    BodyStart,
    /// Last child of the first element matching the selector.
    Within(Selector),
}

enum Position {
    Append,
    Prepend,
}

impl Placement {
    fn resolve(&self, dom: &Document) -> Option<(NodeRef, Position)> {
        match self {
            Placement::DocumentElement => Some((dom.document_element(), Position::Append)),
            Placement::Head => dom.head().map(|head| (head, Position::Append)),
            Placement::HeadOrRoot => Some((
                dom.head().unwrap_or_else(|| dom.document_element()),
                Position::Append,
            )),
            Placement::BodyStart => dom.body().map(|body| (body, Position::Prepend)),
            Placement::Within(selector) => {
                dom.query_selector(selector).map(|parent| (parent, Position::Append))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    Present,
    Inserted,
    ParentMissing,
    Failed,
}

/// One artifact node and the place it must stay in.
#[derive(Debug, Clone)]
pub struct SelfHealing {
    label: &'static str,
    node: NodeRef,
    placement: Placement,
}

impl SelfHealing {
    pub fn new(label: &'static str, node: NodeRef, placement: Placement) -> Self {
        Self {
            label,
            node,
            placement,
        }
    }

    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    /// Inserts the artifact unless its parent already contains it. Safe to
    /// call any number of times.
    pub fn ensure_attached(&self, page: &Page) -> Attachment {
        let mut dom = page.dom();
        let Some((parent, position)) = self.placement.resolve(&dom) else {
            trace!(target = "injector", artifact = self.label, "placement not found yet");
            return Attachment::ParentMissing;
        };
        if dom.contains(&parent, &self.node) {
            return Attachment::Present;
        }

        let reference = match position {
            Position::Append => None,
            Position::Prepend => dom.first_child(&parent),
        };
        match dom.insert_before(&parent, &self.node, reference.as_ref()) {
            Ok(()) => Attachment::Inserted,
            Err(err) => {
                warn!(target = "injector", artifact = self.label, error = %err, "failed to attach artifact");
                Attachment::Failed
            }
        }
    }
}

/// A reconciliation pass: assert that everything this component owns is in
/// place, fixing whatever is not.
pub trait Reconcile {
    fn reconcile(&self, page: &Rc<Page>);
}

impl Reconcile for SelfHealing {
    fn reconcile(&self, page: &Rc<Page>) {
        if self.ensure_attached(page) == Attachment::Inserted {
            debug!(target = "injector", artifact = self.label, "artifact attached");
        }
    }
}

impl<F> Reconcile for F
where
    F: Fn(&Rc<Page>),
{
    fn reconcile(&self, page: &Rc<Page>) {
        self(page)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Startup {
    Immediate,
    WhenReady,
}

/// Runs `reconciler` at startup and then on every mutation batch.
pub fn watch(page: &Rc<Page>, startup: Startup, reconciler: Rc<dyn Reconcile>) {
    let initial = Rc::clone(&reconciler);
    match startup {
        Startup::Immediate => initial.reconcile(page),
        Startup::WhenReady => page.when_ready(move |page| initial.reconcile(page)),
    }
    page.observe_mutations(move |page, _| reconciler.reconcile(page));
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;
    use crate::page::PageBuilder;

    fn page() -> Rc<Page> {
        PageBuilder::new(Url::parse("https://chat.example/").unwrap()).build()
    }

    fn style_node(page: &Page, id: &str) -> NodeRef {
        let mut dom = page.dom();
        let node = dom.create_element("style");
        dom.set_attribute(&node, "id", id);
        node
    }

    #[test]
    fn attach_is_idempotent() {
        let page = page();
        let healer = SelfHealing::new("test", style_node(&page, "marker"), Placement::Head);
        assert_eq!(healer.ensure_attached(&page), Attachment::Inserted);
        assert_eq!(healer.ensure_attached(&page), Attachment::Present);
        assert_eq!(page.dom_ref().count_with_id("marker"), 1);
    }

    #[test]
    fn body_start_goes_first() {
        let page = page();
        {
            let mut dom = page.dom();
            let body = dom.body().unwrap();
            let main = dom.create_element("main");
            dom.append_child(&body, &main).unwrap();
        }
        let node = style_node(&page, "bar");
        let healer = SelfHealing::new("bar", node.clone(), Placement::BodyStart);
        healer.ensure_attached(&page);
        let dom = page.dom_ref();
        assert_eq!(dom.first_child(&dom.body().unwrap()), Some(node));
    }

    #[test]
    fn missing_parent_waits_for_later_pass() {
        let page = page();
        let node = style_node(&page, "tab");
        let healer = SelfHealing::new(
            "tab",
            node.clone(),
            Placement::Within("main > div.content".parse().unwrap()),
        );
        assert_eq!(healer.ensure_attached(&page), Attachment::ParentMissing);

        let healer = Rc::new(healer);
        watch(&page, Startup::Immediate, healer);
        {
            let mut dom = page.dom();
            let body = dom.body().unwrap();
            let main = dom.create_element("main");
            let content = dom.create_element("div");
            dom.set_attribute(&content, "class", "content");
            dom.append_child(&main, &content).unwrap();
            dom.append_child(&body, &main).unwrap();
        }
        page.flush_mutations();
        assert_eq!(page.dom_ref().count_with_id("tab"), 1);
        assert!(page.dom_ref().is_connected(&node));
    }

    #[test]
    fn head_or_root_falls_back_to_document_element() {
        let page = page();
        {
            let mut dom = page.dom();
            let head = dom.head().unwrap();
            dom.remove(&head);
        }
        let node = style_node(&page, "drag");
        SelfHealing::new("drag", node.clone(), Placement::HeadOrRoot).ensure_attached(&page);
        let dom = page.dom_ref();
        assert_eq!(dom.parent(&node), Some(dom.document_element()));
    }

    #[test]
    fn watched_artifact_survives_body_replacement() {
        let page = page();
        let node = style_node(&page, "host");
        watch(
            &page,
            Startup::Immediate,
            Rc::new(SelfHealing::new("host", node.clone(), Placement::BodyStart)),
        );
        page.flush_mutations();

        page.dom().replace_body();
        page.flush_mutations();

        let dom = page.dom_ref();
        assert_eq!(dom.count_with_id("host"), 1);
        assert_eq!(dom.first_child(&dom.body().unwrap()), Some(node));
    }
}
