use std::rc::Rc;

use keyboard_types::KeyboardEvent;

use super::Page;
use kuchiki::NodeRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Click,
    KeyDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Capture,
    Bubble,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListenerTarget {
    Window,
    Document,
    Node(NodeRef),
}

pub type EventHandler = Rc<dyn Fn(&Rc<Page>, &mut PageEvent)>;

struct Listener {
    target: ListenerTarget,
    kind: EventKind,
    phase: Phase,
    handler: EventHandler,
}

#[derive(Default)]
pub(super) struct ListenerTable {
    entries: Vec<Listener>,
}

impl ListenerTable {
    fn matching(&self, target: &ListenerTarget, kind: EventKind, phase: Phase) -> Vec<EventHandler> {
        self.entries
            .iter()
            .filter(|l| l.target == *target && l.kind == kind && l.phase == phase)
            .map(|l| Rc::clone(&l.handler))
            .collect()
    }
}

/// An event travelling through the page.
pub struct PageEvent {
    kind: EventKind,
    target: NodeRef,
    path: Vec<NodeRef>,
    key: Option<KeyboardEvent>,
    propagation_stopped: bool,
}

impl PageEvent {
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn target(&self) -> &NodeRef {
        &self.target
    }

    /// The target followed by its ancestors, crossing shadow boundaries.
    pub fn composed_path(&self) -> &[NodeRef] {
        &self.path
    }

    pub fn path_contains(&self, node: &NodeRef) -> bool {
        self.path.contains(node)
    }

    pub fn key(&self) -> Option<&KeyboardEvent> {
        self.key.as_ref()
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub propagation_stopped: bool,
}

impl Page {
    pub fn add_listener<F>(&self, target: ListenerTarget, kind: EventKind, phase: Phase, handler: F)
    where
        F: Fn(&Rc<Page>, &mut PageEvent) + 'static,
    {
        self.listeners.borrow_mut().entries.push(Listener {
            target,
            kind,
            phase,
            handler: Rc::new(handler),
        });
    }

    /// Drops every listener registered on `nodes`, used when a subtree is
    /// rebuilt.
    pub fn forget_node_listeners(&self, nodes: &[NodeRef]) {
        self.listeners.borrow_mut().entries.retain(|l| match &l.target {
            ListenerTarget::Node(node) => !nodes.contains(node),
            _ => true,
        });
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().entries.len()
    }

    pub fn dispatch_click(self: &Rc<Self>, target: &NodeRef) -> DispatchOutcome {
        let path = self.dom_ref().composed_path(target);
        self.dispatch(PageEvent {
            kind: EventKind::Click,
            target: target.clone(),
            path,
            key: None,
            propagation_stopped: false,
        })
    }

    /// Key events target the focused element, which is always `<body>` here.
    pub fn dispatch_key(self: &Rc<Self>, key: KeyboardEvent) -> DispatchOutcome {
        let (target, path) = {
            let dom = self.dom_ref();
            let target = dom.body().unwrap_or_else(|| dom.document_element());
            let path = dom.composed_path(&target);
            (target, path)
        };
        self.dispatch(PageEvent {
            kind: EventKind::KeyDown,
            target,
            path,
            key: Some(key),
            propagation_stopped: false,
        })
    }

    fn dispatch(self: &Rc<Self>, mut event: PageEvent) -> DispatchOutcome {
        let root = self.dom_ref().root();
        let nodes: Vec<NodeRef> = event
            .path
            .iter()
            .filter(|node| **node != root)
            .cloned()
            .collect();

        let mut stages = vec![
            (ListenerTarget::Window, Phase::Capture),
            (ListenerTarget::Document, Phase::Capture),
        ];
        stages.extend(nodes.iter().rev().map(|n| (ListenerTarget::Node(n.clone()), Phase::Capture)));
        stages.extend(nodes.iter().map(|n| (ListenerTarget::Node(n.clone()), Phase::Bubble)));
        stages.push((ListenerTarget::Document, Phase::Bubble));
        stages.push((ListenerTarget::Window, Phase::Bubble));

        for (target, phase) in stages {
            let handlers = self.listeners.borrow().matching(&target, event.kind, phase);
            for handler in handlers {
                handler(self, &mut event);
            }
            if event.propagation_stopped {
                break;
            }
        }

        self.flush_mutations();
        DispatchOutcome {
            propagation_stopped: event.propagation_stopped,
        }
    }
}
