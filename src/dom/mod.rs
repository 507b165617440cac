use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;

use html5ever::{LocalName, Namespace, QualName};
use kuchiki::traits::*;
use kuchiki::{Node, NodeData, NodeRef, Selectors};
use serde::Deserialize;
use thiserror::Error;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";
const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
const BLANK_DOCUMENT: &str = "<!DOCTYPE html><html><head></head><body></body></html>";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("<{0}> cannot be inserted under itself or one of its descendants")]
    HierarchyRequest(String),
    #[error("reference <{0}> is not a child of the target parent")]
    NotAChild(String),
    #[error("unsupported or malformed selector '{0}'")]
    InvalidSelector(String),
}

/// A compiled CSS selector that remembers its source text, so it can come
/// straight out of configuration.
#[derive(Clone, Deserialize)]
#[serde(try_from = "String")]
pub struct Selector {
    source: String,
    compiled: Rc<Selectors>,
}

impl Selector {
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, node: &NodeRef) -> bool {
        node.clone()
            .into_element_ref()
            .map(|element| self.compiled.matches(&element))
            .unwrap_or(false)
    }
}

impl FromStr for Selector {
    type Err = DomError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let source = raw.trim();
        if source.is_empty() {
            return Err(DomError::InvalidSelector(String::new()));
        }
        let compiled = Selectors::compile(source)
            .map_err(|()| DomError::InvalidSelector(source.to_string()))?;
        Ok(Self {
            source: source.to_string(),
            compiled: Rc::new(compiled),
        })
    }
}

impl TryFrom<String> for Selector {
    type Error = DomError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl PartialEq for Selector {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Selector {}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Selector").field(&self.source).finish()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// One child-list change, as delivered to mutation observers.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRecord {
    pub target: NodeRef,
    pub added: Vec<NodeRef>,
    pub removed: Vec<NodeRef>,
}

/// Shadow roots are the contents fragment of a `<template shadowrootmode>`
/// child of their host. Fragments have no parent, so the host is kept here.
struct ShadowLink {
    root: Weak<Node>,
    host: Weak<Node>,
}

/// A rule from the host page's own style sheets.
struct AuthorRule {
    selector: Selector,
    property: String,
    value: String,
}

/// Child-list mutations on nodes connected to the light tree are queued as
/// [`MutationRecord`]s, which is what an observer registered on the document
/// element with `{ childList: true, subtree: true }` would see.
pub struct Document {
    root: NodeRef,
    html: NodeRef,
    shadows: Vec<ShadowLink>,
    author_rules: Vec<AuthorRule>,
    pending: Vec<MutationRecord>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

fn qualified(namespace: &str, tag: &str) -> QualName {
    QualName::new(None, Namespace::from(namespace), LocalName::from(tag))
}

fn same_node(weak: &Weak<Node>, node: &NodeRef) -> bool {
    Weak::as_ptr(weak) == Rc::as_ptr(&node.0)
}

fn tag_of(node: &NodeRef) -> String {
    node.as_element()
        .map(|element| element.name.local.to_string())
        .unwrap_or_else(|| "#node".to_string())
}

impl Document {
    pub fn new() -> Self {
        let root = kuchiki::parse_html().one(BLANK_DOCUMENT);
        let html = root
            .children()
            .find(|child| child.as_element().is_some())
            .unwrap_or_else(|| root.clone());
        Self {
            root,
            html,
            shadows: Vec::new(),
            author_rules: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeRef {
        self.root.clone()
    }

    pub fn document_element(&self) -> NodeRef {
        self.html.clone()
    }

    pub fn head(&self) -> Option<NodeRef> {
        self.child_element_by_tag(&self.html, "head")
    }

    pub fn body(&self) -> Option<NodeRef> {
        self.child_element_by_tag(&self.html, "body")
    }

    fn child_element_by_tag(&self, parent: &NodeRef, tag: &str) -> Option<NodeRef> {
        parent
            .children()
            .find(|child| self.tag_name(child) == Some(tag))
    }

    pub fn create_element(&self, tag: &str) -> NodeRef {
        NodeRef::new_element(qualified(HTML_NAMESPACE, &tag.to_ascii_lowercase()), Vec::new())
    }

    pub fn create_svg_element(&self, tag: &str) -> NodeRef {
        NodeRef::new_element(qualified(SVG_NAMESPACE, tag), Vec::new())
    }

    pub fn create_text(&self, text: &str) -> NodeRef {
        NodeRef::new_text(text)
    }

    /// Returns the existing shadow root when the host already has one.
    pub fn attach_shadow(&mut self, host: &NodeRef) -> NodeRef {
        if let Some(existing) = self.shadow_root(host) {
            return existing;
        }
        let template = self.create_element("template");
        self.set_attribute(&template, "shadowrootmode", "open");
        let root = template
            .as_element()
            .and_then(|element| element.template_contents.clone())
            .unwrap_or_else(|| NodeRef::new(NodeData::DocumentFragment));
        // attachShadow is not a child-list change.
        host.prepend(template);
        self.shadows.retain(|link| link.root.strong_count() > 0);
        self.shadows.push(ShadowLink {
            root: Rc::downgrade(&root.0),
            host: Rc::downgrade(&host.0),
        });
        root
    }

    pub fn shadow_root(&self, host: &NodeRef) -> Option<NodeRef> {
        host.children()
            .filter(|child| self.tag_name(child) == Some("template"))
            .find(|child| self.attribute(child, "shadowrootmode").is_some())
            .and_then(|template| {
                template
                    .as_element()
                    .and_then(|element| element.template_contents.clone())
            })
    }

    fn shadow_host(&self, root: &NodeRef) -> Option<NodeRef> {
        self.shadows
            .iter()
            .find(|link| same_node(&link.root, root))
            .and_then(|link| link.host.upgrade())
            .map(NodeRef)
    }

    pub fn parent(&self, node: &NodeRef) -> Option<NodeRef> {
        node.parent()
    }

    pub fn children(&self, node: &NodeRef) -> Vec<NodeRef> {
        node.children().collect()
    }

    pub fn first_child(&self, node: &NodeRef) -> Option<NodeRef> {
        node.first_child()
    }

    /// Parent in the composed tree: a shadow root's parent is its host.
    pub fn composed_parent(&self, node: &NodeRef) -> Option<NodeRef> {
        node.parent().or_else(|| self.shadow_host(node))
    }

    /// `node` followed by its composed ancestors, ending at the document
    /// when connected.
    pub fn composed_path(&self, node: &NodeRef) -> Vec<NodeRef> {
        let mut path = vec![node.clone()];
        while let Some(parent) = path.last().and_then(|last| self.composed_parent(last)) {
            path.push(parent);
        }
        path
    }

    /// Light-tree inclusive containment; does not cross shadow boundaries.
    pub fn contains(&self, ancestor: &NodeRef, node: &NodeRef) -> bool {
        node.inclusive_ancestors().any(|candidate| candidate == *ancestor)
    }

    pub fn is_connected(&self, node: &NodeRef) -> bool {
        self.composed_path(node).last() == Some(&self.root)
    }

    pub fn append_child(&mut self, parent: &NodeRef, child: &NodeRef) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Inserts `child` under `parent` before `reference` (or last), moving it
    /// out of its previous parent first.
    pub fn insert_before(
        &mut self,
        parent: &NodeRef,
        child: &NodeRef,
        reference: Option<&NodeRef>,
    ) -> Result<(), DomError> {
        if self.composed_path(parent).contains(child) {
            return Err(DomError::HierarchyRequest(tag_of(child)));
        }
        if let Some(reference) = reference {
            if reference.parent().as_ref() != Some(parent) {
                return Err(DomError::NotAChild(tag_of(reference)));
            }
            if reference == child {
                return Ok(());
            }
        }

        self.remove(child);
        match reference {
            Some(reference) => reference.insert_before(child.clone()),
            None => parent.append(child.clone()),
        }
        self.record(parent, vec![child.clone()], Vec::new());
        Ok(())
    }

    pub fn remove(&mut self, node: &NodeRef) {
        let Some(parent) = node.parent() else {
            return;
        };
        node.detach();
        self.record(&parent, Vec::new(), vec![node.clone()]);
    }

    pub fn clear_children(&mut self, node: &NodeRef) {
        let removed: Vec<NodeRef> = node.children().collect();
        if removed.is_empty() {
            return;
        }
        for child in &removed {
            child.detach();
        }
        self.record(node, Vec::new(), removed);
    }

    /// Swaps `<body>` for a fresh element, the way SPA frameworks do on
    /// navigation. Everything under the old body is detached with it.
    pub fn replace_body(&mut self) -> NodeRef {
        let fresh = self.create_element("body");
        let html = self.html.clone();
        let old = self.body();
        // `old` is a child of `html`, so the insert cannot fail.
        let _ = self.insert_before(&html, &fresh, old.as_ref());
        if let Some(old) = old {
            self.remove(&old);
        }
        fresh
    }

    /// Drops every child of `<head>`, as some host navigations do.
    pub fn clear_head(&mut self) {
        if let Some(head) = self.head() {
            self.clear_children(&head);
        }
    }

    fn record(&mut self, target: &NodeRef, added: Vec<NodeRef>, removed: Vec<NodeRef>) {
        if self.contains(&self.root, target) {
            self.pending.push(MutationRecord {
                target: target.clone(),
                added,
                removed,
            });
        }
    }

    pub fn has_pending_records(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.pending)
    }

    pub fn tag_name<'a>(&self, node: &'a NodeRef) -> Option<&'a str> {
        node.as_element().map(|element| &*element.name.local)
    }

    pub fn attribute(&self, node: &NodeRef, name: &str) -> Option<String> {
        let element = node.as_element()?;
        let attributes = element.attributes.borrow();
        attributes.get(name).map(str::to_string)
    }

    pub fn set_attribute(&mut self, node: &NodeRef, name: &str, value: impl Into<String>) {
        if let Some(element) = node.as_element() {
            element.attributes.borrow_mut().insert(name, value.into());
        }
    }

    pub fn has_class(&self, node: &NodeRef, class: &str) -> bool {
        self.attribute(node, "class")
            .map(|value| value.split_ascii_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// `classList.toggle(class, force)`.
    pub fn set_class(&mut self, node: &NodeRef, class: &str, present: bool) {
        let mut classes: Vec<String> = self
            .attribute(node, "class")
            .map(|value| value.split_ascii_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        let already = classes.iter().any(|c| c == class);
        match (present, already) {
            (true, false) => classes.push(class.to_string()),
            (false, true) => classes.retain(|c| c != class),
            _ => return,
        }
        self.set_attribute(node, "class", classes.join(" "));
    }

    /// Writes one declaration into the element's `style` attribute.
    pub fn set_style(&mut self, node: &NodeRef, property: &str, value: impl Into<String>) {
        let value = value.into();
        let mut declarations: Vec<(String, String)> = self
            .attribute(node, "style")
            .map(|style| {
                declarations(&style)
                    .map(|(p, v)| (p.to_string(), v.to_string()))
                    .collect()
            })
            .unwrap_or_default();
        match declarations.iter_mut().find(|(p, _)| p == property) {
            Some(existing) => existing.1 = value,
            None => declarations.push((property.to_string(), value)),
        }
        let style = declarations
            .iter()
            .map(|(p, v)| format!("{p}: {v}"))
            .collect::<Vec<_>>()
            .join("; ");
        self.set_attribute(node, "style", style);
    }

    pub fn style(&self, node: &NodeRef, property: &str) -> Option<String> {
        let style = self.attribute(node, "style")?;
        declarations(&style)
            .filter(|(p, _)| *p == property)
            .last()
            .map(|(_, v)| v.to_string())
    }

    /// Declares a rule from the host page's own style sheets. A later rule
    /// for the same selector and property replaces the earlier one.
    pub fn add_author_rule(&mut self, selector: &Selector, property: &str, value: impl Into<String>) {
        self.author_rules
            .retain(|rule| !(rule.selector == *selector && rule.property == property));
        self.author_rules.push(AuthorRule {
            selector: selector.clone(),
            property: property.to_string(),
            value: value.into(),
        });
    }

    /// Inline style wins over author rules, later rules over earlier ones.
    /// Unset properties fall back to their initial value where one matters
    /// to callers.
    pub fn computed_style(&self, node: &NodeRef, property: &str) -> Option<String> {
        node.as_element()?;
        self.style(node, property)
            .or_else(|| {
                self.author_rules
                    .iter()
                    .rev()
                    .find(|rule| rule.property == property && rule.selector.matches(node))
                    .map(|rule| rule.value.clone())
            })
            .or_else(|| initial_value(property).map(str::to_string))
    }

    pub fn set_text_content(&mut self, node: &NodeRef, text: &str) {
        self.clear_children(node);
        if !text.is_empty() {
            let text_node = self.create_text(text);
            node.append(text_node.clone());
            self.record(node, vec![text_node], Vec::new());
        }
    }

    pub fn text_content(&self, node: &NodeRef) -> String {
        node.text_contents()
    }

    pub fn element_by_id(&self, id: &str) -> Option<NodeRef> {
        self.root
            .descendants()
            .elements()
            .find(|element| element.attributes.borrow().get("id") == Some(id))
            .map(|element| element.as_node().clone())
    }

    pub fn query_selector(&self, selector: &Selector) -> Option<NodeRef> {
        self.root
            .descendants()
            .elements()
            .find(|element| selector.compiled.matches(element))
            .map(|element| element.as_node().clone())
    }

    /// Counts elements carrying `id` anywhere in the composed tree.
    pub fn count_with_id(&self, id: &str) -> usize {
        let mut count = 0;
        let mut stack = vec![self.root.clone()];
        while let Some(node) = stack.pop() {
            if let Some(element) = node.as_element() {
                if element.attributes.borrow().get("id") == Some(id) {
                    count += 1;
                }
                if let Some(contents) = &element.template_contents {
                    stack.push(contents.clone());
                }
            }
            stack.extend(node.children());
        }
        count
    }

    pub fn to_html(&self) -> String {
        self.outer_html(&self.root)
    }

    pub fn outer_html(&self, node: &NodeRef) -> String {
        let mut bytes = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = node.serialize(&mut bytes);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

fn declarations(style: &str) -> impl Iterator<Item = (&str, &str)> {
    style
        .split(';')
        .filter_map(|declaration| declaration.split_once(':'))
        .map(|(property, value)| (property.trim(), value.trim()))
        .filter(|(property, _)| !property.is_empty())
}

fn initial_value(property: &str) -> Option<&'static str> {
    match property {
        "position" => Some("static"),
        "display" => Some("inline"),
        _ => None,
    }
}
