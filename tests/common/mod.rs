#![allow(dead_code)]

use std::rc::Rc;

use keyboard_types::{Code, Key, KeyboardEvent, Modifiers};
use kuchiki::NodeRef;
use shellgraft::bridge::scripted::ScriptedHost;
use shellgraft::{Config, Page, PageBuilder};
use url::Url;

pub const CHAT_URL: &str = "https://chat.example/room/1";

pub struct Session {
    pub page: Rc<Page>,
    pub host: ScriptedHost,
    pub config: Config,
}

pub fn session() -> Session {
    let host = ScriptedHost::new();
    let page = PageBuilder::new(Url::parse(CHAT_URL).expect("url"))
        .host(Rc::new(host.clone()))
        .build();
    Session {
        page,
        host,
        config: Config::default(),
    }
}

pub fn page_without_bridge() -> Rc<Page> {
    PageBuilder::new(Url::parse(CHAT_URL).expect("url")).build()
}

/// Lets spawned bridge continuations run.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// Class names the chat client ships; the suffix changes per release.
pub const WRAP_CLASS: &str = "pageLayout-module__wrap__h-oSt";
pub const CONTENT_CLASS: &str = "chatroomContent-module__content_area__gK6db";

pub struct HostLayout {
    pub wrap: NodeRef,
    pub content: NodeRef,
}

/// Appends the chat client's grid wrap and content area to the body. The
/// host style sheet gives the wrap `columns`.
pub fn render_host_layout(page: &Rc<Page>, config: &Config, columns: &str) -> HostLayout {
    let layout = {
        let mut dom = page.dom();
        let body = dom.body().expect("body");
        dom.add_author_rule(&config.host.layout_wrap, "grid-template-columns", columns);
        let wrap = dom.create_element("div");
        dom.set_attribute(&wrap, "class", WRAP_CLASS);
        let content = dom.create_element("div");
        dom.set_attribute(&content, "class", CONTENT_CLASS);
        dom.append_child(&wrap, &content).expect("append content");
        dom.append_child(&body, &wrap).expect("append wrap");
        HostLayout { wrap, content }
    };
    page.flush_mutations();
    layout
}

pub fn key(text: &str, code: Code, modifiers: Modifiers) -> KeyboardEvent {
    KeyboardEvent {
        key: Key::Character(text.to_string()),
        code,
        modifiers,
        ..Default::default()
    }
}

pub fn escape() -> KeyboardEvent {
    KeyboardEvent {
        key: Key::Escape,
        code: Code::Escape,
        ..Default::default()
    }
}
