use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use keyboard_types::{Code, Key, KeyboardEvent, Modifiers};
use shellgraft::bridge::scripted::ScriptedHost;
use shellgraft::scripts::badge::{ActionSurface, BadgeApi, BadgeDetails};
use shellgraft::{inject_all, Config, Page, PageBuilder};
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

const FALLBACK_URL: &str = "https://chat.example/";

/// Stands in for the page's own badge implementation.
struct LoggingBadge;

impl BadgeApi for LoggingBadge {
    fn set_badge_text(&self, details: BadgeDetails) {
        info!(target = "badge", text = ?details.text, "page set its badge");
    }
}

fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(Config::default_path);
    let config = Config::load(config_path).context("failed to load configuration")?;

    let subscriber_result = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with_writer(std::io::stderr)
        .try_init();
    if subscriber_result.is_err() {
        // tracing was already initialised; continue silently
    }

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build runtime")?;
    let url = match config.host.origins.first() {
        Some(origin) => origin.clone(),
        None => Url::parse(FALLBACK_URL)?,
    };
    let host = ScriptedHost::new();
    host.set_dev(true);
    let action = ActionSurface::new(Rc::new(LoggingBadge));
    let page = PageBuilder::new(url)
        .host(Rc::new(host.clone()))
        .action_surface(Rc::clone(&action))
        .loading()
        .build();

    rt.block_on(page.run_until(run(&page, &host, &action, &config)));
    println!("{}", page.dom_ref().to_html());
    Ok(())
}

/// Lets spawned bridge continuations run to completion.
async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// Lays out the host page the way the chat client renders it.
fn render_host_layout(page: &Page, config: &Config) {
    let mut dom = page.dom();
    let Some(body) = dom.body() else {
        return;
    };
    dom.add_author_rule(&config.host.layout_wrap, "display", "grid");
    dom.add_author_rule(
        &config.host.layout_wrap,
        "grid-template-columns",
        "72px 320px minmax(0, 1fr)",
    );
    let wrap = dom.create_element("div");
    dom.set_attribute(&wrap, "class", "pageLayout-module__wrap__h-oSt");
    let content = dom.create_element("div");
    dom.set_attribute(&content, "class", "chatroomContent-module__content_area__gK6db");
    // Both elements are fresh, so the appends cannot fail.
    let _ = dom.append_child(&wrap, &content);
    let _ = dom.append_child(&body, &wrap);
}

async fn run(page: &Rc<Page>, host: &ScriptedHost, action: &ActionSurface, config: &Config) {
    render_host_layout(page, config);
    inject_all(page, config);
    page.finish_loading();
    settle().await;

    info!(target = "demo", "simulating a client-side navigation");
    page.dom().replace_body();
    page.dom().clear_head();
    page.flush_mutations();
    render_host_layout(page, config);
    page.flush_mutations();

    page.dispatch_key(KeyboardEvent {
        key: Key::Character("l".to_string()),
        code: Code::KeyL,
        modifiers: Modifiers::ALT,
        ..Default::default()
    });
    page.dispatch_key(KeyboardEvent {
        key: Key::Character("h".to_string()),
        code: Code::KeyH,
        modifiers: Modifiers::ALT,
        ..Default::default()
    });
    action.set_badge_text(BadgeDetails {
        text: Some("3".to_string()),
    });
    settle().await;

    info!(
        target = "demo",
        content_protected = host.content_protected(),
        badge = ?host.badge_text(),
        bridge_calls = host.calls().len(),
        "native side after the session"
    );
}
