mod common;

use std::rc::Rc;

use shellgraft::config::Config;
use shellgraft::guard::ArtifactKind;
use shellgraft::page::Page;
use shellgraft::{inject_all, PageBuilder};
use url::Url;

use common::{render_host_layout, session, settle, CHAT_URL};

fn artifact_ids(config: &Config) -> [&str; 5] {
    [
        config.artifacts.font_override.as_str(),
        config.artifacts.scrollbar_style.as_str(),
        config.artifacts.sidebar_toggle.as_str(),
        config.artifacts.titlebar_host.as_str(),
        config.artifacts.titlebar_global_style.as_str(),
    ]
}

fn assert_single_copies(page: &Page, config: &Config) {
    let dom = page.dom_ref();
    for id in artifact_ids(config) {
        assert_eq!(dom.count_with_id(id), 1, "exactly one '{id}'");
        let node = dom.element_by_id(id).expect("artifact present");
        assert!(dom.is_connected(&node), "'{id}' is connected");
    }
}

#[tokio::test]
async fn repeated_injection_installs_once() {
    let session = session();
    let page = &session.page;
    page.run_until(async {
        render_host_layout(page, &session.config, "72px 320px 1fr");
        for _ in 0..3 {
            inject_all(page, &session.config);
        }
        settle().await;

        assert_single_copies(page, &session.config);
        assert_eq!(page.installed().len(), 6);
    })
    .await;
}

#[tokio::test]
async fn body_replacement_restores_the_titlebar() {
    let session = session();
    let page = &session.page;
    let config = &session.config;
    page.run_until(async {
        render_host_layout(page, config, "72px 320px 1fr");
        inject_all(page, config);
        settle().await;

        let fresh = page.dom().replace_body();
        page.flush_mutations();

        let dom = page.dom_ref();
        let host = dom
            .element_by_id(&config.artifacts.titlebar_host)
            .expect("titlebar host");
        assert_eq!(dom.first_child(&fresh), Some(host));
        assert_eq!(dom.count_with_id(&config.artifacts.titlebar_host), 1);
        assert_eq!(
            dom.attribute(&fresh, "data-tauri-drag-region").as_deref(),
            Some("")
        );
    })
    .await;
}

#[tokio::test]
async fn removed_titlebar_comes_back_as_the_same_node() {
    let session = session();
    let page = &session.page;
    let config = &session.config;
    page.run_until(async {
        inject_all(page, config);
        settle().await;

        let host = page
            .dom_ref()
            .element_by_id(&config.artifacts.titlebar_host)
            .expect("titlebar host");
        page.dom().remove(&host);
        page.flush_mutations();

        let dom = page.dom_ref();
        assert!(dom.is_connected(&host));
        assert_eq!(dom.first_child(&dom.body().expect("body")), Some(host));
        assert_eq!(dom.count_with_id(&config.artifacts.titlebar_host), 1);
    })
    .await;
}

#[tokio::test]
async fn cleared_head_gets_its_styles_back() {
    let session = session();
    let page = &session.page;
    let config = &session.config;
    page.run_until(async {
        inject_all(page, config);
        settle().await;

        page.dom().clear_head();
        page.flush_mutations();

        let dom = page.dom_ref();
        let head = dom.head().expect("head");
        for id in [
            config.artifacts.scrollbar_style.as_str(),
            config.artifacts.titlebar_global_style.as_str(),
        ] {
            let style = dom.element_by_id(id).expect("style present");
            assert_eq!(dom.parent(&style).as_ref(), Some(&head));
            assert_eq!(dom.count_with_id(id), 1);
        }
    })
    .await;
}

#[tokio::test]
async fn navigation_keeps_every_artifact_single() {
    let session = session();
    let page = &session.page;
    let config = &session.config;
    page.run_until(async {
        render_host_layout(page, config, "72px 320px 1fr");
        inject_all(page, config);
        settle().await;

        for _ in 0..3 {
            page.dom().replace_body();
            page.dom().clear_head();
            page.flush_mutations();
            render_host_layout(page, config, "72px 320px 1fr");
        }

        assert_single_copies(page, config);
    })
    .await;
}

#[tokio::test]
async fn titlebar_waits_for_the_document() {
    let page: Rc<Page> = PageBuilder::new(Url::parse(CHAT_URL).expect("url"))
        .loading()
        .build();
    let config = Config::default();
    page.run_until(async {
        inject_all(&page, &config);

        {
            let dom = page.dom_ref();
            assert_eq!(dom.count_with_id(&config.artifacts.titlebar_host), 0);
            assert_eq!(dom.count_with_id(&config.artifacts.font_override), 1);
        }

        page.finish_loading();
        settle().await;
        assert_eq!(
            page.dom_ref().count_with_id(&config.artifacts.titlebar_host),
            1
        );
    })
    .await;
}

#[tokio::test]
async fn other_origins_are_left_alone() {
    let session = session();
    let page = &session.page;
    let config = Config::from_yaml("host:\n  origins:\n    - https://elsewhere.example/\n")
        .expect("config");
    page.run_until(async {
        inject_all(page, &config);
        settle().await;
    })
    .await;

    assert!(page.installed().is_empty());
    assert!(!page.is_installed(ArtifactKind::Titlebar));
    assert_eq!(
        page.dom_ref().count_with_id(&config.artifacts.titlebar_host),
        0
    );
}
