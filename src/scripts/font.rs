use std::rc::Rc;

use kuchiki::NodeRef;

use crate::config::Config;
use crate::guard::ArtifactKind;
use crate::injector::{watch, Placement, SelfHealing, Startup};
use crate::page::Page;

fn font_css(family: &str) -> String {
    format!(":root, body, * {{\n  font-family: {family}!important;\n}}\n")
}

/// Forces the configured font family on every element.
pub fn install(page: &Rc<Page>, config: &Config) -> Option<NodeRef> {
    page.install_once(ArtifactKind::FontOverride, |page| {
        let style = {
            let mut dom = page.dom();
            super::style_element(
                &mut dom,
                &config.artifacts.font_override,
                &font_css(&config.style.font_family),
            )
        };
        watch(
            page,
            Startup::Immediate,
            Rc::new(SelfHealing::new("font-override", style.clone(), Placement::DocumentElement)),
        );
        style
    })
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;
    use crate::page::PageBuilder;

    #[test]
    fn installs_once_under_document_element() {
        let page = PageBuilder::new(Url::parse("https://chat.example/").unwrap()).build();
        let config = Config::default();
        let style = install(&page, &config).unwrap();
        assert!(install(&page, &config).is_none());

        let dom = page.dom_ref();
        assert_eq!(dom.parent(&style), Some(dom.document_element()));
        assert_eq!(dom.count_with_id(&config.artifacts.font_override), 1);
        assert!(dom.text_content(&style).contains("font-family: ui-rounded!important"));
    }
}
