use std::rc::Rc;

use kuchiki::NodeRef;

use crate::config::Config;
use crate::guard::ArtifactKind;
use crate::injector::{watch, Placement, SelfHealing, Startup};
use crate::page::Page;

fn scrollbar_css(size: u32) -> String {
    format!(
        r#":root {{
  --shellgraft-scrollbar-size: {size}px;
  --shellgraft-scrollbar-thumb: rgba(128, 128, 128, 0.45);
  --shellgraft-scrollbar-thumb-hover: rgba(128, 128, 128, 0.65);
  --shellgraft-scrollbar-thumb-active: rgba(128, 128, 128, 0.8);
  scrollbar-gutter: auto;
}}
::-webkit-scrollbar {{
  width: var(--shellgraft-scrollbar-size);
  height: var(--shellgraft-scrollbar-size);
}}
::-webkit-scrollbar-track, ::-webkit-scrollbar-corner {{ background: transparent; }}
::-webkit-scrollbar-thumb {{
  background: var(--shellgraft-scrollbar-thumb);
  border-radius: 999px;
  border: 2px solid transparent;
  background-clip: padding-box;
}}
::-webkit-scrollbar-thumb:hover {{ background: var(--shellgraft-scrollbar-thumb-hover); }}
::-webkit-scrollbar-thumb:active {{ background: var(--shellgraft-scrollbar-thumb-active); }}
* {{
  scrollbar-width: thin;
  scrollbar-color: var(--shellgraft-scrollbar-thumb) transparent;
}}
"#
    )
}

/// Thin rounded scrollbars. Kept in `<head>`, which some host navigations
/// empty.
pub fn install(page: &Rc<Page>, config: &Config) -> Option<NodeRef> {
    page.install_once(ArtifactKind::ScrollbarStyle, |page| {
        let style = {
            let mut dom = page.dom();
            super::style_element(
                &mut dom,
                &config.artifacts.scrollbar_style,
                &scrollbar_css(config.style.scrollbar_size),
            )
        };
        watch(
            page,
            Startup::WhenReady,
            Rc::new(SelfHealing::new("scrollbar-style", style.clone(), Placement::Head)),
        );
        style
    })
}
