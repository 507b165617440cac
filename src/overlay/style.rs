use kuchiki::NodeRef;

use crate::dom::Document;

pub(super) fn shadow_css(height: u32) -> String {
    format!(
        r#":host {{ all: initial; position: fixed; inset: 0 0 auto 0; z-index: 2147483647; pointer-events: none; }}
*, *::before, *::after {{ box-sizing: border-box; }}
.bar {{
  height: {height}px;
  display: flex;
  align-items: stretch;
  background: transparent;
  color: #cccccc;
  pointer-events: none;
  user-select: none;
  font-family: "Segoe UI", system-ui, sans-serif;
  font-size: 12px;
  line-height: 1;
}}
.right {{
  display: flex;
  align-items: center;
  position: relative;
  -webkit-app-region: no-drag;
  app-region: no-drag;
  pointer-events: auto;
  gap: 6px;
  margin-left: 7px;
}}
.settings-button {{
  appearance: none;
  border: none;
  background: transparent;
  color: #707991;
  width: 16px;
  height: 16px;
  padding: 0;
  cursor: pointer;
  border-radius: 999px;
}}
.dropdown {{
  position: absolute;
  top: {height}px;
  left: 0;
  min-width: 280px;
  max-width: 420px;
  background: #ffffff;
  color: #000000;
  border: 1px solid #c8c8c8;
  border-radius: 5px;
  padding: 6px 0;
  display: none;
  white-space: nowrap;
}}
.dropdown[data-open="true"] {{ display: block; }}
.item {{
  width: 100%;
  border: none;
  background: transparent;
  display: grid;
  grid-template-columns: 18px minmax(0, 1fr) max-content;
  align-items: center;
  gap: 10px;
  padding: 7px 12px;
  cursor: pointer;
  text-align: left;
  font-size: 12px;
}}
.item:hover {{ background: #fafafa; }}
.check-mark {{ display: inline-block; width: 14px; height: 14px; border-radius: 3px; border: 1px solid #202a43; position: relative; }}
.item.is-radio .check-mark {{ border-radius: 999px; }}
.item.is-checked .check-mark {{ background: #07b53b; }}
.item.is-checked.is-radio .check-mark {{ background: transparent; }}
.item.is-checked.is-radio .check-mark::after {{ content: ""; position: absolute; inset: 2px; border-radius: 999px; background: #07b53b; }}
.label {{ overflow: hidden; text-overflow: ellipsis; min-width: 0; }}
.shortcut {{ font-size: 11px; padding-left: 14px; }}
.sep {{ height: 1px; margin: 6px 0; background: #efefef; }}
.control-button {{
  appearance: none;
  border: none;
  padding: 0;
  width: 12px;
  height: 12px;
  border-radius: 999px;
  cursor: pointer;
  color: rgba(0, 0, 0, 0.6);
}}
.control-button .control-icon {{ width: 7px; height: 7px; opacity: 0; transition: opacity 0.12s ease; }}
.control-button:hover .control-icon, .control-button:focus-visible .control-icon {{ opacity: 1; }}
.control-button.minimize {{ background: #f6c343; }}
.control-button.maximize {{ background: #58c966; }}
.control-button.close {{ background: #f26a6a; }}
"#
    )
}

const DRAG_EXEMPT: &[&str] = &[
    "a",
    "button",
    "input",
    "textarea",
    "select",
    "option",
    "[role=\"button\"]",
    "[role=\"link\"]",
    "[contenteditable=\"true\"]",
    "[contenteditable=\"\"]",
    "[contenteditable=\"plaintext-only\"]",
];

/// Makes the page body a window drag region while keeping interactive
/// elements clickable.
pub(super) fn global_css(extra_exempt: &[String]) -> String {
    let exempt: Vec<&str> = DRAG_EXEMPT
        .iter()
        .copied()
        .chain(extra_exempt.iter().map(String::as_str))
        .collect();
    format!(
        "body {{\n  -webkit-app-region: drag;\n  app-region: drag;\n}}\n{} {{\n  -webkit-app-region: no-drag;\n  app-region: no-drag;\n}}\n",
        exempt.join(",\n")
    )
}

pub(super) enum Shape {
    Line(u8, u8, u8, u8),
    Dot,
}

pub(super) const MINIMIZE_ICON: &[Shape] = &[Shape::Line(2, 6, 10, 6)];
pub(super) const MAXIMIZE_ICON: &[Shape] = &[Shape::Line(2, 6, 10, 6), Shape::Line(6, 2, 6, 10)];
pub(super) const RESTORE_ICON: &[Shape] = &[Shape::Dot];
pub(super) const CLOSE_ICON: &[Shape] = &[Shape::Line(2, 2, 10, 10), Shape::Line(10, 2, 2, 10)];

/// Builds a detached 12x12 control icon.
pub(super) fn control_icon(dom: &mut Document, shapes: &[Shape]) -> NodeRef {
    let svg = dom.create_svg_element("svg");
    dom.set_attribute(&svg, "class", "control-icon");
    dom.set_attribute(&svg, "xmlns", "http://www.w3.org/2000/svg");
    dom.set_attribute(&svg, "viewBox", "0 0 12 12");
    dom.set_attribute(&svg, "aria-hidden", "true");
    for shape in shapes {
        let node = match *shape {
            Shape::Line(x1, y1, x2, y2) => {
                let line = dom.create_svg_element("line");
                for (name, value) in [("x1", x1), ("y1", y1), ("x2", x2), ("y2", y2)] {
                    dom.set_attribute(&line, name, value.to_string());
                }
                dom.set_attribute(&line, "stroke-width", "2");
                dom.set_attribute(&line, "stroke-linecap", "round");
                line
            }
            Shape::Dot => {
                let circle = dom.create_svg_element("circle");
                dom.set_attribute(&circle, "cx", "6");
                dom.set_attribute(&circle, "cy", "6");
                dom.set_attribute(&circle, "r", "3");
                dom.set_attribute(&circle, "fill", "currentColor");
                circle
            }
        };
        dom.set_attribute(&node, "stroke", "currentColor");
        let _ = dom.append_child(&svg, &node);
    }
    svg
}

/// The hexagonal gear on the settings button.
pub(super) fn gear_icon(dom: &mut Document) -> NodeRef {
    let svg = dom.create_svg_element("svg");
    for (name, value) in [
        ("xmlns", "http://www.w3.org/2000/svg"),
        ("viewBox", "0 0 24 24"),
        ("aria-hidden", "true"),
        ("fill", "none"),
        ("stroke", "currentColor"),
        ("stroke-width", "2"),
        ("stroke-linecap", "round"),
        ("stroke-linejoin", "round"),
    ] {
        dom.set_attribute(&svg, name, value);
    }
    for d in [
        "M19.875 6.27a2.225 2.225 0 0 1 1.125 1.948v7.284c0 .809 -.443 1.555 -1.158 1.948l-6.75 4.27a2.269 2.269 0 0 1 -2.184 0l-6.75 -4.27a2.225 2.225 0 0 1 -1.158 -1.948v-7.285c0 -.809 .443 -1.554 1.158 -1.947l6.75 -3.98a2.33 2.33 0 0 1 2.25 0l6.75 3.98h-.033z",
        "M12 12m-3 0a3 3 0 1 0 6 0a3 3 0 1 0 -6 0",
    ] {
        let path = dom.create_svg_element("path");
        dom.set_attribute(&path, "d", d);
        let _ = dom.append_child(&svg, &path);
    }
    svg
}
