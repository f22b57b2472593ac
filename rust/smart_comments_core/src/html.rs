//! HTML export of the rendered thread.

use crate::view::{Element, ViewNode, ViewTree};

const VOID_TAGS: &[&str] = &["input", "br", "img"];

pub fn to_html(tree: &ViewTree) -> String {
    let mut out = String::new();
    for node in &tree.nodes {
        write_node(&mut out, node);
    }
    out
}

/// Serializes the thread wrapped in its container element.
pub fn to_html_in_container(tree: &ViewTree) -> String {
    format!("<div class=\"{}\">{}</div>", crate::view::class::CONTAINER, to_html(tree))
}

fn write_node(out: &mut String, node: &ViewNode) {
    match node {
        ViewNode::Element(e) => write_element(out, e),
        ViewNode::Text(t) => out.push_str(&html_escape::encode_text(t)),
        // store-escaped already
        ViewNode::Markup(m) => out.push_str(m),
    }
}

fn write_element(out: &mut String, e: &Element) {
    out.push('<');
    out.push_str(e.tag);
    if !e.classes.is_empty() {
        out.push_str(&format!(" class=\"{}\"", html_escape::encode_double_quoted_attribute(&e.classes.join(" "))));
    }
    for (name, value) in &e.attrs {
        out.push_str(&format!(" {}=\"{}\"", name, html_escape::encode_double_quoted_attribute(value)));
    }
    let value = e.input.as_ref().map(|b| b.value.as_str()).unwrap_or_default();
    if VOID_TAGS.contains(&e.tag) {
        if e.input.is_some() {
            out.push_str(&format!(" value=\"{}\"", html_escape::encode_double_quoted_attribute(value)));
        }
        out.push_str("/>");
        return;
    }
    out.push('>');
    if e.tag == "textarea" {
        out.push_str(&html_escape::encode_text(value));
    }
    for child in &e.children {
        write_node(out, child);
    }
    out.push_str(&format!("</{}>", e.tag));
}
