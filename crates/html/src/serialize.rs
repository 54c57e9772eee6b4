use crate::dom::Dom;
use crate::tokenizer::is_void_element;
use crate::types::{NodeId, NodeKind};

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

fn is_rawtext(name: &str) -> bool {
    name == "script" || name == "style"
}

impl Dom {
    /// Serialize a live subtree to markup. Dead ids serialize to an empty string.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        // (node, closing): the closing pass emits the end tag once children are written.
        let mut stack: Vec<(NodeId, bool)> = vec![(id, false)];
        while let Some((current, closing)) = stack.pop() {
            let Some(kind) = self.kind(current) else {
                continue;
            };
            if closing {
                if let NodeKind::Element { name, .. } = kind {
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                }
                continue;
            }
            match kind {
                NodeKind::Document { doctype } => {
                    if let Some(doctype) = doctype {
                        out.push_str("<!DOCTYPE ");
                        out.push_str(doctype);
                        out.push('>');
                    }
                }
                NodeKind::Element { name, attributes } => {
                    out.push('<');
                    out.push_str(name);
                    for (attr, value) in attributes {
                        out.push(' ');
                        out.push_str(attr);
                        if let Some(value) = value {
                            out.push_str("=\"");
                            escape_attr(value, &mut out);
                            out.push('"');
                        }
                    }
                    out.push('>');
                    if is_void_element(name) {
                        continue;
                    }
                    stack.push((current, true));
                }
                NodeKind::Text { text } => {
                    let raw_parent = self
                        .parent(current)
                        .and_then(|p| self.element_name(p))
                        .is_some_and(is_rawtext);
                    if raw_parent {
                        out.push_str(text);
                    } else {
                        escape_text(text, &mut out);
                    }
                }
                NodeKind::Comment { text } => {
                    out.push_str("<!--");
                    out.push_str(text);
                    out.push_str("-->");
                }
            }
            for child in self.children(current).iter().rev() {
                stack.push((*child, false));
            }
        }
        out
    }

    pub fn to_html(&self) -> String {
        self.outer_html(Dom::DOCUMENT)
    }
}
