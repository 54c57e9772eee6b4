use crate::dom::Dom;
use crate::types::{NodeId, NodeKind, Token};

/// Build an arena document from a token stream.
///
/// Tree construction is deliberately simple: start tags open elements (void and self-closing
/// ones do not), end tags pop the open-element stack up to the nearest element with the same
/// name, and unmatched end tags are ignored. No implied `html`/`head`/`body` elements are
/// synthesized; served documents are expected to carry them.
pub fn build_dom(tokens: &[Token]) -> Dom {
    let mut dom = Dom::new();
    let root = dom.document();
    let mut open_elements: Vec<NodeId> = Vec::new();

    for token in tokens {
        let parent = open_elements.last().copied().unwrap_or(root);
        match token {
            Token::Doctype(value) => {
                dom.set_doctype(value.clone());
            }
            Token::Comment(text) => {
                let id = dom.create(NodeKind::Comment { text: text.clone() });
                attach(&mut dom, parent, id);
            }
            Token::Text(text) => {
                // Inter-element whitespace at document level has no node to live in.
                if text.is_empty() || (parent == root && text.trim().is_empty()) {
                    continue;
                }
                let id = dom.create(NodeKind::Text { text: text.clone() });
                attach(&mut dom, parent, id);
            }
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                let id = dom.create_element(name, attributes.clone());
                attach(&mut dom, parent, id);
                if !*self_closing {
                    open_elements.push(id);
                }
            }
            Token::EndTag(name) => {
                if let Some(pos) = open_elements
                    .iter()
                    .rposition(|id| dom.is_element_named(*id, name))
                {
                    open_elements.truncate(pos);
                }
            }
        }
    }

    dom
}

fn attach(dom: &mut Dom, parent: NodeId, child: NodeId) {
    // Parent is always a live document/element and the child is freshly created.
    let attached = dom.append_child(parent, child);
    debug_assert!(attached.is_ok(), "dom builder attach failed: {attached:?}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenize;

    #[test]
    fn builds_nested_elements_and_skips_void_children() {
        let dom = build_dom(&tokenize(
            "<!doctype html><html><head><meta charset=utf-8><title>T</title></head><body><p>a<br>b</p></body></html>",
        ));
        assert_eq!(dom.doctype(), Some("html"));
        let head = dom.head().expect("head");
        let head_children: Vec<_> = dom
            .children(head)
            .iter()
            .filter_map(|c| dom.element_name(*c))
            .collect();
        assert_eq!(head_children, ["meta", "title"]);
        let p = dom.elements_named("p")[0];
        assert_eq!(dom.children(p).len(), 3);
        assert_eq!(dom.text_content(p), "ab");
    }

    #[test]
    fn unmatched_end_tags_are_ignored() {
        let dom = build_dom(&tokenize("<html><body><div></span>x</div></body></html>"));
        let div = dom.elements_named("div")[0];
        assert_eq!(dom.text_content(div), "x");
    }

    #[test]
    fn end_tag_closes_implicitly_open_descendants() {
        let dom = build_dom(&tokenize("<html><body><ul><li>one<li>two</ul><p>after</p></body></html>"));
        let body = dom.body().expect("body");
        let names: Vec<_> = dom
            .children(body)
            .iter()
            .filter_map(|c| dom.element_name(*c))
            .collect();
        assert_eq!(names, ["ul", "p"]);
    }
}
