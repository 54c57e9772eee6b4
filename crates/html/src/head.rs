//! Identity of `<head>` children for keyed reconciliation.
//!
//! Head children are an unordered bag as far as the page is concerned: moving a `<link>` or
//! `<meta>` around does not change meaning, while destroying and recreating one re-fetches
//! the linked resource. Each child is therefore matched by a derived key instead of its index.

use crate::dom::Dom;
use crate::types::{NodeId, NodeKind};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum HeadKey {
    /// `base` and `title`: at most one per document, keyed by tag name.
    Singleton(&'static str),
    /// `meta` keyed by its first identifying attribute (`name`, `property`, `http-equiv`).
    Meta { attribute: &'static str, value: String },
    /// `link` keyed by relation and target.
    Link { rel: String, href: String },
    /// Anything else, keyed by its full serialized markup.
    Content(String),
}

const META_IDENTITY_ATTRIBUTES: [&str; 3] = ["name", "property", "http-equiv"];

pub fn head_key(dom: &Dom, id: NodeId) -> HeadKey {
    let Some(NodeKind::Element { name, .. }) = dom.kind(id) else {
        return HeadKey::Content(dom.outer_html(id));
    };
    match name.as_str() {
        "base" => HeadKey::Singleton("base"),
        "title" => HeadKey::Singleton("title"),
        "meta" => META_IDENTITY_ATTRIBUTES
            .iter()
            .find_map(|attr| {
                dom.attribute(id, attr).map(|value| HeadKey::Meta {
                    attribute: attr,
                    value: value.to_string(),
                })
            })
            .unwrap_or_else(|| HeadKey::Content(dom.outer_html(id))),
        "link" => {
            let rel = dom.attribute(id, "rel");
            let href = dom.attribute(id, "href");
            if rel.is_none() && href.is_none() {
                return HeadKey::Content(dom.outer_html(id));
            }
            HeadKey::Link {
                rel: rel.unwrap_or_default().to_ascii_lowercase(),
                href: href.unwrap_or_default().to_string(),
            }
        }
        _ => HeadKey::Content(dom.outer_html(id)),
    }
}
