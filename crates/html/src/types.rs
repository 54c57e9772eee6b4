/// Index of a node inside a [`crate::Dom`] arena.
///
/// Ids are never reused within one arena: removing a node tombstones its slot, so an id held
/// across a patch either still names the same node or names nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

pub type Attributes = Vec<(String, Option<String>)>;

#[derive(Debug)]
pub enum Token {
    Doctype(String),
    StartTag {
        name: String,
        attributes: Attributes,
        self_closing: bool,
    },
    EndTag(String),
    Comment(String),
    Text(String),
}

/// Payload of a node stored in the arena.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Document { doctype: Option<String> },
    Element { name: String, attributes: Attributes },
    Text { text: String },
    Comment { text: String },
}

impl NodeKind {
    pub fn allows_children(&self) -> bool {
        matches!(self, NodeKind::Document { .. } | NodeKind::Element { .. })
    }

    pub fn element_name(&self) -> Option<&str> {
        match self {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Discriminant comparison: two nodes of the same kind can be updated in place.
    pub fn same_kind(&self, other: &NodeKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// Detached, owned subtree. Carried by `Append`/`Replace` patches and produced by cloning a
/// subtree out of an arena.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Document {
        doctype: Option<String>,
        children: Vec<Node>,
    },
    Element {
        name: String,
        attributes: Attributes,
        children: Vec<Node>,
    },
    Text {
        text: String,
    },
    Comment {
        text: String,
    },
}

impl Node {
    pub fn element(name: &str, attributes: Attributes, children: Vec<Node>) -> Self {
        Node::Element {
            name: name.to_ascii_lowercase(),
            attributes,
            children,
        }
    }

    pub fn text(text: &str) -> Self {
        Node::Text {
            text: text.to_string(),
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Document { children, .. } | Node::Element { children, .. } => children,
            Node::Text { .. } | Node::Comment { .. } => &[],
        }
    }

    pub(crate) fn kind(&self) -> NodeKind {
        match self {
            Node::Document { doctype, .. } => NodeKind::Document {
                doctype: doctype.clone(),
            },
            Node::Element {
                name, attributes, ..
            } => NodeKind::Element {
                name: name.clone(),
                attributes: attributes.clone(),
            },
            Node::Text { text } => NodeKind::Text { text: text.clone() },
            Node::Comment { text } => NodeKind::Comment { text: text.clone() },
        }
    }
}

pub fn get_attr<'a>(attrs: &'a [(String, Option<String>)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.as_deref().unwrap_or(""))
}

pub fn has_attr(attrs: &[(String, Option<String>)], key: &str) -> bool {
    attrs.iter().any(|(k, _)| k.eq_ignore_ascii_case(key))
}
