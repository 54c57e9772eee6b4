//! Arena-backed document tree.
//!
//! Invariants:
//! - Slot 0 is always the document node and is never removed.
//! - A live node has at most one parent, and appears exactly once in that parent's children.
//! - Removed subtrees are tombstoned; their ids are never handed out again.
//! - Element and attribute names are ASCII-lowercase.

use crate::types::{Attributes, Node, NodeId, NodeKind, get_attr};

#[derive(Debug)]
pub enum DomError {
    MissingNode(NodeId),
    WrongNodeKind(NodeId),
    InvalidParent(NodeId),
    InvalidSibling { parent: NodeId, before: NodeId },
    CycleDetected { parent: NodeId, child: NodeId },
}

impl std::fmt::Display for DomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomError::MissingNode(id) => write!(f, "node {} is not live", id.0),
            DomError::WrongNodeKind(id) => write!(f, "node {} has the wrong kind", id.0),
            DomError::InvalidParent(id) => write!(f, "node {} cannot take this parent", id.0),
            DomError::InvalidSibling { parent, before } => write!(
                f,
                "node {} is not a child of node {}",
                before.0, parent.0
            ),
            DomError::CycleDetected { parent, child } => write!(
                f,
                "attaching node {} under node {} would create a cycle",
                child.0, parent.0
            ),
        }
    }
}

impl std::error::Error for DomError {}

#[derive(Clone, Debug)]
struct NodeRecord {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    live: bool,
}

#[derive(Clone, Debug)]
pub struct Dom {
    nodes: Vec<NodeRecord>,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    pub const DOCUMENT: NodeId = NodeId(0);

    pub fn new() -> Self {
        Self {
            nodes: vec![NodeRecord {
                kind: NodeKind::Document { doctype: None },
                parent: None,
                children: Vec::new(),
                live: true,
            }],
        }
    }

    pub fn parse(input: &str) -> Self {
        crate::dom_builder::build_dom(&crate::tokenize(input))
    }

    pub fn document(&self) -> NodeId {
        Self::DOCUMENT
    }

    pub fn is_live(&self, id: NodeId) -> bool {
        self.nodes.get(id.index()).is_some_and(|n| n.live)
    }

    fn record(&self, id: NodeId) -> Result<&NodeRecord, DomError> {
        self.nodes
            .get(id.index())
            .filter(|n| n.live)
            .ok_or(DomError::MissingNode(id))
    }

    fn record_mut(&mut self, id: NodeId) -> Result<&mut NodeRecord, DomError> {
        self.nodes
            .get_mut(id.index())
            .filter(|n| n.live)
            .ok_or(DomError::MissingNode(id))
    }

    /// Payload of a live node. Dead or unknown ids yield `None`.
    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.record(id).ok().map(|n| &n.kind)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.record(id).map_or(&[], |n| n.children.as_slice())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.record(id).ok().and_then(|n| n.parent)
    }

    pub fn element_name(&self, id: NodeId) -> Option<&str> {
        self.kind(id).and_then(NodeKind::element_name)
    }

    pub fn is_element_named(&self, id: NodeId, name: &str) -> bool {
        self.element_name(id)
            .is_some_and(|n| n.eq_ignore_ascii_case(name))
    }

    pub fn attributes(&self, id: NodeId) -> &[(String, Option<String>)] {
        match self.kind(id) {
            Some(NodeKind::Element { attributes, .. }) => attributes,
            _ => &[],
        }
    }

    /// Attribute value as `getAttribute` would report it: valueless attributes read as `""`.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        get_attr(self.attributes(id), name)
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            Some(NodeKind::Text { text }) | Some(NodeKind::Comment { text }) => Some(text),
            _ => None,
        }
    }

    pub fn doctype(&self) -> Option<&str> {
        match self.kind(Self::DOCUMENT) {
            Some(NodeKind::Document { doctype }) => doctype.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn set_doctype(&mut self, value: String) {
        if let NodeKind::Document { doctype } = &mut self.nodes[0].kind {
            *doctype = Some(value);
        }
    }

    /// The first element child of the document (`<html>` for well-formed input).
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(Self::DOCUMENT)
            .iter()
            .copied()
            .find(|c| self.element_name(*c).is_some())
    }

    fn child_element(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|c| self.is_element_named(*c, name))
    }

    pub fn head(&self) -> Option<NodeId> {
        self.document_element()
            .and_then(|html| self.child_element(html, "head"))
    }

    pub fn body(&self) -> Option<NodeId> {
        self.document_element()
            .and_then(|html| self.child_element(html, "body"))
    }

    /// Live nodes below `root` (inclusive) in document order.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !self.is_live(id) {
                continue;
            }
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    pub fn elements_named(&self, name: &str) -> Vec<NodeId> {
        self.descendants(Self::DOCUMENT)
            .into_iter()
            .filter(|id| self.is_element_named(*id, name))
            .collect()
    }

    pub fn element_by_id(&self, value: &str) -> Option<NodeId> {
        self.descendants(Self::DOCUMENT)
            .into_iter()
            .find(|id| self.attribute(*id, "id") == Some(value))
    }

    /// `content` of `<meta name="...">` in the head.
    pub fn meta_content(&self, name: &str) -> Option<&str> {
        let head = self.head()?;
        self.children(head)
            .iter()
            .copied()
            .filter(|c| self.is_element_named(*c, "meta"))
            .find(|c| {
                self.attribute(*c, "name")
                    .is_some_and(|n| n.eq_ignore_ascii_case(name))
            })
            .and_then(|c| self.attribute(c, "content"))
    }

    pub fn closest(&self, from: NodeId, name: &str) -> Option<NodeId> {
        let mut cursor = Some(from);
        while let Some(id) = cursor {
            if self.is_element_named(id, name) {
                return Some(id);
            }
            cursor = self.parent(id);
        }
        None
    }

    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in self.descendants(id) {
            if let Some(NodeKind::Text { text }) = self.kind(node) {
                out.push_str(text);
            }
        }
        out
    }

    // --- mutation ---

    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeRecord {
            kind,
            parent: None,
            children: Vec::new(),
            live: true,
        });
        id
    }

    pub fn create_element(&mut self, name: &str, attributes: Attributes) -> NodeId {
        self.create(NodeKind::Element {
            name: name.to_ascii_lowercase(),
            attributes,
        })
    }

    /// Materialize a detached subtree into the arena. The returned root has no parent.
    pub fn create_fragment(&mut self, fragment: &Node) -> NodeId {
        let root = self.create(fragment.kind());
        let mut stack: Vec<(NodeId, &Node)> = vec![(root, fragment)];
        while let Some((id, node)) = stack.pop() {
            for child in node.children() {
                let child_id = self.create(child.kind());
                self.nodes[child_id.index()].parent = Some(id);
                self.nodes[id.index()].children.push(child_id);
                stack.push((child_id, child));
            }
        }
        root
    }

    /// Clone a live subtree out of the arena.
    pub fn to_fragment(&self, id: NodeId) -> Option<Node> {
        self.record(id).ok()?;
        // Iterative post-order: children are built before the node that owns them.
        let mut built: Vec<Node> = Vec::new();
        let mut stack: Vec<(NodeId, bool)> = vec![(id, false)];
        while let Some((current, visited)) = stack.pop() {
            let rec = &self.nodes[current.index()];
            if !visited {
                stack.push((current, true));
                for child in rec.children.iter().rev() {
                    stack.push((*child, false));
                }
                continue;
            }
            let children = built.split_off(built.len() - rec.children.len());
            let node = match &rec.kind {
                NodeKind::Document { doctype } => Node::Document {
                    doctype: doctype.clone(),
                    children,
                },
                NodeKind::Element { name, attributes } => Node::Element {
                    name: name.clone(),
                    attributes: attributes.clone(),
                    children,
                },
                NodeKind::Text { text } => Node::Text { text: text.clone() },
                NodeKind::Comment { text } => Node::Comment { text: text.clone() },
            };
            built.push(node);
        }
        debug_assert_eq!(built.len(), 1, "post-order build leaves exactly the root");
        built.pop()
    }

    fn check_attach(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if parent == child || self.is_ancestor(child, parent) {
            return Err(DomError::CycleDetected { parent, child });
        }
        if !self.record(parent)?.kind.allows_children() {
            return Err(DomError::InvalidParent(parent));
        }
        if self.record(child)?.parent.is_some() || child == Self::DOCUMENT {
            return Err(DomError::InvalidParent(child));
        }
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_attach(parent, child)?;
        self.record_mut(parent)?.children.push(child);
        self.record_mut(child)?.parent = Some(parent);
        Ok(())
    }

    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        before: NodeId,
    ) -> Result<(), DomError> {
        self.check_attach(parent, child)?;
        let siblings = &mut self.record_mut(parent)?.children;
        let pos = siblings
            .iter()
            .position(|k| *k == before)
            .ok_or(DomError::InvalidSibling { parent, before })?;
        siblings.insert(pos, child);
        self.record_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Detach `id` from its parent and tombstone the whole subtree.
    pub fn remove(&mut self, id: NodeId) -> Result<(), DomError> {
        if id == Self::DOCUMENT {
            return Err(DomError::InvalidParent(id));
        }
        if let Some(parent) = self.record_mut(id)?.parent.take() {
            self.record_mut(parent)?.children.retain(|k| *k != id);
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let rec = &mut self.nodes[current.index()];
            rec.live = false;
            rec.parent = None;
            // The slot stays so the id is never reused; its payload is released.
            rec.kind = NodeKind::Comment {
                text: String::new(),
            };
            stack.extend(std::mem::take(&mut rec.children));
        }
        Ok(())
    }

    /// Swap `old` for a freshly built copy of `fragment`, keeping its position.
    pub fn replace_with_fragment(&mut self, old: NodeId, fragment: &Node) -> Result<NodeId, DomError> {
        let parent = self.parent(old).ok_or(DomError::InvalidParent(old))?;
        let new = self.create_fragment(fragment);
        self.insert_before(parent, new, old)?;
        self.remove(old)?;
        Ok(new)
    }

    pub fn set_text(&mut self, id: NodeId, value: &str) -> Result<(), DomError> {
        match &mut self.record_mut(id)?.kind {
            NodeKind::Text { text } | NodeKind::Comment { text } => {
                text.clear();
                text.push_str(value);
                Ok(())
            }
            _ => Err(DomError::WrongNodeKind(id)),
        }
    }

    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: &str,
        value: Option<String>,
    ) -> Result<(), DomError> {
        let NodeKind::Element { attributes, .. } = &mut self.record_mut(id)?.kind else {
            return Err(DomError::WrongNodeKind(id));
        };
        match attributes.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some((_, existing)) => *existing = value,
            None => attributes.push((name.to_ascii_lowercase(), value)),
        }
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<(), DomError> {
        let NodeKind::Element { attributes, .. } = &mut self.record_mut(id)?.kind else {
            return Err(DomError::WrongNodeKind(id));
        };
        attributes.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        Ok(())
    }

    fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = self.parent(node);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = self.parent(id);
        }
        false
    }
}
