//! Edit-script computation between a current and a target document.
//!
//! Contract:
//! - Neither input is mutated; the result describes how to turn `current` into `target`.
//! - The root `PatchNode` addresses the document element of `current`.
//! - Children are paired by position, except under `<head>` where they are matched by
//!   [`HeadKey`](crate::head::HeadKey) so reordered `link`/`meta` tags are never recreated.
//! - Runs between a pair of [`RegionMarker`]s present in both documents are preserved as-is.
//!   A start marker without an end marker inhibits the rest of its siblings.
//!
//! Traversal is iterative: a FIFO queue of `(slot, current, target)` work items fills
//! preallocated output slots, so sibling order in the output never depends on visit order.

use crate::dom::Dom;
use crate::dom_patch::{AttributePatch, PatchNode, RegionMarker};
use crate::head::{HeadKey, head_key};
use crate::types::{NodeId, NodeKind};
use std::collections::{HashMap, VecDeque};

pub fn diff_dom(current: &Dom, target: &Dom) -> PatchNode {
    let patch = Differ::new(current, target).run();
    log::trace!(target: "html.diff", "root patch: {}", patch_kind(&patch));
    patch
}

fn patch_kind(patch: &PatchNode) -> &'static str {
    match patch {
        PatchNode::Preserve => "preserve",
        PatchNode::Remove => "remove",
        PatchNode::Append(_) => "append",
        PatchNode::Replace(_) => "replace",
        PatchNode::UpdateText(_) => "update-text",
        PatchNode::UpdateElement { .. } => "update-element",
    }
}

/// Attribute patch for one element pair: attributes missing from `target` are removed, every
/// target attribute whose value differs from `current` is set.
///
/// Absence is the only falsy value. An empty or valueless target attribute is still set, since
/// `hidden` or `disabled` carry meaning by presence and the patched element must equal the target.
pub fn diff_attributes(
    current: &[(String, Option<String>)],
    target: &[(String, Option<String>)],
) -> Vec<AttributePatch> {
    let mut out = Vec::new();
    for (name, value) in target {
        let unchanged = current
            .iter()
            .any(|(n, v)| n.eq_ignore_ascii_case(name) && v == value);
        if !unchanged {
            out.push(AttributePatch::Set {
                name: name.clone(),
                value: value.clone(),
            });
        }
    }
    for (name, _) in current {
        if !target.iter().any(|(n, _)| n.eq_ignore_ascii_case(name)) {
            out.push(AttributePatch::Remove { name: name.clone() });
        }
    }
    out
}

enum SlotOp {
    Pending,
    Leaf(PatchNode),
    Update(Vec<AttributePatch>),
}

struct Slot {
    op: SlotOp,
    children: Vec<usize>,
}

struct Work {
    slot: usize,
    current: Option<NodeId>,
    target: Option<NodeId>,
}

enum HeadMatch {
    Same,
    Update(NodeId),
}

struct Differ<'a> {
    current: &'a Dom,
    target: &'a Dom,
    slots: Vec<Slot>,
    queue: VecDeque<Work>,
}

impl<'a> Differ<'a> {
    fn new(current: &'a Dom, target: &'a Dom) -> Self {
        Self {
            current,
            target,
            slots: Vec::new(),
            queue: VecDeque::new(),
        }
    }

    fn run(mut self) -> PatchNode {
        let root = self.alloc(SlotOp::Pending);
        self.queue.push_back(Work {
            slot: root,
            current: self.current.document_element(),
            target: self.target.document_element(),
        });
        while let Some(work) = self.queue.pop_front() {
            let op = self.visit(&work);
            self.slots[work.slot].op = op;
        }
        self.assemble(root)
    }

    fn alloc(&mut self, op: SlotOp) -> usize {
        self.slots.push(Slot {
            op,
            children: Vec::new(),
        });
        self.slots.len() - 1
    }

    fn push_child(&mut self, parent: usize, op: SlotOp) -> usize {
        let slot = self.alloc(op);
        self.slots[parent].children.push(slot);
        slot
    }

    fn enqueue_child(&mut self, parent: usize, current: Option<NodeId>, target: Option<NodeId>) {
        let slot = self.push_child(parent, SlotOp::Pending);
        self.queue.push_back(Work {
            slot,
            current,
            target,
        });
    }

    fn clone_target(&self, id: NodeId) -> SlotOp {
        match self.target.to_fragment(id) {
            Some(node) => SlotOp::Leaf(PatchNode::Append(node)),
            None => SlotOp::Leaf(PatchNode::Preserve),
        }
    }

    fn visit(&mut self, work: &Work) -> SlotOp {
        match (work.current, work.target) {
            (None, None) => SlotOp::Leaf(PatchNode::Preserve),
            (None, Some(target)) => self.clone_target(target),
            (Some(_), None) => SlotOp::Leaf(PatchNode::Remove),
            (Some(current), Some(target)) => self.compare(work.slot, current, target),
        }
    }

    fn compare(&mut self, slot: usize, current: NodeId, target: NodeId) -> SlotOp {
        let (current_dom, target_dom) = (self.current, self.target);
        let (Some(ck), Some(tk)) = (current_dom.kind(current), target_dom.kind(target)) else {
            return SlotOp::Leaf(PatchNode::Preserve);
        };
        if !ck.same_kind(tk) {
            return self.replace_with(target);
        }
        match (ck, tk) {
            (NodeKind::Text { text: a }, NodeKind::Text { text: b }) => {
                if a.trim() == b.trim() {
                    SlotOp::Leaf(PatchNode::Preserve)
                } else {
                    SlotOp::Leaf(PatchNode::UpdateText(b.clone()))
                }
            }
            (NodeKind::Comment { text: a }, NodeKind::Comment { text: b }) => {
                if a == b {
                    SlotOp::Leaf(PatchNode::Preserve)
                } else {
                    self.replace_with(target)
                }
            }
            (
                NodeKind::Element {
                    name: a,
                    attributes: attrs_a,
                },
                NodeKind::Element {
                    name: b,
                    attributes: attrs_b,
                },
            ) => {
                if a != b {
                    return self.replace_with(target);
                }
                let attributes = diff_attributes(attrs_a, attrs_b);
                let is_head = a == "head";
                let no_children = current_dom.children(current).is_empty()
                    && target_dom.children(target).is_empty();
                if !no_children {
                    if is_head {
                        self.keyed_children(slot, current, target);
                    } else {
                        self.positional_children(slot, current, target);
                    }
                }
                SlotOp::Update(attributes)
            }
            _ => {
                self.positional_children(slot, current, target);
                SlotOp::Update(Vec::new())
            }
        }
    }

    fn replace_with(&self, target: NodeId) -> SlotOp {
        match self.target.to_fragment(target) {
            Some(node) => SlotOp::Leaf(PatchNode::Replace(node)),
            None => SlotOp::Leaf(PatchNode::Remove),
        }
    }

    fn marker(dom: &Dom, id: NodeId) -> Option<RegionMarker> {
        match dom.kind(id) {
            Some(NodeKind::Comment { text }) => RegionMarker::parse(text),
            _ => None,
        }
    }

    fn positional_children(&mut self, slot: usize, current: NodeId, target: NodeId) {
        let (current_dom, target_dom) = (self.current, self.target);
        let current_children = current_dom.children(current);
        let target_children = target_dom.children(target);
        let (mut i, mut j) = (0, 0);
        loop {
            let cur = current_children.get(i).copied();
            let tgt = target_children.get(j).copied();
            if cur.is_none() && tgt.is_none() {
                break;
            }
            let region_start = match (cur, tgt) {
                (Some(c), Some(t)) => {
                    Self::marker(current_dom, c) == Some(RegionMarker::Start)
                        && Self::marker(target_dom, t) == Some(RegionMarker::Start)
                }
                _ => false,
            };
            if region_start {
                // The start marker itself and everything up to (and including) the end
                // marker on each side passes through untouched.
                self.push_child(slot, SlotOp::Leaf(PatchNode::Preserve));
                i += 1;
                j += 1;
                while let Some(&c) = current_children.get(i) {
                    self.push_child(slot, SlotOp::Leaf(PatchNode::Preserve));
                    i += 1;
                    if Self::marker(current_dom, c) == Some(RegionMarker::End) {
                        break;
                    }
                }
                while let Some(&t) = target_children.get(j) {
                    j += 1;
                    if Self::marker(target_dom, t) == Some(RegionMarker::End) {
                        break;
                    }
                }
                continue;
            }
            self.enqueue_child(slot, cur, tgt);
            i += 1;
            j += 1;
        }
    }

    fn keyed_children(&mut self, slot: usize, current: NodeId, target: NodeId) {
        let (current_dom, target_dom) = (self.current, self.target);
        let current_children = current_dom.children(current);
        let target_children = target_dom.children(target);

        let mut candidates: HashMap<HeadKey, VecDeque<usize>> = HashMap::new();
        for (pos, child) in current_children.iter().enumerate() {
            candidates
                .entry(head_key(current_dom, *child))
                .or_default()
                .push_back(pos);
        }

        let mut plan: Vec<Option<HeadMatch>> = current_children.iter().map(|_| None).collect();
        let mut inserts = Vec::new();
        for &t in target_children {
            let hit = candidates
                .get_mut(&head_key(target_dom, t))
                .and_then(VecDeque::pop_front);
            match hit {
                Some(pos) => {
                    let same =
                        current_dom.outer_html(current_children[pos]) == target_dom.outer_html(t);
                    plan[pos] = Some(if same {
                        HeadMatch::Same
                    } else {
                        HeadMatch::Update(t)
                    });
                }
                None => inserts.push(t),
            }
        }

        for (pos, entry) in plan.into_iter().enumerate() {
            match entry {
                None => {
                    self.push_child(slot, SlotOp::Leaf(PatchNode::Remove));
                }
                Some(HeadMatch::Same) => {
                    self.push_child(slot, SlotOp::Leaf(PatchNode::Preserve));
                }
                Some(HeadMatch::Update(t)) => {
                    self.enqueue_child(slot, Some(current_children[pos]), Some(t));
                }
            }
        }
        for t in inserts {
            let op = self.clone_target(t);
            self.push_child(slot, op);
        }
    }

    fn assemble(mut self, root: usize) -> PatchNode {
        // Iterative post-order: a slot is built once all of its children are on `built`,
        // where they occupy the last `children.len()` entries in order.
        let mut built: Vec<PatchNode> = Vec::new();
        let mut stack: Vec<(usize, bool)> = vec![(root, false)];
        while let Some((slot, visited)) = stack.pop() {
            if !visited {
                stack.push((slot, true));
                for child in self.slots[slot].children.iter().rev() {
                    stack.push((*child, false));
                }
                continue;
            }
            let child_count = self.slots[slot].children.len();
            let node = match std::mem::replace(&mut self.slots[slot].op, SlotOp::Pending) {
                SlotOp::Leaf(patch) => patch,
                SlotOp::Update(attributes) => PatchNode::UpdateElement {
                    children: built.split_off(built.len() - child_count),
                    attributes,
                },
                SlotOp::Pending => {
                    debug_assert!(false, "diff slot left unresolved");
                    PatchNode::Preserve
                }
            };
            built.push(node);
        }
        built.pop().unwrap_or(PatchNode::Preserve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Node;

    fn diff(a: &str, b: &str) -> PatchNode {
        diff_dom(&Dom::parse(a), &Dom::parse(b))
    }

    fn children(patch: &PatchNode) -> &[PatchNode] {
        match patch {
            PatchNode::UpdateElement { children, .. } => children,
            other => panic!("expected UpdateElement, got {other:?}"),
        }
    }

    fn attributes(patch: &PatchNode) -> &[AttributePatch] {
        match patch {
            PatchNode::UpdateElement { attributes, .. } => attributes,
            other => panic!("expected UpdateElement, got {other:?}"),
        }
    }

    #[test]
    fn identical_documents_yield_noop() {
        let doc = "<html><head><title>x</title><link rel=icon href=/i.png></head><body><main id=m><p>hello <b>world</b></p><!-- c --></main></body></html>";
        let patch = diff(doc, doc);
        assert!(patch.is_noop(), "expected all-preserve patch, got {patch:?}");
    }

    #[test]
    fn text_differing_only_in_outer_whitespace_is_preserved() {
        let patch = diff(
            "<html><body><p>foo</p></body></html>",
            "<html><body><p>  foo  </p></body></html>",
        );
        assert!(patch.is_noop(), "got {patch:?}");
    }

    #[test]
    fn changed_text_is_updated_in_place() {
        let patch = diff(
            "<html><body><p>foo</p></body></html>",
            "<html><body><p>bar</p></body></html>",
        );
        let body = &children(&patch)[0];
        let p = &children(body)[0];
        assert_eq!(children(p), &[PatchNode::UpdateText("bar".into())]);
    }

    #[test]
    fn tag_change_replaces_and_extra_children_append_or_remove() {
        let patch = diff(
            "<html><body><p>a</p><div>b</div><span>c</span></body></html>",
            "<html><body><p>a</p><section>b</section></body></html>",
        );
        let body = &children(&patch)[0];
        let body_children = children(body);
        assert_eq!(body_children.len(), 3);
        assert!(matches!(body_children[0], PatchNode::UpdateElement { .. }));
        assert!(matches!(&body_children[1], PatchNode::Replace(Node::Element { name, .. }) if name == "section"));
        assert_eq!(body_children[2], PatchNode::Remove);

        let grow = diff(
            "<html><body><p>a</p></body></html>",
            "<html><body><p>a</p><p>b</p></body></html>",
        );
        let body = &children(&grow)[0];
        assert!(matches!(&children(body)[1], PatchNode::Append(Node::Element { name, .. }) if name == "p"));
    }

    #[test]
    fn attribute_patch_is_set_difference() {
        let patch = diff(
            "<html><body class=a data-keep=1 data-drop=x></body></html>",
            "<html><body class=b data-keep=1 hidden></body></html>",
        );
        let body = &children(&patch)[0];
        assert_eq!(
            attributes(body),
            &[
                AttributePatch::Set {
                    name: "class".into(),
                    value: Some("b".into())
                },
                AttributePatch::Set {
                    name: "hidden".into(),
                    value: None
                },
                AttributePatch::Remove {
                    name: "data-drop".into()
                },
            ]
        );
    }

    #[test]
    fn empty_and_valueless_attributes_are_set_not_removed() {
        let current = vec![
            ("disabled".to_string(), Some("disabled".to_string())),
            ("title".to_string(), Some("x".to_string())),
            ("lang".to_string(), Some("en".to_string())),
        ];
        let target = vec![
            ("disabled".to_string(), None),
            ("title".to_string(), Some(String::new())),
        ];
        assert_eq!(
            diff_attributes(&current, &target),
            [
                AttributePatch::Set {
                    name: "disabled".into(),
                    value: None
                },
                AttributePatch::Set {
                    name: "title".into(),
                    value: Some(String::new())
                },
                AttributePatch::Remove {
                    name: "lang".into()
                },
            ]
        );
        assert!(diff_attributes(&target, &target).is_empty());
    }

    #[test]
    fn childless_elements_diff_attributes_only() {
        let patch = diff(
            "<html><body><div id=a></div></body></html>",
            "<html><body><div id=b></div></body></html>",
        );
        let div = &children(&children(&patch)[0])[0];
        assert!(children(div).is_empty());
        assert_eq!(attributes(div).len(), 1);
    }

    #[test]
    fn changed_comment_is_replaced() {
        let patch = diff(
            "<html><body><!-- a --></body></html>",
            "<html><body><!-- b --></body></html>",
        );
        let body = &children(&patch)[0];
        assert_eq!(
            children(body),
            &[PatchNode::Replace(Node::Comment { text: " b ".into() })]
        );
    }

    #[test]
    fn no_diff_region_is_preserved_verbatim() {
        let patch = diff(
            "<html><body><h1>a</h1><!-- start-no-diff --><div id=widget>injected</div><iframe></iframe><!-- end-no-diff --><p>x</p></body></html>",
            "<html><body><h1>b</h1><!-- start-no-diff --><span>server</span><!-- end-no-diff --><p>y</p></body></html>",
        );
        let body = &children(&patch)[0];
        let entries = children(body);
        assert_eq!(entries.len(), 6);
        assert!(!entries[0].is_noop());
        for entry in &entries[1..5] {
            assert_eq!(entry, &PatchNode::Preserve);
        }
        // The paragraph after the region is realigned with its counterpart.
        assert_eq!(
            entries[5],
            PatchNode::UpdateElement {
                children: vec![PatchNode::UpdateText("y".into())],
                attributes: Vec::new(),
            }
        );
    }

    #[test]
    fn unmatched_start_marker_inhibits_remaining_siblings() {
        let patch = diff(
            "<html><body><!-- start-no-diff --><p>a</p><p>b</p></body></html>",
            "<html><body><!-- start-no-diff --><p>x</p></body></html>",
        );
        let body = &children(&patch)[0];
        assert_eq!(children(body), vec![PatchNode::Preserve; 3].as_slice());
    }

    #[test]
    fn marker_in_one_document_only_is_diffed_normally() {
        let patch = diff(
            "<html><body><!-- start-no-diff --><p>a</p></body></html>",
            "<html><body><!-- other --><p>b</p></body></html>",
        );
        let body = &children(&patch)[0];
        assert!(matches!(children(body)[0], PatchNode::Replace(_)));
        assert!(!children(body)[1].is_noop());
    }

    #[test]
    fn head_reorder_keeps_links_and_meta() {
        let patch = diff(
            "<html><head><link rel=stylesheet href=/a.css><meta name=description content=x><link rel=stylesheet href=/b.css></head><body></body></html>",
            "<html><head><link rel=stylesheet href=/b.css><meta name=description content=y><link rel=stylesheet href=/a.css></head><body></body></html>",
        );
        let head = &children(&patch)[0];
        let entries = children(head);
        assert_eq!(entries.len(), 3, "no inserts expected: {entries:?}");
        assert_eq!(entries[0], PatchNode::Preserve);
        assert_eq!(
            entries[1],
            PatchNode::UpdateElement {
                children: Vec::new(),
                attributes: vec![AttributePatch::Set {
                    name: "content".into(),
                    value: Some("y".into())
                }],
            }
        );
        assert_eq!(entries[2], PatchNode::Preserve);
    }

    #[test]
    fn head_removes_stale_and_appends_new_in_target_order() {
        let patch = diff(
            "<html><head><title>A</title><link rel=stylesheet href=/old.css></head><body></body></html>",
            "<html><head><link rel=preload href=/x.js><title>B</title><link rel=stylesheet href=/new.css></head><body></body></html>",
        );
        let head = &children(&patch)[0];
        let entries = children(head);
        assert_eq!(entries.len(), 4);
        assert_eq!(
            entries[0],
            PatchNode::UpdateElement {
                children: vec![PatchNode::UpdateText("B".into())],
                attributes: Vec::new(),
            }
        );
        assert_eq!(entries[1], PatchNode::Remove);
        let appended: Vec<_> = entries[2..]
            .iter()
            .map(|p| match p {
                PatchNode::Append(Node::Element { attributes, .. }) => {
                    crate::types::get_attr(attributes, "href").unwrap_or_default().to_string()
                }
                other => panic!("expected append, got {other:?}"),
            })
            .collect();
        assert_eq!(appended, ["/x.js", "/new.css"]);
    }

    #[test]
    fn missing_document_element_appends_or_removes() {
        let empty = Dom::new();
        let full = Dom::parse("<html><body></body></html>");
        assert!(matches!(diff_dom(&empty, &full), PatchNode::Append(_)));
        assert_eq!(diff_dom(&full, &empty), PatchNode::Remove);
        assert_eq!(diff_dom(&empty, &empty), PatchNode::Preserve);
    }
}
