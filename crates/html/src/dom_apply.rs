//! Applies a [`PatchNode`] tree to a live [`Dom`].
//!
//! The walk pairs every patch entry with the live node it was computed against by position in
//! a snapshot of the parent's children taken before any child is touched, so removals and
//! replacements earlier in a sibling list never shift later entries onto the wrong node.

use crate::dom::{Dom, DomError};
use crate::dom_patch::{AttributePatch, PatchNode, PatchStats};
use crate::types::{NodeId, NodeKind};

#[derive(Debug)]
pub enum DomPatchError {
    Dom(DomError),
    /// The patch does not mirror the live children of `parent` at `index`.
    ShapeMismatch { parent: NodeId, index: usize },
    /// An `Append` entry appears before an entry addressing an existing child.
    MisplacedAppend { parent: NodeId, index: usize },
}

impl std::fmt::Display for DomPatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomPatchError::Dom(err) => write!(f, "dom mutation failed: {err}"),
            DomPatchError::ShapeMismatch { parent, index } => write!(
                f,
                "patch entry {index} does not match the children of node {}",
                parent.0
            ),
            DomPatchError::MisplacedAppend { parent, index } => write!(
                f,
                "append at entry {index} of node {} precedes existing children",
                parent.0
            ),
        }
    }
}

impl std::error::Error for DomPatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DomPatchError::Dom(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DomError> for DomPatchError {
    fn from(err: DomError) -> Self {
        DomPatchError::Dom(err)
    }
}

/// Verify that `patch` fits `dom` without touching it.
///
/// Walks the same pairing as [`apply_patch`] and checks node kinds as well as shape, so a patch
/// that passes here applies without error.
pub fn check_patch(dom: &Dom, patch: &PatchNode) -> Result<(), DomPatchError> {
    let root = dom.document();
    let Some(element) = dom.document_element() else {
        return match patch {
            PatchNode::Preserve | PatchNode::Append(_) => Ok(()),
            _ => Err(DomPatchError::ShapeMismatch {
                parent: root,
                index: 0,
            }),
        };
    };
    if matches!(patch, PatchNode::Append(_)) {
        return Err(DomPatchError::ShapeMismatch {
            parent: root,
            index: 0,
        });
    }

    let mut stack: Vec<(NodeId, &PatchNode)> = vec![(element, patch)];
    while let Some((id, patch)) = stack.pop() {
        let kind = dom.kind(id).ok_or(DomError::MissingNode(id))?;
        match patch {
            PatchNode::Preserve | PatchNode::Remove | PatchNode::Replace(_) => {}
            PatchNode::UpdateText(_) => {
                if !matches!(kind, NodeKind::Text { .. } | NodeKind::Comment { .. }) {
                    return Err(DomError::WrongNodeKind(id).into());
                }
            }
            PatchNode::Append(_) => {
                let parent = dom.parent(id).unwrap_or(root);
                return Err(DomPatchError::MisplacedAppend { parent, index: 0 });
            }
            PatchNode::UpdateElement {
                children,
                attributes,
            } => {
                if !attributes.is_empty() && !matches!(kind, NodeKind::Element { .. }) {
                    return Err(DomError::WrongNodeKind(id).into());
                }
                let existing = dom.children(id);
                for (index, child) in children.iter().enumerate() {
                    match (existing.get(index), child) {
                        (Some(_), PatchNode::Append(_)) => {
                            return Err(DomPatchError::MisplacedAppend { parent: id, index });
                        }
                        (Some(node), child) => stack.push((*node, child)),
                        (None, PatchNode::Append(_)) if kind.allows_children() => {}
                        (None, _) => {
                            return Err(DomPatchError::ShapeMismatch { parent: id, index });
                        }
                    }
                }
                if children.len() < existing.len() {
                    return Err(DomPatchError::ShapeMismatch {
                        parent: id,
                        index: children.len(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Mutate `dom` in place so it matches the target the patch was diffed against.
///
/// The root patch addresses the document element. On error the document may be partially
/// patched; callers that need all-or-nothing semantics run [`check_patch`] first.
pub fn apply_patch(dom: &mut Dom, patch: &PatchNode) -> Result<PatchStats, DomPatchError> {
    let mut stats = PatchStats::default();
    let root = dom.document();

    let Some(element) = dom.document_element() else {
        return match patch {
            PatchNode::Preserve => Ok(stats),
            PatchNode::Append(node) => {
                let id = dom.create_fragment(node);
                dom.append_child(root, id)?;
                stats.appended += 1;
                Ok(stats)
            }
            _ => Err(DomPatchError::ShapeMismatch {
                parent: root,
                index: 0,
            }),
        };
    };
    if matches!(patch, PatchNode::Append(_)) {
        return Err(DomPatchError::ShapeMismatch {
            parent: root,
            index: 0,
        });
    }

    let mut stack: Vec<(NodeId, &PatchNode)> = vec![(element, patch)];
    while let Some((id, patch)) = stack.pop() {
        match patch {
            PatchNode::Preserve => {}
            PatchNode::Remove => {
                dom.remove(id)?;
                stats.removed += 1;
            }
            PatchNode::Replace(node) => {
                dom.replace_with_fragment(id, node)?;
                stats.replaced += 1;
            }
            PatchNode::UpdateText(text) => {
                dom.set_text(id, text)?;
                stats.text_updates += 1;
            }
            PatchNode::Append(_) => {
                // Appends are consumed by their parent's `UpdateElement`.
                let parent = dom.parent(id).unwrap_or(root);
                return Err(DomPatchError::MisplacedAppend { parent, index: 0 });
            }
            PatchNode::UpdateElement {
                children,
                attributes,
            } => {
                for attribute in attributes {
                    match attribute {
                        AttributePatch::Set { name, value } => {
                            dom.set_attribute(id, name, value.clone())?
                        }
                        AttributePatch::Remove { name } => dom.remove_attribute(id, name)?,
                    }
                    stats.attribute_updates += 1;
                }

                let existing = dom.children(id).to_vec();
                for (index, child) in children.iter().enumerate() {
                    match (existing.get(index), child) {
                        (Some(_), PatchNode::Append(_)) => {
                            return Err(DomPatchError::MisplacedAppend { parent: id, index });
                        }
                        (Some(node), child) => stack.push((*node, child)),
                        (None, PatchNode::Append(node)) => {
                            let fresh = dom.create_fragment(node);
                            dom.append_child(id, fresh)?;
                            stats.appended += 1;
                        }
                        (None, _) => {
                            return Err(DomPatchError::ShapeMismatch { parent: id, index });
                        }
                    }
                }
                if children.len() < existing.len() {
                    return Err(DomPatchError::ShapeMismatch {
                        parent: id,
                        index: children.len(),
                    });
                }
            }
        }
    }

    log::trace!(target: "html.patch", "applied patch: {stats:?}");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff_dom;
    use crate::types::Node;

    fn patched(current: &str, target: &str) -> (Dom, Dom, PatchStats) {
        let mut live = Dom::parse(current);
        let target = Dom::parse(target);
        let patch = diff_dom(&live, &target);
        let stats = apply_patch(&mut live, &patch).expect("apply");
        (live, target, stats)
    }

    #[test]
    fn preserved_and_updated_nodes_keep_identity() {
        let mut live = Dom::parse(
            "<html><head><title>A</title></head><body><div id=island>x</div><p class=a>old</p></body></html>",
        );
        let island = live.element_by_id("island").expect("island");
        let p = live.elements_named("p")[0];
        let text = live.children(p)[0];

        let target = Dom::parse(
            "<html><head><title>B</title></head><body><div id=island>x</div><p class=b>new</p><footer>f</footer></body></html>",
        );
        let patch = diff_dom(&live, &target);
        let stats = apply_patch(&mut live, &patch).expect("apply");

        assert!(live.is_live(island));
        assert_eq!(live.elements_named("p"), vec![p]);
        assert_eq!(live.children(p), &[text]);
        assert_eq!(live.text(text), Some("new"));
        assert_eq!(live.attribute(p, "class"), Some("b"));
        assert_eq!(stats.appended, 1);
        assert_eq!(stats.attribute_updates, 1);
        assert_eq!(stats.text_updates, 2);
        assert_eq!(live.to_html(), target.to_html());
    }

    #[test]
    fn removals_do_not_shift_later_siblings() {
        let (live, target, stats) = patched(
            "<html><body><p>1</p><p>2</p><span>3</span></body></html>",
            "<html><body><p>1</p><em>2</em></body></html>",
        );
        assert_eq!(stats.replaced, 1);
        assert_eq!(stats.removed, 1);
        assert_eq!(live.to_html(), target.to_html());
    }

    #[test]
    fn identical_documents_apply_nothing() {
        let input = "<!DOCTYPE html><html><head><meta name=a content=b></head><body><p>x</p></body></html>";
        let (live, _, stats) = patched(input, input);
        assert_eq!(stats.total(), 0);
        assert_eq!(live.to_html(), Dom::parse(input).to_html());
    }

    #[test]
    fn document_element_can_be_created_and_dropped() {
        let (live, target, stats) = patched("", "<html><body>x</body></html>");
        assert_eq!(stats.appended, 1);
        assert_eq!(live.to_html(), target.to_html());

        let (live, _, stats) = patched("<html><body>x</body></html>", "");
        assert_eq!(stats.removed, 1);
        assert_eq!(live.document_element(), None);
    }

    #[test]
    fn region_contents_survive_patching() {
        let (live, _, _) = patched(
            "<html><body><!-- start-no-diff --><div id=w>live</div><!-- end-no-diff --><p>a</p></body></html>",
            "<html><body><!-- start-no-diff --><div id=w>server</div><!-- end-no-diff --><p>b</p></body></html>",
        );
        let w = live.element_by_id("w").expect("w");
        assert_eq!(live.text_content(w), "live");
        assert_eq!(live.text_content(live.elements_named("p")[0]), "b");
    }

    #[test]
    fn shape_mismatch_is_reported() {
        let mut live = Dom::parse("<html><body><p>a</p><p>b</p></body></html>");
        let short = PatchNode::UpdateElement {
            children: vec![PatchNode::UpdateElement {
                children: vec![PatchNode::Preserve],
                attributes: Vec::new(),
            }],
            attributes: Vec::new(),
        };
        assert!(matches!(
            apply_patch(&mut live, &short),
            Err(DomPatchError::ShapeMismatch { index: 1, .. })
        ));

        let mut live = Dom::parse("<html><body></body></html>");
        let early_append = PatchNode::UpdateElement {
            children: vec![PatchNode::Append(Node::text("x")), PatchNode::Preserve],
            attributes: Vec::new(),
        };
        assert!(matches!(
            apply_patch(&mut live, &early_append),
            Err(DomPatchError::MisplacedAppend { index: 0, .. })
        ));
    }

    #[test]
    fn check_rejects_what_apply_would_reject_without_mutating() {
        let live = Dom::parse("<html><body><p>a</p><p>b</p></body></html>");
        let before = live.to_html();
        let short = PatchNode::UpdateElement {
            children: vec![PatchNode::UpdateElement {
                children: vec![PatchNode::Remove],
                attributes: Vec::new(),
            }],
            attributes: Vec::new(),
        };
        assert!(matches!(
            check_patch(&live, &short),
            Err(DomPatchError::ShapeMismatch { index: 1, .. })
        ));

        let text_on_element = PatchNode::UpdateElement {
            children: vec![PatchNode::UpdateText("x".into())],
            attributes: Vec::new(),
        };
        assert!(matches!(
            check_patch(&live, &text_on_element),
            Err(DomPatchError::Dom(DomError::WrongNodeKind(_)))
        ));
        assert_eq!(live.to_html(), before);

        let target = Dom::parse("<html><body><p>a</p><em>b</em><i>c</i></body></html>");
        let patch = diff_dom(&live, &target);
        assert!(check_patch(&live, &patch).is_ok());
    }

    #[test]
    fn removed_subtrees_are_tombstoned_and_ids_stay_unique() {
        let mut live = Dom::parse("<html><body><div id=old><p>x</p></div></body></html>");
        let old = live.element_by_id("old").expect("old");
        let p = live.elements_named("p")[0];

        let target = Dom::parse("<html><body><section>y</section></body></html>");
        let patch = diff_dom(&live, &target);
        apply_patch(&mut live, &patch).expect("apply");

        assert!(!live.is_live(old));
        assert!(!live.is_live(p));
        assert_eq!(live.kind(p), None);
        assert!(live.children(old).is_empty());
        let section = live.elements_named("section")[0];
        assert_ne!(section, old);
        assert_ne!(section, p);
        assert_eq!(live.to_html(), target.to_html());
    }
}
