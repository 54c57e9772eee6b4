//! Tree edit script exchanged between diffing and patching.
//!
//! Invariants:
//! - A `PatchNode` tree mirrors the *current* tree it was computed against: an
//!   `UpdateElement` carries exactly one entry per current child, in order, followed only by
//!   trailing `Append` entries for nodes the target adds.
//! - Only `Remove`, `Replace` and `Append` create or destroy nodes; every node reached through
//!   `Preserve`, `UpdateText` or `UpdateElement` keeps its identity.
//! - Attribute names are canonical ASCII-lowercase.

use crate::types::Node;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttributePatch {
    Set { name: String, value: Option<String> },
    Remove { name: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatchNode {
    Preserve,
    Remove,
    Append(Node),
    Replace(Node),
    UpdateText(String),
    UpdateElement {
        children: Vec<PatchNode>,
        attributes: Vec<AttributePatch>,
    },
}

impl PatchNode {
    /// True when applying this patch would not change anything.
    pub fn is_noop(&self) -> bool {
        let mut stack = vec![self];
        while let Some(patch) = stack.pop() {
            match patch {
                PatchNode::Preserve => {}
                PatchNode::UpdateElement {
                    children,
                    attributes,
                } => {
                    if !attributes.is_empty() {
                        return false;
                    }
                    stack.extend(children.iter());
                }
                _ => return false,
            }
        }
        true
    }

    /// Number of node-level edits (anything but `Preserve` and pure `UpdateElement` descent),
    /// plus one per attribute change.
    pub fn edit_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(patch) = stack.pop() {
            match patch {
                PatchNode::Preserve => {}
                PatchNode::UpdateElement {
                    children,
                    attributes,
                } => {
                    count += attributes.len();
                    stack.extend(children.iter());
                }
                _ => count += 1,
            }
        }
        count
    }
}

/// Sentinel comments that fence a region the diff must not reconcile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionMarker {
    Start,
    End,
}

impl RegionMarker {
    pub const START_TEXT: &'static str = "start-no-diff";
    pub const END_TEXT: &'static str = "end-no-diff";

    /// Recognize a marker from comment text (`<!-- start-no-diff -->`, optionally followed
    /// by a label such as `<!-- start-no-diff: analytics -->`).
    pub fn parse(comment: &str) -> Option<Self> {
        let text = comment.trim();
        if text.starts_with(Self::START_TEXT) {
            Some(RegionMarker::Start)
        } else if text.starts_with(Self::END_TEXT) {
            Some(RegionMarker::End)
        } else {
            None
        }
    }

    pub fn comment_text(self) -> &'static str {
        match self {
            RegionMarker::Start => Self::START_TEXT,
            RegionMarker::End => Self::END_TEXT,
        }
    }
}

/// What an applied patch did to the live tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PatchStats {
    pub removed: usize,
    pub appended: usize,
    pub replaced: usize,
    pub text_updates: usize,
    pub attribute_updates: usize,
}

impl PatchStats {
    pub fn total(&self) -> usize {
        self.removed + self.appended + self.replaced + self.text_updates + self.attribute_updates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_are_recognized_with_labels_and_padding() {
        assert_eq!(RegionMarker::parse(" start-no-diff "), Some(RegionMarker::Start));
        assert_eq!(
            RegionMarker::parse("end-no-diff: analytics"),
            Some(RegionMarker::End)
        );
        assert_eq!(RegionMarker::parse("no-diff"), None);
        assert_eq!(RegionMarker::parse(" start "), None);
    }

    #[test]
    fn noop_detection_descends_into_updates() {
        let noop = PatchNode::UpdateElement {
            children: vec![PatchNode::Preserve, PatchNode::Preserve],
            attributes: Vec::new(),
        };
        assert!(noop.is_noop());
        assert_eq!(noop.edit_count(), 0);

        let edit = PatchNode::UpdateElement {
            children: vec![PatchNode::Preserve, PatchNode::UpdateText("x".into())],
            attributes: vec![AttributePatch::Remove { name: "id".into() }],
        };
        assert!(!edit.is_noop());
        assert_eq!(edit.edit_count(), 2);
    }
}
