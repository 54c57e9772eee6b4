//! Document model and tree reconciliation for the navigation runtime.
//!
//! Pipeline: [`tokenize`] → [`build_dom`] → [`Dom`]; two documents are compared with
//! [`diff_dom`] and the resulting [`PatchNode`] is applied to the live one with
//! [`apply_patch`].

pub mod dom_utils;
pub mod head;

mod dom;
mod dom_apply;
mod dom_builder;
mod dom_diff;
mod dom_patch;
mod entities;
mod serialize;
mod tokenizer;
mod types;

pub use crate::dom::{Dom, DomError};
pub use crate::dom_apply::{DomPatchError, apply_patch, check_patch};
pub use crate::dom_builder::build_dom;
pub use crate::dom_diff::{diff_attributes, diff_dom};
pub use crate::dom_patch::{AttributePatch, PatchNode, PatchStats, RegionMarker};
pub use crate::head::{HeadKey, head_key};
pub use crate::tokenizer::{Tokenizer, tokenize};
pub use crate::types::{Attributes, Node, NodeId, NodeKind, Token, get_attr, has_attr};
