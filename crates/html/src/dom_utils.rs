use crate::dom::{Dom, DomError};
use crate::types::NodeId;

/// Whitespace-separated tokens of the `class` attribute.
pub fn class_list(dom: &Dom, id: NodeId) -> Vec<&str> {
    dom.attribute(id, "class")
        .map(|value| value.split_ascii_whitespace().collect())
        .unwrap_or_default()
}

pub fn has_class(dom: &Dom, id: NodeId, class: &str) -> bool {
    class_list(dom, id).contains(&class)
}

/// Add `class` unless already present. Returns whether the attribute changed.
pub fn add_class(dom: &mut Dom, id: NodeId, class: &str) -> Result<bool, DomError> {
    if has_class(dom, id, class) {
        return Ok(false);
    }
    let mut classes = class_list(dom, id).join(" ");
    if !classes.is_empty() {
        classes.push(' ');
    }
    classes.push_str(class);
    dom.set_attribute(id, "class", Some(classes))?;
    Ok(true)
}

/// Remove every occurrence of `class`; drops the attribute when nothing is left.
pub fn remove_class(dom: &mut Dom, id: NodeId, class: &str) -> Result<bool, DomError> {
    if !has_class(dom, id, class) {
        return Ok(false);
    }
    let rest: Vec<&str> = class_list(dom, id)
        .into_iter()
        .filter(|c| *c != class)
        .collect();
    if rest.is_empty() {
        dom.remove_attribute(id, "class")?;
    } else {
        let value = rest.join(" ");
        dom.set_attribute(id, "class", Some(value))?;
    }
    Ok(true)
}
