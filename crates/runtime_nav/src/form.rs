//! Form normalization: turns a `<form>` plus an optional submitter into the request a native
//! submission would send.
//!
//! Successful controls follow the usual browser rules: named, enabled, and for checkable
//! inputs checked. Buttons only contribute when they are the submitter. File inputs never
//! contribute since no file contents are available to the runtime.

use html::{Dom, NodeId};
use net::{FetchRequest, Method};
use std::fmt;
use url::Url;
use url::form_urlencoded;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormMethod {
    Http(Method),
    /// `method="dialog"`: closes the enclosing dialog, never leaves the page.
    Dialog,
}

impl FormMethod {
    /// Parse a `method`/`formmethod` value. Unknown values fall back to GET as browsers do.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("dialog") => FormMethod::Dialog,
            Some(v) => FormMethod::Http(Method::parse(v).unwrap_or(Method::Get)),
            None => FormMethod::Http(Method::Get),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormEncoding {
    #[default]
    UrlEncoded,
    Multipart,
    TextPlain,
}

impl FormEncoding {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("multipart/form-data") => FormEncoding::Multipart,
            Some("text/plain") => FormEncoding::TextPlain,
            _ => FormEncoding::UrlEncoded,
        }
    }
}

#[derive(Debug)]
pub enum FormError {
    NotAForm(NodeId),
    InvalidAction {
        action: String,
        source: url::ParseError,
    },
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormError::NotAForm(id) => write!(f, "node {} is not a form", id.0),
            FormError::InvalidAction { action, source } => {
                write!(f, "form action {action:?} is not a valid url: {source}")
            }
        }
    }
}

impl std::error::Error for FormError {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormSubmission {
    pub method: FormMethod,
    pub action: Url,
    pub encoding: FormEncoding,
    pub entries: Vec<(String, String)>,
}

impl FormSubmission {
    /// Collect `form` as submitted by `submitter`, resolving the action against `base`.
    pub fn from_form(
        dom: &Dom,
        form: NodeId,
        submitter: Option<NodeId>,
        base: &Url,
    ) -> Result<Self, FormError> {
        if !dom.is_element_named(form, "form") {
            return Err(FormError::NotAForm(form));
        }
        let submitter = submitter.filter(|s| is_submit_button(dom, *s));
        let overridden = |attr: &str, form_attr: &str| {
            submitter
                .and_then(|s| dom.attribute(s, attr))
                .or_else(|| dom.attribute(form, form_attr))
        };

        let method = FormMethod::parse(overridden("formmethod", "method"));
        let encoding = FormEncoding::parse(overridden("formenctype", "enctype"));
        let action = match overridden("formaction", "action").map(str::trim) {
            Some(action) if !action.is_empty() => {
                base.join(action).map_err(|source| FormError::InvalidAction {
                    action: action.to_string(),
                    source,
                })?
            }
            _ => base.clone(),
        };

        let mut entries = Vec::new();
        for control in dom.descendants(form).into_iter().skip(1) {
            if Some(control) == submitter {
                if let Some(name) = control_name(dom, control) {
                    let value = dom.attribute(control, "value").unwrap_or_default();
                    entries.push((name.to_string(), value.to_string()));
                }
                continue;
            }
            collect_control(dom, control, &mut entries);
        }

        Ok(Self {
            method,
            action,
            encoding,
            entries,
        })
    }

    /// Request a native submission would issue. `None` for dialog forms.
    pub fn to_request(&self) -> Option<FetchRequest> {
        let FormMethod::Http(method) = self.method else {
            return None;
        };
        if method == Method::Get {
            let mut url = self.action.clone();
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&self.entries)
                .finish();
            url.set_query(Some(&query));
            return Some(FetchRequest::get(url));
        }

        let (content_type, body) = match self.encoding {
            FormEncoding::UrlEncoded => (
                "application/x-www-form-urlencoded".to_string(),
                form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(&self.entries)
                    .finish(),
            ),
            FormEncoding::Multipart => {
                let boundary = self.boundary();
                (
                    format!("multipart/form-data; boundary={boundary}"),
                    encode_multipart(&self.entries, &boundary),
                )
            }
            FormEncoding::TextPlain => {
                let mut body = String::new();
                for (name, value) in &self.entries {
                    body.push_str(name);
                    body.push('=');
                    body.push_str(value);
                    body.push_str("\r\n");
                }
                ("text/plain;charset=UTF-8".to_string(), body)
            }
        };
        Some(FetchRequest {
            method,
            url: self.action.clone(),
            headers: vec![("Content-Type".to_string(), content_type)],
            body: Some(body.into_bytes()),
        })
    }

    /// A boundary that occurs in no entry.
    fn boundary(&self) -> String {
        let mut n = 0u32;
        loop {
            let candidate = format!("----FrugalFormBoundary{n:08x}");
            let clashes = self
                .entries
                .iter()
                .any(|(k, v)| k.contains(&candidate) || v.contains(&candidate));
            if !clashes {
                return candidate;
            }
            n += 1;
        }
    }
}

fn encode_multipart(entries: &[(String, String)], boundary: &str) -> String {
    let mut body = String::new();
    for (name, value) in entries {
        body.push_str("--");
        body.push_str(boundary);
        body.push_str("\r\nContent-Disposition: form-data; name=\"");
        body.push_str(&name.replace('"', "%22"));
        body.push_str("\"\r\n\r\n");
        body.push_str(value);
        body.push_str("\r\n");
    }
    body.push_str("--");
    body.push_str(boundary);
    body.push_str("--\r\n");
    body
}

fn input_type(dom: &Dom, id: NodeId) -> String {
    dom.attribute(id, "type")
        .map(|t| t.trim().to_ascii_lowercase())
        .unwrap_or_else(|| "text".to_string())
}

fn is_submit_button(dom: &Dom, id: NodeId) -> bool {
    match dom.element_name(id) {
        Some("button") => dom
            .attribute(id, "type")
            .is_none_or(|t| t.trim().eq_ignore_ascii_case("submit")),
        Some("input") => matches!(input_type(dom, id).as_str(), "submit" | "image"),
        _ => false,
    }
}

fn control_name(dom: &Dom, id: NodeId) -> Option<&str> {
    dom.attribute(id, "name").filter(|n| !n.is_empty())
}

fn is_disabled(dom: &Dom, id: NodeId) -> bool {
    if dom.attribute(id, "disabled").is_some() {
        return true;
    }
    dom.parent(id)
        .and_then(|p| dom.closest(p, "fieldset"))
        .is_some_and(|fieldset| dom.attribute(fieldset, "disabled").is_some())
}

fn collect_control(dom: &Dom, control: NodeId, out: &mut Vec<(String, String)>) {
    let Some(tag) = dom.element_name(control) else {
        return;
    };
    if !matches!(tag, "input" | "select" | "textarea") {
        return;
    }
    let Some(name) = control_name(dom, control) else {
        return;
    };
    if is_disabled(dom, control) {
        return;
    }
    let name = name.to_string();
    match tag {
        "input" => {
            let kind = input_type(dom, control);
            match kind.as_str() {
                "submit" | "image" | "button" | "reset" | "file" => {}
                "checkbox" | "radio" => {
                    if dom.attribute(control, "checked").is_some() {
                        let value = dom.attribute(control, "value").unwrap_or("on");
                        out.push((name, value.to_string()));
                    }
                }
                _ => {
                    let value = dom.attribute(control, "value").unwrap_or_default();
                    out.push((name, value.to_string()));
                }
            }
        }
        "textarea" => out.push((name, dom.text_content(control))),
        "select" => {
            let options: Vec<NodeId> = dom
                .descendants(control)
                .into_iter()
                .filter(|id| dom.is_element_named(*id, "option"))
                .filter(|id| !is_disabled(dom, *id))
                .collect();
            let multiple = dom.attribute(control, "multiple").is_some();
            let mut selected: Vec<NodeId> = options
                .iter()
                .copied()
                .filter(|o| dom.attribute(*o, "selected").is_some())
                .collect();
            if selected.is_empty() && !multiple {
                selected.extend(options.first().copied());
            }
            if !multiple {
                selected.truncate(1);
            }
            for option in selected {
                let value = dom
                    .attribute(option, "value")
                    .map(str::to_string)
                    .unwrap_or_else(|| dom.text_content(option).trim().to_string());
                out.push((name.clone(), value));
            }
        }
        _ => {}
    }
}
