use url::Url;

/// Tri-state directive (`"true"` / `"false"` / absent) resolved against a default.
///
/// With a navigating default only an explicit `"false"` opts out; with a non-navigating
/// default only an explicit `"true"` opts in. Any other value leaves the default in place.
pub fn should_visit(directive: Option<&str>, default: bool) -> bool {
    match directive.map(str::trim) {
        Some(value) if default && value.eq_ignore_ascii_case("false") => false,
        Some(value) if !default && value.eq_ignore_ascii_case("true") => true,
        _ => default,
    }
}

pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}

/// Both URLs address the same document, differing at most by fragment.
pub fn same_document(a: &Url, b: &Url) -> bool {
    a[..url::Position::AfterQuery] == b[..url::Position::AfterQuery]
}
