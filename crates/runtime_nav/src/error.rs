use crate::form::FormError;
use html::DomPatchError;
use net::NetError;
use std::fmt;

/// Something went wrong that is not one of the expected [`crate::NavigationReason`]s.
///
/// Callers of the public API still get the native fallback; the error is returned so it can
/// be logged or surfaced in diagnostics.
#[derive(Debug)]
pub enum NavigationError {
    Network(NetError),
    Patch(DomPatchError),
    Form(FormError),
    Url(url::ParseError),
}

impl fmt::Display for NavigationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigationError::Network(err) => write!(f, "fetch failed: {err}"),
            NavigationError::Patch(err) => write!(f, "patch failed: {err}"),
            NavigationError::Form(err) => write!(f, "form submission failed: {err}"),
            NavigationError::Url(err) => write!(f, "invalid url: {err}"),
        }
    }
}

impl std::error::Error for NavigationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NavigationError::Network(err) => Some(err),
            NavigationError::Patch(err) => Some(err),
            NavigationError::Form(err) => Some(err),
            NavigationError::Url(err) => Some(err),
        }
    }
}

impl From<NetError> for NavigationError {
    fn from(err: NetError) -> Self {
        NavigationError::Network(err)
    }
}

impl From<DomPatchError> for NavigationError {
    fn from(err: DomPatchError) -> Self {
        NavigationError::Patch(err)
    }
}

impl From<FormError> for NavigationError {
    fn from(err: FormError) -> Self {
        NavigationError::Form(err)
    }
}

impl From<url::ParseError> for NavigationError {
    fn from(err: url::ParseError) -> Self {
        NavigationError::Url(err)
    }
}
