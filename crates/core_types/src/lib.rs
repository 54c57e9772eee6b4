use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a navigation was not carried out by the runtime.
///
/// The set is closed: every failure path in the navigation stack maps onto one of these, and
/// callers recover from all of them the same way (native browser behavior).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NavigationReason {
    /// The target answered with a non-2xx status.
    NotOk,
    /// The fetched document opted out through its `frugal-navigate` meta directive.
    NavigationDisabledOnTarget,
    /// The triggering anchor or form opted out through its directive attribute.
    NavigationDisabledOnElement,
    /// The target URL is not same-origin with the current location.
    ExternalTarget,
    /// The form submits to `method="dialog"`.
    DialogFormTarget,
}

impl NavigationReason {
    pub fn as_str(self) -> &'static str {
        match self {
            NavigationReason::NotOk => "not-ok",
            NavigationReason::NavigationDisabledOnTarget => "navigation-disabled-on-target",
            NavigationReason::NavigationDisabledOnElement => "navigation-disabled-on-element",
            NavigationReason::ExternalTarget => "external-target",
            NavigationReason::DialogFormTarget => "dialog-form-target",
        }
    }
}

impl fmt::Display for NavigationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavigationResult {
    Success,
    Failure(NavigationReason),
}

impl NavigationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, NavigationResult::Success)
    }

    pub fn reason(&self) -> Option<NavigationReason> {
        match self {
            NavigationResult::Success => None,
            NavigationResult::Failure(reason) => Some(*reason),
        }
    }
}

/// Document lifecycle as observed by code living next to the runtime (island hydration etc).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ReadyState {
    Loading,
    Interactive,
    #[default]
    Complete,
}

impl ReadyState {
    pub fn as_str(self) -> &'static str {
        match self {
            ReadyState::Loading => "loading",
            ReadyState::Interactive => "interactive",
            ReadyState::Complete => "complete",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollPosition {
    pub x: f64,
    pub y: f64,
}

impl ScrollPosition {
    pub const TOP: ScrollPosition = ScrollPosition { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}
