//! Anchor clicks.

use crate::config::NAVIGATE_ATTRIBUTE;
use crate::error::NavigationError;
use crate::navigator::{Navigator, PageContext};
use crate::policy::{same_document, should_visit};
use core_types::{NavigationReason, NavigationResult};
use html::NodeId;
use platform::Host;
use url::Url;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.ctrl || self.shift || self.alt || self.meta
    }
}

/// A click (or keyboard activation) on an element inside an anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinkClick {
    pub anchor: NodeId,
    /// 0 is the primary button.
    pub button: u16,
    pub modifiers: Modifiers,
}

impl LinkClick {
    pub fn primary(anchor: NodeId) -> Self {
        Self {
            anchor,
            button: 0,
            modifiers: Modifiers::default(),
        }
    }
}

/// The URL a click should be navigated to by the runtime, or `None` when the browser keeps
/// the click: new-tab gestures, downloads, foreign browsing contexts, non-http links and
/// in-page fragment jumps.
pub fn intercept<H: Host>(ctx: &PageContext<H>, click: &LinkClick) -> Option<Url> {
    let dom = &ctx.dom;
    let anchor = click.anchor;
    if click.button != 0 || click.modifiers.any() || dom.attribute(anchor, "download").is_some() {
        return None;
    }
    if dom
        .attribute(anchor, "target")
        .is_some_and(|t| !t.trim().is_empty() && !t.trim().eq_ignore_ascii_case("_self"))
    {
        return None;
    }
    let href = dom.attribute(anchor, "href")?;
    let url = ctx.location.join(href.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    if url.fragment().is_some() && same_document(&url, &ctx.location) {
        return None;
    }
    Some(url)
}

/// Reason the anchor itself forbids runtime navigation, if any.
fn rejection<H: Host>(ctx: &PageContext<H>, anchor: NodeId) -> Option<NavigationReason> {
    let rel_external = ctx.dom.attribute(anchor, "rel").is_some_and(|rel| {
        rel.split_ascii_whitespace()
            .any(|token| token.eq_ignore_ascii_case("external"))
    });
    if rel_external {
        return Some(NavigationReason::ExternalTarget);
    }
    let directive = ctx.dom.attribute(anchor, NAVIGATE_ATTRIBUTE);
    if !should_visit(directive, ctx.config.default_navigate) {
        return Some(NavigationReason::NavigationDisabledOnElement);
    }
    None
}

/// Navigate to `url` on behalf of `anchor`. Any outcome other than success ends in a native
/// navigation to `url`.
pub fn visit<H: Host>(
    ctx: &mut PageContext<H>,
    anchor: NodeId,
    url: Url,
) -> Result<NavigationResult, NavigationError> {
    let outcome = match rejection(ctx, anchor) {
        Some(reason) => Ok(NavigationResult::Failure(reason)),
        None => Navigator::new(url.clone()).visit(ctx, None),
    };
    assign_unless_success(ctx, &outcome, &url);
    outcome
}

/// Native navigation to `url` for any outcome other than success.
pub(crate) fn assign_unless_success<H: Host>(
    ctx: &mut PageContext<H>,
    outcome: &Result<NavigationResult, NavigationError>,
    url: &Url,
) {
    match outcome {
        Ok(NavigationResult::Success) => {}
        Ok(NavigationResult::Failure(reason)) => {
            log::debug!(target: "nav.visitor", "{url}: {reason}, falling back");
            ctx.host.assign(url);
        }
        Err(err) => {
            log::error!(target: "nav.visitor", "{url}: {err}, falling back");
            ctx.host.assign(url);
        }
    }
}
