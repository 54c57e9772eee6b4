//! One navigation: fetch, parse, eligibility check, diff, patch, scroll, lifecycle events.

use crate::config::{NAVIGATE_META, NavigateConfig};
use crate::error::NavigationError;
use crate::history::History;
use crate::policy::{same_origin, should_visit};
use bus::{EventBus, PageEvent};
use core_types::{NavigationReason, NavigationResult, ReadyState, ScrollPosition};
use html::{Dom, PatchStats, apply_patch, check_patch, diff_dom, dom_utils};
use net::{FetchRequest, FetchResponse, Fetcher, NetError, fetch_in_background};
use platform::Host;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Everything a navigation reads or mutates. Owned by the session; borrowed mutably for the
/// duration of one navigation, so two navigations can never interleave on the live document.
pub struct PageContext<H: Host> {
    pub dom: Dom,
    pub location: Url,
    pub history: History,
    pub bus: EventBus,
    pub host: H,
    pub fetcher: Arc<dyn Fetcher>,
    pub config: NavigateConfig,
    pub ready_state: ReadyState,
    /// What the last successful patch did.
    pub last_patch: Option<PatchStats>,
    /// How many fetches outlasted the loading delay and showed the indicator.
    pub indicator_shows: u32,
}

impl<H: Host> PageContext<H> {
    pub fn set_ready_state(&mut self, state: ReadyState) {
        self.ready_state = state;
        self.bus.dispatch(PageEvent::ReadyStateChange(state));
    }
}

#[derive(Clone, Debug)]
pub struct Navigator {
    url: Url,
    restore: Option<ScrollPosition>,
}

impl Navigator {
    pub fn new(url: Url) -> Self {
        Self { url, restore: None }
    }

    /// A navigator re-entering a history record, restoring `restore` if scroll restoration
    /// is enabled and no fragment takes precedence.
    pub fn with_restore(url: Url, restore: Option<ScrollPosition>) -> Self {
        Self { url, restore }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Committed navigation: on success the new location becomes a history record.
    pub fn visit<H: Host>(
        &self,
        ctx: &mut PageContext<H>,
        request: Option<FetchRequest>,
    ) -> Result<NavigationResult, NavigationError> {
        let scroll = ctx.host.scroll_position();
        ctx.history.save_scroll(scroll);
        if !same_origin(&self.url, &ctx.location) {
            return Ok(NavigationResult::Failure(NavigationReason::ExternalTarget));
        }
        let result = self.navigate(ctx, request)?;
        if result.is_success() {
            let location = ctx.location.clone();
            ctx.history.push(location, &mut ctx.host);
        }
        Ok(result)
    }

    /// Replace the live document with the one served at this navigator's URL.
    pub fn navigate<H: Host>(
        &self,
        ctx: &mut PageContext<H>,
        request: Option<FetchRequest>,
    ) -> Result<NavigationResult, NavigationError> {
        ctx.set_ready_state(ReadyState::Loading);

        let request = request.unwrap_or_else(|| FetchRequest::get(self.url.clone()));
        log::debug!(target: "nav.navigator", "{} {}", request.method.as_str(), request.url);
        let response = fetch_with_indicator(ctx, request)?;
        if !response.is_ok() {
            log::debug!(target: "nav.navigator", "{} answered {}", self.url, response.status);
            return Ok(NavigationResult::Failure(NavigationReason::NotOk));
        }
        if !same_origin(&response.url, &ctx.location) {
            log::debug!(
                target: "nav.navigator",
                "{} redirected off-origin to {}",
                self.url,
                response.url
            );
            return Ok(NavigationResult::Failure(NavigationReason::ExternalTarget));
        }

        let mut url = response.url.clone();
        if url.fragment().is_none() {
            url.set_fragment(self.url.fragment());
        }

        let target = Dom::parse(&response.body);
        if !should_visit(target.meta_content(NAVIGATE_META), ctx.config.default_navigate) {
            log::debug!(target: "nav.navigator", "{url} disables runtime navigation");
            return Ok(NavigationResult::Failure(
                NavigationReason::NavigationDisabledOnTarget,
            ));
        }

        ctx.bus.dispatch(PageEvent::BeforeUnload);
        let patch = diff_dom(&ctx.dom, &target);
        // A patch that passes the check applies cleanly, so the live document is never left half
        // patched.
        check_patch(&ctx.dom, &patch)?;
        let stats = apply_patch(&mut ctx.dom, &patch)?;
        ctx.location = url;
        ctx.last_patch = Some(stats);
        log::debug!(
            target: "nav.navigator",
            "patched {} ({} edits)",
            ctx.location,
            stats.total()
        );

        ctx.set_ready_state(ReadyState::Interactive);
        self.resolve_scroll(ctx);
        ctx.set_ready_state(ReadyState::Complete);
        Ok(NavigationResult::Success)
    }

    fn resolve_scroll<H: Host>(&self, ctx: &mut PageContext<H>) {
        let anchor = ctx
            .location
            .fragment()
            .filter(|f| !f.is_empty())
            .and_then(|f| ctx.dom.element_by_id(f));
        if let Some(node) = anchor {
            ctx.host.scroll_into_view(node);
            return;
        }
        match self.restore {
            Some(position) if ctx.config.scroll_restoration => ctx.host.scroll_to(position),
            _ if ctx.config.reset_scroll => ctx.host.scroll_to(ScrollPosition::TOP),
            _ => {}
        }
    }
}

/// Fetch on a worker thread. If the response takes longer than the configured delay the
/// loading class is put on the document element until it arrives.
fn fetch_with_indicator<H: Host>(
    ctx: &mut PageContext<H>,
    request: FetchRequest,
) -> Result<FetchResponse, NavigationError> {
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    fetch_in_background(
        Arc::clone(&ctx.fetcher),
        request,
        Arc::new(move |result| {
            if let Ok(tx) = tx.lock() {
                let _ = tx.send(result);
            }
        }),
    );

    let delay = Duration::from_millis(ctx.config.loading_delay_ms);
    let result = match rx.recv_timeout(delay) {
        Ok(result) => result,
        Err(RecvTimeoutError::Disconnected) => Err(NetError::Disconnected),
        Err(RecvTimeoutError::Timeout) => {
            ctx.indicator_shows += 1;
            let class = ctx.config.loading_class_name.clone();
            let element = ctx.dom.document_element();
            if let Some(element) = element {
                dom_utils::add_class(&mut ctx.dom, element, &class)
                    .map_err(|e| NavigationError::Patch(e.into()))?;
            }
            let result = rx.recv().unwrap_or(Err(NetError::Disconnected));
            if let Some(element) = element {
                dom_utils::remove_class(&mut ctx.dom, element, &class)
                    .map_err(|e| NavigationError::Patch(e.into()))?;
            }
            result
        }
    };
    result.map_err(NavigationError::from)
}
