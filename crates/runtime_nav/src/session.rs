//! The runtime attached to one tab.
//!
//! A `Session` owns the live document and everything that mutates it. Every entry point takes
//! `&mut self`, so at most one navigation runs at a time and patches never interleave.
//!
//! After start-up and after every navigation the session rescans the document for same-origin
//! anchors and keeps one [`Prefetcher`] per anchor node. Node ids survive patches, so an anchor
//! that is preserved by the diff keeps its prefetch state (including its cooldown).

use crate::config::NavigateConfig;
use crate::error::NavigationError;
use crate::history::History;
use crate::navigator::{Navigator, PageContext};
use crate::prefetch::Prefetcher;
use crate::submitter;
use crate::timers::{Task, TimerQueue};
use crate::visitor::{self, LinkClick};
use bus::{EventBus, PageEvent};
use core_types::{NavigationResult, ReadyState};
use html::{Dom, NodeId, PatchStats};
use net::Fetcher;
use platform::Host;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use url::Url;

pub struct Session<H: Host> {
    ctx: PageContext<H>,
    prefetchers: HashMap<NodeId, Prefetcher>,
    timers: TimerQueue,
}

impl<H: Host> Session<H> {
    /// Attach to a document the browser has just loaded natively at `location`.
    ///
    /// Subscribe to `bus` before calling this to observe `SessionStart`.
    pub fn start(
        config: NavigateConfig,
        mut host: H,
        fetcher: Arc<dyn Fetcher>,
        bus: EventBus,
        location: Url,
        html: &str,
    ) -> Self {
        let mut history = History::restore(location.clone(), &mut host);
        history.observe();
        let mut session = Self {
            ctx: PageContext {
                dom: Dom::parse(html),
                location,
                history,
                bus,
                host,
                fetcher,
                config,
                ready_state: ReadyState::Complete,
                last_patch: None,
                indicator_shows: 0,
            },
            prefetchers: HashMap::new(),
            timers: TimerQueue::new(),
        };
        session.observe_links();
        session.ctx.bus.dispatch(PageEvent::SessionStart);
        log::debug!(
            target: "nav.session",
            "started at {} ({} history records)",
            session.ctx.location,
            session.ctx.history.records().len()
        );
        session
    }

    /// Programmatic navigation, as if a plain link to `url` was followed.
    pub fn navigate(&mut self, url: Url) -> Result<NavigationResult, NavigationError> {
        let outcome = Navigator::new(url.clone()).visit(&mut self.ctx, None);
        visitor::assign_unless_success(&mut self.ctx, &outcome, &url);
        self.settle(&outcome);
        outcome
    }

    /// Handle a click on an anchor. `None` means the click was left to the browser.
    pub fn click(&mut self, click: LinkClick) -> Option<Result<NavigationResult, NavigationError>> {
        let url = visitor::intercept(&self.ctx, &click)?;
        let outcome = visitor::visit(&mut self.ctx, click.anchor, url);
        self.settle(&outcome);
        Some(outcome)
    }

    pub fn submit(
        &mut self,
        form: NodeId,
        submitter: Option<NodeId>,
    ) -> Result<NavigationResult, NavigationError> {
        let outcome = submitter::submit(&mut self.ctx, form, submitter);
        self.settle(&outcome);
        outcome
    }

    /// Native history traversal landed on `location`, whose entry carries `state_index`.
    /// `None` means the traversal stayed within the current document.
    pub fn popstate(
        &mut self,
        state_index: Option<usize>,
        location: Url,
    ) -> Option<Result<NavigationResult, NavigationError>> {
        let scroll = self.ctx.host.scroll_position();
        let target = self
            .ctx
            .history
            .on_popstate(state_index, &location, scroll)?;
        self.ctx.bus.dispatch(PageEvent::Popstate {
            url: target.url.clone(),
            index: target.index,
        });
        let restore = self.ctx.history.take_restore();
        let outcome =
            Navigator::with_restore(target.url.clone(), restore).navigate(&mut self.ctx, None);
        visitor::assign_unless_success(&mut self.ctx, &outcome, &target.url);
        self.settle(&outcome);
        Some(outcome)
    }

    /// Pointer entered `anchor`. Returns whether a prefetch was scheduled.
    pub fn pointer_enter(&mut self, anchor: NodeId) -> bool {
        let now = self.ctx.host.now_ms();
        let Some(prefetcher) = self.prefetchers.get_mut(&anchor) else {
            return false;
        };
        prefetcher.schedule(
            &self.ctx.dom,
            &self.ctx.location,
            &self.ctx.config,
            now,
            &mut self.timers,
        )
    }

    /// Pointer left `anchor`. Returns whether a pending prefetch was cancelled.
    pub fn pointer_leave(&mut self, anchor: NodeId) -> bool {
        let now = self.ctx.host.now_ms();
        let Some(prefetcher) = self.prefetchers.get_mut(&anchor) else {
            return false;
        };
        prefetcher.cancel(&self.ctx.config, now, &mut self.timers)
    }

    /// Run every timer due at the host clock. Returns how many prefetch hints were inserted.
    pub fn tick(&mut self) -> usize {
        let now = self.ctx.host.now_ms();
        let mut inserted = 0;
        for (timer, task) in self.timers.take_due(now) {
            let (Task::Prefetch(anchor) | Task::CollectHint(anchor)) = task;
            let Some(prefetcher) = self.prefetchers.get_mut(&anchor) else {
                continue;
            };
            let result = match task {
                Task::Prefetch(_) => prefetcher.fire(
                    timer,
                    &mut self.ctx.dom,
                    &self.ctx.config,
                    now,
                    &mut self.timers,
                ),
                Task::CollectHint(_) => prefetcher.collect_hint(timer, &mut self.ctx.dom),
            };
            match result {
                Ok(true) if matches!(task, Task::Prefetch(_)) => inserted += 1,
                Ok(_) => {}
                Err(err) => log::warn!(target: "nav.session", "{task:?} failed: {err}"),
            }
        }
        inserted
    }

    /// The page is going away: record the scroll offset and persist history for the next load
    /// in this tab. Hands the host back.
    pub fn unload(mut self) -> H {
        let scroll = self.ctx.host.scroll_position();
        self.ctx.history.save_scroll(scroll);
        self.ctx.history.persist(&mut self.ctx.host);
        for prefetcher in self.prefetchers.values_mut() {
            prefetcher.detach(&mut self.timers);
        }
        log::debug!(target: "nav.session", "unloaded at {}", self.ctx.location);
        self.ctx.host
    }

    pub fn subscribe(&mut self) -> Receiver<PageEvent> {
        self.ctx.bus.subscribe()
    }

    pub fn dom(&self) -> &Dom {
        &self.ctx.dom
    }

    pub fn location(&self) -> &Url {
        &self.ctx.location
    }

    pub fn history(&self) -> &History {
        &self.ctx.history
    }

    pub fn host(&self) -> &H {
        &self.ctx.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.ctx.host
    }

    pub fn config(&self) -> &NavigateConfig {
        &self.ctx.config
    }

    pub fn ready_state(&self) -> ReadyState {
        self.ctx.ready_state
    }

    pub fn last_patch(&self) -> Option<PatchStats> {
        self.ctx.last_patch
    }

    pub fn prefetcher(&self, anchor: NodeId) -> Option<&Prefetcher> {
        self.prefetchers.get(&anchor)
    }

    pub fn prefetcher_count(&self) -> usize {
        self.prefetchers.len()
    }

    fn settle(&mut self, outcome: &Result<NavigationResult, NavigationError>) {
        if matches!(outcome, Ok(NavigationResult::Success)) {
            self.observe_links();
        }
    }

    /// Reconcile prefetchers with the anchors currently in the document.
    fn observe_links(&mut self) {
        let dom = &self.ctx.dom;
        let location = &self.ctx.location;
        let mut current: HashMap<NodeId, Url> = HashMap::new();
        for anchor in dom.elements_named("a") {
            let Some(href) = dom.attribute(anchor, "href") else {
                continue;
            };
            let Ok(url) = location.join(href.trim()) else {
                continue;
            };
            if matches!(url.scheme(), "http" | "https") && url.origin() == location.origin() {
                current.insert(anchor, url);
            }
        }

        let stale: Vec<NodeId> = self
            .prefetchers
            .iter()
            .filter(|(anchor, p)| current.get(anchor) != Some(p.url()))
            .map(|(anchor, _)| *anchor)
            .collect();
        for anchor in stale {
            if let Some(mut prefetcher) = self.prefetchers.remove(&anchor) {
                prefetcher.detach(&mut self.timers);
                let hint = prefetcher.hint().filter(|h| self.ctx.dom.is_live(*h));
                if let Some(hint) = hint {
                    if let Err(err) = self.ctx.dom.remove(hint) {
                        log::warn!(target: "nav.session", "dropping stale hint failed: {err}");
                    }
                }
            }
        }

        let mut added = 0;
        for (anchor, url) in current {
            self.prefetchers.entry(anchor).or_insert_with(|| {
                added += 1;
                Prefetcher::new(anchor, url)
            });
        }
        log::trace!(
            target: "nav.session",
            "observing {} links ({added} new)",
            self.prefetchers.len()
        );
    }
}
