//! Hover-intent prefetching for one candidate link.
//!
//! State machine per anchor:
//!
//! ```text
//! Initial --schedule--> Waiting --timer--> Done --(cooldown elapsed, schedule)--> Initial
//!    ^                     |
//!    +-------cancel--------+
//! ```
//!
//! Firing inserts `<link rel="prefetch" href=...>` into the head. Every fire or cancel arms a
//! collection timer that removes the hint again, so abandoned hints do not pile up.

use crate::config::{NavigateConfig, PREFETCH_ATTRIBUTE};
use crate::policy::{same_origin, should_visit};
use crate::timers::{Task, TimerId, TimerQueue};
use html::{Dom, DomError, Node, NodeId};
use url::Url;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PrefetchState {
    #[default]
    Initial,
    Waiting,
    Done,
}

#[derive(Debug)]
pub struct Prefetcher {
    anchor: NodeId,
    url: Url,
    state: PrefetchState,
    last_prefetch_ms: Option<u64>,
    timer: Option<TimerId>,
    collect_timer: Option<TimerId>,
    hint: Option<NodeId>,
}

impl Prefetcher {
    pub fn new(anchor: NodeId, url: Url) -> Self {
        Self {
            anchor,
            url,
            state: PrefetchState::Initial,
            last_prefetch_ms: None,
            timer: None,
            collect_timer: None,
            hint: None,
        }
    }

    pub fn anchor(&self) -> NodeId {
        self.anchor
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn state(&self) -> PrefetchState {
        self.state
    }

    pub fn hint(&self) -> Option<NodeId> {
        self.hint
    }

    fn eligible(&self, dom: &Dom, location: &Url, config: &NavigateConfig) -> bool {
        config.prefetch.enabled
            && should_visit(
                dom.attribute(self.anchor, PREFETCH_ATTRIBUTE),
                config.prefetch.default_prefetch,
            )
            && same_origin(&self.url, location)
    }

    /// Arm the prefetch timer. Returns whether a timer was armed.
    pub fn schedule(
        &mut self,
        dom: &Dom,
        location: &Url,
        config: &NavigateConfig,
        now_ms: u64,
        timers: &mut TimerQueue,
    ) -> bool {
        if self.state == PrefetchState::Done
            && self
                .last_prefetch_ms
                .is_some_and(|last| now_ms.saturating_sub(last) >= config.prefetch.cooldown_ms)
        {
            self.state = PrefetchState::Initial;
        }
        if self.state != PrefetchState::Initial || !self.eligible(dom, location, config) {
            return false;
        }
        let due = now_ms + config.prefetch.delay_ms;
        self.timer = Some(timers.arm(due, Task::Prefetch(self.anchor)));
        self.state = PrefetchState::Waiting;
        log::trace!(target: "nav.prefetch", "scheduled {} at {due}", self.url);
        true
    }

    /// Abort a pending prefetch. Only meaningful while waiting.
    pub fn cancel(&mut self, config: &NavigateConfig, now_ms: u64, timers: &mut TimerQueue) -> bool {
        if self.state != PrefetchState::Waiting {
            return false;
        }
        if let Some(timer) = self.timer.take() {
            timers.cancel(timer);
        }
        self.state = PrefetchState::Initial;
        self.arm_collect(config, now_ms, timers);
        true
    }

    /// Timer callback. `timer` must be the one this prefetcher armed last; stale timers are
    /// ignored. Returns whether a hint was inserted.
    pub fn fire(
        &mut self,
        timer: TimerId,
        dom: &mut Dom,
        config: &NavigateConfig,
        now_ms: u64,
        timers: &mut TimerQueue,
    ) -> Result<bool, DomError> {
        if self.state != PrefetchState::Waiting || self.timer != Some(timer) {
            return Ok(false);
        }
        self.timer = None;
        self.state = PrefetchState::Done;
        self.last_prefetch_ms = Some(now_ms);

        // Re-inserting moves the hint to the end of the head, which refreshes its priority.
        self.remove_hint(dom)?;
        let inserted = match dom.head().or_else(|| dom.document_element()) {
            Some(parent) => {
                let link = Node::element(
                    "link",
                    vec![
                        ("rel".to_string(), Some("prefetch".to_string())),
                        ("href".to_string(), Some(self.url.to_string())),
                    ],
                    Vec::new(),
                );
                let id = dom.create_fragment(&link);
                dom.append_child(parent, id)?;
                self.hint = Some(id);
                log::debug!(target: "nav.prefetch", "prefetch hint for {}", self.url);
                true
            }
            None => false,
        };
        self.arm_collect(config, now_ms, timers);
        Ok(inserted)
    }

    /// Collection timer callback. Returns whether a live hint was removed.
    pub fn collect_hint(&mut self, timer: TimerId, dom: &mut Dom) -> Result<bool, DomError> {
        if self.collect_timer != Some(timer) {
            return Ok(false);
        }
        self.collect_timer = None;
        self.remove_hint(dom)
    }

    fn remove_hint(&mut self, dom: &mut Dom) -> Result<bool, DomError> {
        match self.hint.take() {
            Some(hint) if dom.is_live(hint) => {
                dom.remove(hint)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn arm_collect(&mut self, config: &NavigateConfig, now_ms: u64, timers: &mut TimerQueue) {
        if let Some(previous) = self.collect_timer.take() {
            timers.cancel(previous);
        }
        let due = now_ms + config.prefetch.gc_delay_ms;
        self.collect_timer = Some(timers.arm(due, Task::CollectHint(self.anchor)));
    }

    /// Drop every timer this prefetcher still owns.
    pub fn detach(&mut self, timers: &mut TimerQueue) {
        for timer in [self.timer.take(), self.collect_timer.take()].into_iter().flatten() {
            timers.cancel(timer);
        }
    }
}
