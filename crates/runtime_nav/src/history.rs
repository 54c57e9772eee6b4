//! Navigation stack mirrored onto the native session history.
//!
//! Invariants:
//! - `records` is never empty and `index`, `confirmed_index` are valid offsets into it.
//! - Pushing truncates every record after the current one before appending, exactly like
//!   native history discards the forward branch.
//! - Native entries created by the runtime carry their record index as state.

use crate::config::HISTORY_STORAGE_KEY;
use crate::policy::same_document;
use core_types::ScrollPosition;
use platform::{NativeHistory, NavigationTiming, TabStorage};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NavigationRecord {
    pub url: Url,
    pub scroll: Option<ScrollPosition>,
    pub restore_scroll: bool,
}

impl NavigationRecord {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            scroll: None,
            restore_scroll: false,
        }
    }
}

/// Serialized form of the stack.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryState {
    pub records: Vec<NavigationRecord>,
    pub index: usize,
    pub confirmed_index: usize,
}

impl HistoryState {
    fn is_valid(&self) -> bool {
        self.index < self.records.len() && self.confirmed_index < self.records.len()
    }
}

/// Where a history traversal lands.
#[derive(Clone, Debug, PartialEq)]
pub struct PopstateTarget {
    pub index: usize,
    pub url: Url,
}

#[derive(Debug)]
pub struct History {
    state: HistoryState,
    observing: bool,
}

impl History {
    pub fn new(url: Url) -> Self {
        Self {
            state: HistoryState {
                records: vec![NavigationRecord::new(url)],
                index: 0,
                confirmed_index: 0,
            },
            observing: false,
        }
    }

    /// Rebuild the stack persisted by the previous document of this tab and reconcile it with
    /// how the browser got to `url`.
    ///
    /// - Nothing stored (or unreadable): a fresh stack for `url`.
    /// - Back/forward: the native entry's state names the record we are on; no record is added.
    /// - Reload of a runtime entry: same as back/forward.
    /// - Any other fresh load: the forward branch is discarded and `url` appended after the
    ///   record we left from, even when that record is mid-stack. The browser also put the new
    ///   entry after the one we left, so record indices keep matching native state indices.
    pub fn restore<H>(url: Url, host: &mut H) -> Self
    where
        H: TabStorage + NavigationTiming + NativeHistory,
    {
        let stored = host
            .get_item(HISTORY_STORAGE_KEY)
            .and_then(|raw| match serde_json::from_str::<HistoryState>(&raw) {
                Ok(state) if state.is_valid() && !state.records.is_empty() => Some(state),
                Ok(_) => {
                    log::warn!(target: "nav.history", "discarding inconsistent stored history");
                    None
                }
                Err(err) => {
                    log::warn!(target: "nav.history", "discarding unreadable stored history: {err}");
                    None
                }
            });

        let Some(mut state) = stored else {
            let history = Self::new(url);
            host.replace_state(0, &history.current().url);
            return history;
        };

        let native = host
            .state_index()
            .filter(|i| *i < state.records.len());
        if host.last_navigation_was_back_forward() {
            match native {
                Some(i) => {
                    state.index = i;
                    state.confirmed_index = i;
                }
                None => state.confirmed_index = state.index,
            }
            log::debug!(target: "nav.history", "restored at {} after back/forward", state.index);
        } else if let Some(i) = native.filter(|i| same_document(&state.records[*i].url, &url)) {
            state.index = i;
            state.confirmed_index = i;
            log::debug!(target: "nav.history", "restored at {i} after reload");
        } else {
            state.records.truncate(state.index + 1);
            state.records.push(NavigationRecord::new(url.clone()));
            state.index = state.records.len() - 1;
            state.confirmed_index = state.index;
            host.replace_state(state.index, &url);
            log::debug!(target: "nav.history", "appended {url} at {}", state.index);
        }

        Self {
            state,
            observing: false,
        }
    }

    /// Start reacting to traversals. Idempotent; returns whether this call enabled it.
    pub fn observe(&mut self) -> bool {
        !std::mem::replace(&mut self.observing, true)
    }

    pub fn is_observing(&self) -> bool {
        self.observing
    }

    pub fn records(&self) -> &[NavigationRecord] {
        &self.state.records
    }

    pub fn index(&self) -> usize {
        self.state.index
    }

    pub fn confirmed_index(&self) -> usize {
        self.state.confirmed_index
    }

    pub fn current(&self) -> &NavigationRecord {
        &self.state.records[self.state.index]
    }

    pub fn state(&self) -> &HistoryState {
        &self.state
    }

    pub fn save_scroll(&mut self, position: ScrollPosition) {
        let index = self.state.index;
        self.state.records[index].scroll = Some(position);
    }

    /// Commit a navigation to `url` as the new head of the stack.
    pub fn push(&mut self, url: Url, host: &mut impl NativeHistory) {
        let state = &mut self.state;
        state.records.truncate(state.index + 1);
        state.records.push(NavigationRecord::new(url));
        state.index = state.records.len() - 1;
        state.confirmed_index = state.index;
        host.push_state(state.index, &state.records[state.index].url);
        log::debug!(target: "nav.history", "pushed record {}", state.index);
    }

    /// React to a native traversal to `location` whose entry carries `state_index`.
    ///
    /// Returns `None` when not observing, or when the traversal stays within the current
    /// document (fragment changes are left to the browser's own scrolling).
    pub fn on_popstate(
        &mut self,
        state_index: Option<usize>,
        location: &Url,
        scroll: ScrollPosition,
    ) -> Option<PopstateTarget> {
        if !self.observing {
            return None;
        }
        let state = &mut self.state;
        let previous = state.confirmed_index;
        if same_document(&state.records[previous].url, location) {
            log::trace!(target: "nav.history", "same-document traversal to {location}");
            return None;
        }
        let target = state_index.unwrap_or(0).min(state.records.len() - 1);

        state.records[previous].scroll = Some(scroll);
        state.records[target].restore_scroll = true;
        state.index = target;
        state.confirmed_index = target;
        log::debug!(target: "nav.history", "traversal {previous} -> {target}");
        Some(PopstateTarget {
            index: target,
            url: location.clone(),
        })
    }

    /// Scroll offset to restore for the current record, if it was entered by traversal.
    /// Consumes the restore mark.
    pub fn take_restore(&mut self) -> Option<ScrollPosition> {
        let index = self.state.index;
        let record = &mut self.state.records[index];
        if !std::mem::take(&mut record.restore_scroll) {
            return None;
        }
        record.scroll
    }

    pub fn persist(&self, storage: &mut impl TabStorage) {
        match serde_json::to_string(&self.state) {
            Ok(raw) => storage.set_item(HISTORY_STORAGE_KEY, raw),
            Err(err) => log::error!(target: "nav.history", "failed to serialize history: {err}"),
        }
    }
}
