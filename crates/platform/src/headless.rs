use crate::{Clock, NativeHistory, NativeNavigation, NavigationTiming, TabStorage, Viewport};
use core_types::ScrollPosition;
use html::NodeId;
use std::collections::HashMap;
use url::Url;

/// Side effect requested from the embedder, recorded in call order.
#[derive(Clone, Debug, PartialEq)]
pub enum NativeCall {
    PushState { index: usize, url: Url },
    ReplaceState { index: usize, url: Url },
    Assign(Url),
    SubmitForm(NodeId),
    ScrollTo(ScrollPosition),
    ScrollIntoView(NodeId),
}

#[derive(Clone, Debug)]
struct NativeEntry {
    url: Url,
    state: Option<usize>,
}

/// In-memory host with a manual clock.
///
/// Native history is simulated as a stack with a cursor so [`HeadlessHost::traverse`] can
/// produce what a `popstate` would carry. Storage survives [`HeadlessHost::reload`].
#[derive(Clone, Debug)]
pub struct HeadlessHost {
    entries: Vec<NativeEntry>,
    cursor: usize,
    storage: HashMap<String, String>,
    back_forward: bool,
    scroll: ScrollPosition,
    now_ms: u64,
    calls: Vec<NativeCall>,
}

impl HeadlessHost {
    pub fn new(url: Url) -> Self {
        Self {
            entries: vec![NativeEntry { url, state: None }],
            cursor: 0,
            storage: HashMap::new(),
            back_forward: false,
            scroll: ScrollPosition::TOP,
            now_ms: 0,
            calls: Vec::new(),
        }
    }

    pub fn calls(&self) -> &[NativeCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<NativeCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn current_url(&self) -> &Url {
        &self.entries[self.cursor].url
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn advance(&mut self, ms: u64) {
        self.now_ms += ms;
    }

    /// Move the native cursor by `delta` entries. Returns the URL and state a `popstate`
    /// for the new entry would carry, or `None` when the move leaves the stack.
    pub fn traverse(&mut self, delta: isize) -> Option<(Url, Option<usize>)> {
        let target = self.cursor.checked_add_signed(delta)?;
        let entry = self.entries.get(target)?;
        self.cursor = target;
        Some((entry.url.clone(), entry.state))
    }

    /// Simulate the page being loaded again at the current entry, keeping storage.
    pub fn reload(&mut self, back_forward: bool) {
        self.back_forward = back_forward;
        self.scroll = ScrollPosition::TOP;
        self.calls.clear();
    }

    fn push_entry(&mut self, url: Url, state: Option<usize>) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(NativeEntry { url, state });
        self.cursor = self.entries.len() - 1;
    }

    pub fn set_scroll(&mut self, position: ScrollPosition) {
        self.scroll = position;
    }
}

impl NativeHistory for HeadlessHost {
    fn push_state(&mut self, index: usize, url: &Url) {
        self.push_entry(url.clone(), Some(index));
        self.calls.push(NativeCall::PushState {
            index,
            url: url.clone(),
        });
    }

    fn replace_state(&mut self, index: usize, url: &Url) {
        self.entries[self.cursor] = NativeEntry {
            url: url.clone(),
            state: Some(index),
        };
        self.calls.push(NativeCall::ReplaceState {
            index,
            url: url.clone(),
        });
    }

    fn state_index(&self) -> Option<usize> {
        self.entries[self.cursor].state
    }
}

impl NavigationTiming for HeadlessHost {
    fn last_navigation_was_back_forward(&self) -> bool {
        self.back_forward
    }
}

impl TabStorage for HeadlessHost {
    fn get_item(&self, key: &str) -> Option<String> {
        self.storage.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: String) {
        self.storage.insert(key.to_string(), value);
    }
}

impl Viewport for HeadlessHost {
    fn scroll_position(&self) -> ScrollPosition {
        self.scroll
    }

    fn scroll_to(&mut self, position: ScrollPosition) {
        self.scroll = position;
        self.calls.push(NativeCall::ScrollTo(position));
    }

    fn scroll_into_view(&mut self, node: NodeId) {
        self.calls.push(NativeCall::ScrollIntoView(node));
    }
}

impl NativeNavigation for HeadlessHost {
    fn assign(&mut self, url: &Url) {
        log::debug!(target: "platform", "native navigation to {url}");
        self.calls.push(NativeCall::Assign(url.clone()));
        self.push_entry(url.clone(), None);
    }

    fn submit_form(&mut self, form: NodeId) {
        log::debug!(target: "platform", "native submit of form {}", form.0);
        self.calls.push(NativeCall::SubmitForm(form));
    }
}

impl Clock for HeadlessHost {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).expect("url")
    }

    #[test]
    fn push_truncates_forward_entries() {
        let mut host = HeadlessHost::new(url("https://a.test/"));
        host.replace_state(0, &url("https://a.test/"));
        host.push_state(1, &url("https://a.test/1"));
        host.push_state(2, &url("https://a.test/2"));
        assert_eq!(host.traverse(-2), Some((url("https://a.test/"), Some(0))));
        host.push_state(1, &url("https://a.test/x"));
        assert_eq!(host.entry_count(), 2);
        assert_eq!(host.traverse(1), None);
        assert_eq!(host.state_index(), Some(1));
    }

    #[test]
    fn storage_survives_reload() {
        let mut host = HeadlessHost::new(url("https://a.test/"));
        host.set_item("k", "v".into());
        host.scroll_to(ScrollPosition::new(0.0, 40.0));
        host.reload(true);
        assert_eq!(host.get_item("k").as_deref(), Some("v"));
        assert!(host.last_navigation_was_back_forward());
        assert_eq!(host.scroll_position(), ScrollPosition::TOP);
        assert!(host.calls().is_empty());
    }

    #[test]
    fn assign_loads_a_fresh_entry() {
        let mut host = HeadlessHost::new(url("https://a.test/"));
        host.assign(&url("https://b.test/"));
        assert_eq!(host.current_url().as_str(), "https://b.test/");
        assert_eq!(host.state_index(), None);
        assert_eq!(host.calls(), &[NativeCall::Assign(url("https://b.test/"))]);
    }
}
