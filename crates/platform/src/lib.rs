//! Capabilities the navigation runtime needs from whatever embeds it.
//!
//! A browser embedding maps these onto `history.pushState`, `sessionStorage`, the scrolling
//! element, the navigation timing entry and native `location`/`form` behavior. [`HeadlessHost`]
//! implements all of them in memory.

use core_types::ScrollPosition;
use html::NodeId;
use url::Url;

mod headless;

pub use headless::{HeadlessHost, NativeCall};

/// The session history owned by the embedder. Each entry carries the runtime's record index
/// as its state.
pub trait NativeHistory {
    fn push_state(&mut self, index: usize, url: &Url);
    fn replace_state(&mut self, index: usize, url: &Url);
    /// Record index stored on the current native entry, if any.
    fn state_index(&self) -> Option<usize>;
}

pub trait NavigationTiming {
    /// Whether the current document was reached through back/forward rather than a fresh load.
    fn last_navigation_was_back_forward(&self) -> bool;
}

/// Durable per-tab key/value storage.
pub trait TabStorage {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&mut self, key: &str, value: String);
}

pub trait Viewport {
    fn scroll_position(&self) -> ScrollPosition;
    fn scroll_to(&mut self, position: ScrollPosition);
    fn scroll_into_view(&mut self, node: NodeId);
}

/// What the embedder does when the runtime steps aside.
pub trait NativeNavigation {
    fn assign(&mut self, url: &Url);
    fn submit_form(&mut self, form: NodeId);
}

pub trait Clock {
    fn now_ms(&self) -> u64;
}

pub trait Host:
    NativeHistory + NavigationTiming + TabStorage + Viewport + NativeNavigation + Clock
{
}

impl<T> Host for T where
    T: NativeHistory + NavigationTiming + TabStorage + Viewport + NativeNavigation + Clock
{
}
