//! Shared fixtures for unit tests.

use crate::config::NavigateConfig;
use crate::history::History;
use crate::navigator::PageContext;
use bus::{EventBus, PageEvent};
use core_types::ReadyState;
use html::Dom;
use net::MemoryFetcher;
use platform::HeadlessHost;
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use url::Url;

pub(crate) const ORIGIN: &str = "https://a.test/";

pub(crate) fn url(s: &str) -> Url {
    Url::parse(ORIGIN).and_then(|base| base.join(s)).expect("url")
}

/// A live page at [`ORIGIN`] showing `html`, with history observing and no recorded calls.
pub(crate) fn page(
    html: &str,
    fetcher: Arc<MemoryFetcher>,
) -> (PageContext<HeadlessHost>, Receiver<PageEvent>) {
    let location = url(ORIGIN);
    let mut host = HeadlessHost::new(location.clone());
    let mut history = History::restore(location.clone(), &mut host);
    history.observe();
    host.take_calls();
    let mut bus = EventBus::new();
    let events = bus.subscribe();
    let ctx = PageContext {
        dom: Dom::parse(html),
        location,
        history,
        bus,
        host,
        fetcher,
        config: NavigateConfig::default(),
        ready_state: ReadyState::Complete,
        last_patch: None,
        indicator_shows: 0,
    };
    (ctx, events)
}
