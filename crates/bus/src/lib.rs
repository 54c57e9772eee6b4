use core_types::ReadyState;
use std::sync::mpsc::{Receiver, Sender, channel};
use url::Url;

/// Lifecycle events observable by code running next to the navigation runtime.
#[derive(Clone, Debug, PartialEq)]
pub enum PageEvent {
    ReadyStateChange(ReadyState),
    /// The live document is about to be patched.
    BeforeUnload,
    /// The runtime finished starting up on the initial document.
    SessionStart,
    /// A history traversal selected `url` (record `index`) and is about to navigate into it.
    Popstate { url: Url, index: usize },
}

impl PageEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PageEvent::ReadyStateChange(_) => "readystatechange",
            PageEvent::BeforeUnload => "beforeunload",
            PageEvent::SessionStart => "sessionstart",
            PageEvent::Popstate { .. } => "popstate",
        }
    }
}

/// Fan-out of page events to any number of subscribers.
///
/// Dispatch never blocks; subscribers whose receiver was dropped are pruned on the next send.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Sender<PageEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<PageEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn dispatch(&mut self, event: PageEvent) {
        log::trace!(target: "bus", "dispatch {}", event.name());
        self.subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
