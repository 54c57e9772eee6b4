//! Client-side navigation runtime: intercepts same-origin link clicks and form submits,
//! fetches the next document, and patches it into the live one while keeping history,
//! scroll and lifecycle events consistent with a native page load.

pub mod config;
pub mod form;
pub mod history;
pub mod navigator;
pub mod policy;
pub mod prefetch;
pub mod session;
pub mod submitter;
pub mod timers;
pub mod visitor;

mod error;
#[cfg(test)]
mod testing;

pub use config::{ConfigError, NavigateConfig, PrefetchConfig};
pub use error::NavigationError;
pub use form::{FormEncoding, FormError, FormMethod, FormSubmission};
pub use history::{History, HistoryState, NavigationRecord, PopstateTarget};
pub use navigator::{Navigator, PageContext};
pub use prefetch::{PrefetchState, Prefetcher};
pub use session::Session;
pub use timers::{Task, TimerId, TimerQueue};
pub use visitor::{LinkClick, Modifiers};

pub use core_types::{NavigationReason, NavigationResult, ReadyState, ScrollPosition};
