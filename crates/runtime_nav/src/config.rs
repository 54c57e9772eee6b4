use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// Element directive opting an anchor or form in or out of runtime navigation.
pub const NAVIGATE_ATTRIBUTE: &str = "data-frugal-navigate";
/// Element directive opting an anchor in or out of prefetching.
pub const PREFETCH_ATTRIBUTE: &str = "data-frugal-prefetch";
/// `<meta name=...>` directive opting a whole served document in or out.
pub const NAVIGATE_META: &str = "frugal-navigate";
/// Per-tab storage key holding the serialized history stack.
pub const HISTORY_STORAGE_KEY: &str = "frugal-history";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NavigateConfig {
    /// Navigate through the runtime unless a directive says `"false"`. When unset, only
    /// elements and documents saying `"true"` are navigated.
    pub default_navigate: bool,
    /// Class put on the document element while a slow fetch is in flight.
    pub loading_class_name: String,
    pub loading_delay_ms: u64,
    /// Restore the captured offset when re-entering a history record.
    pub scroll_restoration: bool,
    /// Scroll to the top after a navigation that neither targets a fragment nor restores.
    pub reset_scroll: bool,
    pub prefetch: PrefetchConfig,
}

impl Default for NavigateConfig {
    fn default() -> Self {
        Self {
            default_navigate: true,
            loading_class_name: "frugal-loading".to_string(),
            loading_delay_ms: 150,
            scroll_restoration: true,
            reset_scroll: true,
            prefetch: PrefetchConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrefetchConfig {
    pub enabled: bool,
    pub default_prefetch: bool,
    /// Hover time before a hint is inserted.
    pub delay_ms: u64,
    /// Minimum time between two hints for the same link.
    pub cooldown_ms: u64,
    /// Lifetime of an inserted hint.
    pub gc_delay_ms: u64,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_prefetch: true,
            delay_ms: 80,
            cooldown_ms: 30_000,
            gc_delay_ms: 10_000,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "failed to read config: {err}"),
            ConfigError::Parse(err) => write!(f, "invalid config: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl NavigateConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        toml::from_str(input).map_err(ConfigError::Parse)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_toml_str(&text)
    }
}
