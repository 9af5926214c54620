//! Dispatcher configuration

use serde::{Deserialize, Serialize};

/// Default number of batch members processed at once
pub const DEFAULT_MAX_CONCURRENCY: usize = 32;

/// How notification invocations are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationMode {
    /// Spawn onto the current Tokio runtime and return immediately.
    /// Falls back to `Inline` when no runtime is available.
    #[default]
    Detached,
    /// Run to completion before the dispatcher returns; the outcome is still discarded.
    Inline,
}

/// Tunables for [`crate::JsonRpcDispatcher`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Upper bound on batch members in flight at once. Zero is treated as one.
    pub max_concurrency: usize,
    pub notification_mode: NotificationMode,
}

impl DispatcherConfig {
    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            notification_mode: NotificationMode::default(),
        }
    }
}
