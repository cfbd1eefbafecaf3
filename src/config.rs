//! Resource manager configuration.

use crate::change_queue::ChangeQueue;

/// Configuration for a [`ResourceManager`](crate::ResourceManager).
///
/// Use [`Default::default()`] for sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Edits retained by resources created through the manager before
    /// older ones are evicted. Default: 64.
    pub default_history_capacity: usize,
    /// Release every live handle when the manager shuts down. Default: `true`.
    pub dispose_on_shutdown: bool,
    /// Deferred tasks run per [`process_pending`](crate::ResourceManager::process_pending)
    /// call. `0` drains the whole queue. Default: `0`.
    pub max_tasks_per_pass: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            default_history_capacity: ChangeQueue::<()>::DEFAULT_CAPACITY,
            dispose_on_shutdown: true,
            max_tasks_per_pass: 0,
        }
    }
}

impl ManagerConfig {
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.default_history_capacity = capacity;
        self
    }

    pub fn with_dispose_on_shutdown(mut self, dispose: bool) -> Self {
        self.dispose_on_shutdown = dispose;
        self
    }

    pub fn with_max_tasks_per_pass(mut self, max: usize) -> Self {
        self.max_tasks_per_pass = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ManagerConfig::default();
        assert_eq!(config.default_history_capacity, 64);
        assert!(config.dispose_on_shutdown);
        assert_eq!(config.max_tasks_per_pass, 0);
    }

    #[test]
    fn test_builders() {
        let config = ManagerConfig::default()
            .with_history_capacity(8)
            .with_dispose_on_shutdown(false)
            .with_max_tasks_per_pass(4);
        assert_eq!(config.default_history_capacity, 8);
        assert!(!config.dispose_on_shutdown);
        assert_eq!(config.max_tasks_per_pass, 4);
    }
}
