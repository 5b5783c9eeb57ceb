//! Limits for the checked machine

/// Resource limits for one checked run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of live heap cells
    pub heap_limit: usize,
    /// Maximum estimated bytes held by the snapshot history
    pub snapshot_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            heap_limit: 1024 * 1024,
            snapshot_limit: 64 * 1024 * 1024,
        }
    }
}
