//! Per-cycle outcome counters.

use serde::{Deserialize, Serialize};

/// What one injection cycle accomplished.
///
/// Counters cover work attempted this cycle only; the harness decides
/// whether to log, export, or ignore them. Failed counters record items
/// excluded from the rest of the cycle, not aborted cycles.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CycleReport {
    /// LFNs whose queued bookkeeping retry succeeded.
    pub recovered_files: u64,
    /// LFNs parked in the recovery queue for the next cycle.
    pub files_requeued: u64,
    /// Containers newly created in the catalog.
    pub containers_created: u64,
    /// Containers the catalog refused.
    pub containers_failed: u64,
    /// Blocks newly created.
    pub blocks_created: u64,
    /// Blocks skipped because the cache already knew them.
    pub blocks_cached: u64,
    /// Blocks the catalog refused.
    pub blocks_failed: u64,
    /// Blocks whose replica registration the catalog refused.
    pub replica_failures: u64,
    /// Files registered and marked injected.
    pub files_injected: u64,
    /// Block-level rules created.
    pub block_rules_created: u64,
    /// Block-level rule requests the catalog refused.
    pub block_rules_failed: u64,
    /// Blocks closed after migration.
    pub blocks_closed: u64,
    /// Whether the periodic sub-cycle ran.
    pub periodic_ran: bool,
    /// Container-level rules created by the periodic pass.
    pub container_rules_created: u64,
    /// Containers batch-marked subscribed.
    pub containers_subscribed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_report_is_all_zeroes() {
        let report = CycleReport::default();
        assert_eq!(report.files_injected, 0);
        assert_eq!(report.containers_created, 0);
        assert!(!report.periodic_ran);
    }
}
