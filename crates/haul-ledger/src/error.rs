//! Error taxonomy for bookkeeping operations.

use thiserror::Error;

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Failures the bookkeeping store reports.
///
/// The injection cycle branches on the variant rather than on message
/// text: contention requeues the affected items, a failed query fails
/// the phase that needed it, and an update failure of unknown shape
/// aborts the cycle.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Concurrent-update conflict (deadlock, lock wait timeout).
    /// Transient; the same update is expected to succeed next cycle.
    #[error("bookkeeping contention: {0}")]
    Contention(String),

    /// A read query failed.
    #[error("bookkeeping query failed: {0}")]
    Query(String),

    /// A status update failed for a reason other than contention.
    #[error("bookkeeping update failed: {0}")]
    Update(String),
}

impl LedgerError {
    /// Whether retrying the same operation next cycle should succeed.
    pub fn is_contention(&self) -> bool {
        matches!(self, Self::Contention(_))
    }
}
