//! Injector error types.

use thiserror::Error;

use haul_ledger::LedgerError;

/// Errors that abort an injection cycle.
///
/// Per-item catalog refusals are not errors; they exclude the item for
/// the rest of the cycle and surface in the [`crate::CycleReport`].
#[derive(Debug, Error)]
pub enum InjectError {
    #[error("bookkeeping error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("rule listing failed for {0}")]
    RuleQuery(String),
}

pub type InjectResult<T> = Result<T, InjectError>;
