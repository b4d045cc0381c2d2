//! haul-ledger — the local bookkeeping side of injection.
//!
//! The workload system keeps its own record of which files have been
//! registered in the replication catalog, which blocks are closed, and
//! which containers carry a subscription. This crate defines that
//! store's contract:
//!
//! - **`manifest`** — the pending-work shape queries return (location →
//!   container → block → files) with tier filtering and flat iteration
//! - **`ledger`** — the `Ledger` trait the injection loop drives
//! - **`error`** — the failure taxonomy the loop branches on
//!   (contention is retried, queries fail their phase, the rest abort
//!   the cycle)

pub mod error;
pub mod ledger;
pub mod manifest;

pub use error::{LedgerError, LedgerResult};
pub use ledger::{Ledger, UnsubscribedContainer};
pub use manifest::{BlockEntry, FileRecord, PendingManifest};
