//! The bookkeeping store contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LedgerResult;
use crate::manifest::PendingManifest;

/// A container fully transferred but not yet subscribed at its
/// destination.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnsubscribedContainer {
    /// Bookkeeping row id, echoed back through `mark_subscribed`.
    pub id: u64,
    /// Destination RSE expression the container should be pinned at.
    pub target: String,
    /// Container name.
    pub path: String,
}

/// The workload system's local record of injection progress.
///
/// Every method talks to an external store and may fail; the error
/// taxonomy ([`crate::LedgerError`]) tells the caller whether to retry,
/// fail the phase, or abort the cycle.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Files not yet registered in the catalog, grouped by destination.
    async fn uninjected_files(&self) -> LedgerResult<PendingManifest>;

    /// Blocks whose files are all injected and whose authoritative-
    /// metadata migration has completed; same shape as
    /// [`Ledger::uninjected_files`], file lists may be empty.
    async fn migrated_blocks(&self) -> LedgerResult<PendingManifest>;

    /// Flip the injected flag on a batch of files.
    async fn set_injected(&self, lfns: &[String], injected: bool) -> LedgerResult<()>;

    /// Record one block as closed in the catalog.
    async fn set_block_closed(&self, block: &str) -> LedgerResult<()>;

    /// Containers awaiting a workflow-level subscription.
    async fn unsubscribed_containers(&self) -> LedgerResult<Vec<UnsubscribedContainer>>;

    /// Mark a batch of containers subscribed, by bookkeeping id.
    async fn mark_subscribed(&self, ids: &[u64]) -> LedgerResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;

    /// Double proving the trait stays object-safe and the error
    /// taxonomy flows through `?`.
    struct EmptyLedger;

    #[async_trait]
    impl Ledger for EmptyLedger {
        async fn uninjected_files(&self) -> LedgerResult<PendingManifest> {
            Ok(PendingManifest::default())
        }

        async fn migrated_blocks(&self) -> LedgerResult<PendingManifest> {
            Err(LedgerError::Query("bookkeeping backend unreachable".into()))
        }

        async fn set_injected(&self, lfns: &[String], _injected: bool) -> LedgerResult<()> {
            if lfns.is_empty() {
                return Err(LedgerError::Update("empty batch".into()));
            }
            Ok(())
        }

        async fn set_block_closed(&self, _block: &str) -> LedgerResult<()> {
            Ok(())
        }

        async fn unsubscribed_containers(&self) -> LedgerResult<Vec<UnsubscribedContainer>> {
            Ok(Vec::new())
        }

        async fn mark_subscribed(&self, _ids: &[u64]) -> LedgerResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn trait_is_usable_behind_a_dyn_pointer() {
        let ledger: Box<dyn Ledger> = Box::new(EmptyLedger);

        assert!(ledger.uninjected_files().await.unwrap().is_empty());
        assert!(ledger.migrated_blocks().await.is_err());
        assert!(
            ledger
                .set_injected(&["/store/f1.root".to_string()], true)
                .await
                .is_ok()
        );
    }
}
