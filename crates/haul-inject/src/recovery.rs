//! Retry queue for bookkeeping updates that hit contention.
//!
//! When marking files injected fails with a transient conflict, the
//! affected LFNs park here and are retried at the start of the next
//! cycle. The queue deduplicates; a file requeued while already present
//! keeps its original position. Drain-and-requeue on retry failure
//! preserves order, so nothing leaves except through a successful
//! update.

use std::collections::{HashSet, VecDeque};

/// FIFO of LFNs awaiting a bookkeeping retry.
#[derive(Debug, Default)]
pub struct RecoveryQueue {
    order: VecDeque<String>,
    members: HashSet<String>,
}

impl RecoveryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue LFNs for retry. Duplicates are ignored.
    pub fn push<I>(&mut self, lfns: I)
    where
        I: IntoIterator<Item = String>,
    {
        for lfn in lfns {
            if self.members.insert(lfn.clone()) {
                self.order.push_back(lfn);
            }
        }
    }

    /// Take everything queued for one retry attempt. The caller pushes
    /// failures back.
    pub fn drain(&mut self) -> Vec<String> {
        self.members.clear();
        self.order.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
