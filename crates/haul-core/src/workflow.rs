//! Resolved workflow model.
//!
//! A resolver (external to this workspace) expands a workflow's input
//! dataset names into concrete block sets with sizes, replica locations,
//! and parentage linkage. The result is immutable during chunking; the
//! only mutation this module offers is pruning parent blocks that have
//! no live replica anywhere, which must happen before the linkage
//! invariant holds.
//!
//! Ordered maps throughout: the chunking engine's output must be
//! deterministic for identical inputs, so iteration order is part of the
//! contract.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Size and replica locations for one block or dataset summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Footprint {
    /// Total bytes on disk.
    pub bytes: u64,
    /// Storage elements currently holding a complete replica.
    pub locations: BTreeSet<String>,
}

/// A workflow's resolved data requirements.
///
/// Linkage invariant (after [`Workflow::prune_parent_blocks`]): every key
/// of `child_to_parent` is a key of `primary_blocks`, and every name in
/// its value sets is a key of `parent_blocks`. The chunking engine trusts
/// this; [`Workflow::check_linkage`] verifies it for resolvers and tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Workflow {
    /// The dataset this workflow processes.
    pub primary_dataset: String,
    /// Parent dataset, when the workflow reads two generations of data.
    pub parent_dataset: Option<String>,
    /// Pileup/mixing datasets, placed whole rather than per-block.
    pub secondary_datasets: BTreeSet<String>,
    /// Block name → footprint for the primary dataset.
    pub primary_blocks: BTreeMap<String, Footprint>,
    /// Block name → footprint for the parent dataset.
    pub parent_blocks: BTreeMap<String, Footprint>,
    /// Primary block → the parent blocks its files descend from.
    pub child_to_parent: BTreeMap<String, BTreeSet<String>>,
    /// Secondary dataset name → whole-dataset footprint.
    pub secondary_summaries: BTreeMap<String, Footprint>,
}

impl Workflow {
    /// A workflow identity before resolution populates the block maps.
    pub fn new(
        primary_dataset: impl Into<String>,
        parent_dataset: Option<String>,
        secondary_datasets: BTreeSet<String>,
    ) -> Self {
        Self {
            primary_dataset: primary_dataset.into(),
            parent_dataset,
            secondary_datasets,
            ..Self::default()
        }
    }

    /// Total bytes across all primary blocks.
    pub fn primary_size(&self) -> u64 {
        self.primary_blocks.values().map(|f| f.bytes).sum()
    }

    /// Drop parent blocks with no live replica and strip them from the
    /// child-to-parent linkage. Returns how many parent blocks were
    /// dropped.
    ///
    /// A parent block nothing can serve from cannot be staged alongside
    /// its children, so carrying it into chunking would inflate chunk
    /// sizes with unfetchable data.
    pub fn prune_parent_blocks(&mut self) -> usize {
        let dead: BTreeSet<String> = self
            .parent_blocks
            .iter()
            .filter(|(_, f)| f.locations.is_empty())
            .map(|(name, _)| name.clone())
            .collect();

        if dead.is_empty() {
            return 0;
        }

        self.parent_blocks.retain(|name, _| !dead.contains(name));
        for parents in self.child_to_parent.values_mut() {
            parents.retain(|p| !dead.contains(p));
        }
        self.child_to_parent.retain(|_, parents| !parents.is_empty());

        dead.len()
    }

    /// Verify the linkage invariant, returning every offending name:
    /// linkage keys missing from `primary_blocks` and linked parents
    /// missing from `parent_blocks`. Empty means the invariant holds.
    pub fn check_linkage(&self) -> Vec<String> {
        let mut bad = BTreeSet::new();
        for (child, parents) in &self.child_to_parent {
            if !self.primary_blocks.contains_key(child) {
                bad.insert(child.clone());
            }
            for parent in parents {
                if !self.parent_blocks.contains_key(parent) {
                    bad.insert(parent.clone());
                }
            }
        }
        bad.into_iter().collect()
    }
}
