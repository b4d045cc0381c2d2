//! Pending-work manifest returned by bookkeeping queries.
//!
//! Uninjected files (and migrated blocks) arrive grouped three levels
//! deep: location → container → block → files. One manifest is fetched
//! per cycle, filtered by tier policy, walked once, and discarded.
//! Ordered maps keep cycle traces and tests deterministic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use haul_core::tier_of;

/// One file awaiting replica registration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileRecord {
    /// Logical file name.
    pub lfn: String,
    pub bytes: u64,
    /// Opaque checksum string, passed through to the catalog.
    pub checksum: String,
}

/// A flattened view of one block's pending files.
#[derive(Debug, Clone, Copy)]
pub struct BlockEntry<'a> {
    pub location: &'a str,
    pub container: &'a str,
    pub block: &'a str,
    pub files: &'a [FileRecord],
}

/// Pending injection work: location → container → block → files.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingManifest {
    entries: BTreeMap<String, BTreeMap<String, BTreeMap<String, Vec<FileRecord>>>>,
}

impl PendingManifest {
    /// Append files to one block's pending list.
    pub fn insert_block(
        &mut self,
        location: &str,
        container: &str,
        block: &str,
        files: Vec<FileRecord>,
    ) {
        self.entries
            .entry(location.to_string())
            .or_default()
            .entry(container.to_string())
            .or_default()
            .entry(block.to_string())
            .or_default()
            .extend(files);
    }

    /// Drop every container whose tier is not on the allow list; a name
    /// with no recognizable tier is dropped too. Returns how many
    /// containers were removed.
    pub fn retain_allowed_tiers(&mut self, allowed: &[String]) -> usize {
        let before = self.container_count();
        for containers in self.entries.values_mut() {
            containers.retain(|name, _| {
                tier_of(name).is_some_and(|tier| allowed.iter().any(|a| a == tier))
            });
        }
        self.entries.retain(|_, containers| !containers.is_empty());
        before - self.container_count()
    }

    /// Distinct container names across all locations, in name order.
    pub fn container_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .entries
            .values()
            .flat_map(|containers| containers.keys().map(String::as_str))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Flat walk over every (location, container, block, files) entry,
    /// in map order.
    pub fn blocks(&self) -> impl Iterator<Item = BlockEntry<'_>> {
        self.entries.iter().flat_map(|(location, containers)| {
            containers.iter().flat_map(move |(container, blocks)| {
                blocks.iter().map(move |(block, files)| BlockEntry {
                    location: location.as_str(),
                    container: container.as_str(),
                    block: block.as_str(),
                    files: files.as_slice(),
                })
            })
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct (location, container) pairs counted per location.
    pub fn container_count(&self) -> usize {
        self.entries.values().map(|c| c.len()).sum()
    }

    pub fn block_count(&self) -> usize {
        self.entries
            .values()
            .flat_map(|c| c.values())
            .map(|b| b.len())
            .sum()
    }

    pub fn file_count(&self) -> usize {
        self.blocks().map(|e| e.files.len()).sum()
    }
}
