//! Client contract for the external replication catalog.
//!
//! Creation calls treat "already exists" as success and report the
//! outcome as a boolean; a `false` marks the item failed for this cycle
//! without aborting it. Queries return `Option` so a failed query is
//! never mistaken for an empty result. Implementations wrap the real
//! service; tests substitute in-memory doubles.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::rules::RuleRecord;

/// How a replication rule groups the data it pins.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuleGrouping {
    /// Each block's files stay together; blocks may spread out.
    Block,
    /// Everything under the target lands at a single destination.
    All,
}

/// One file to register as a replica.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileSpec {
    /// Logical file name.
    pub name: String,
    /// Catalog namespace the file is registered under.
    pub scope: String,
    pub bytes: u64,
    /// Opaque checksum string, passed through as produced upstream.
    pub checksum: String,
}

/// The replication catalog, as the injection loop sees it.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Create a container. `true` when it exists afterwards.
    async fn create_container(&self, name: &str) -> bool;

    /// Create a block at `destination`. Creation also attaches the block
    /// to its container. `true` when it exists afterwards.
    async fn create_block(&self, name: &str, destination: &str) -> bool;

    /// Bulk-register `files` as replicas of `block` at `destination`.
    async fn create_replicas(&self, destination: &str, files: &[FileSpec], block: &str) -> bool;

    /// Create a replication rule for `target`. Returns the new rule id,
    /// or `None` when the catalog refused it.
    async fn create_replication_rule(
        &self,
        target: &str,
        rse_expression: &str,
        account: &str,
        grouping: RuleGrouping,
        comment: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Option<String>;

    /// Mark a block or container closed to further attachment.
    async fn close_block_container(&self, name: &str) -> bool;

    /// Rules currently attached to `target`. `None` means the query
    /// failed, as opposed to the target carrying no rules.
    async fn list_rules(&self, target: &str) -> Option<Vec<RuleRecord>>;
}
