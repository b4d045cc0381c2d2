//! Chunking engine — splits primary blocks across destinations.
//!
//! Given a resolved workflow, produces at most `num_chunks` chunks whose
//! union is exactly the primary block set, each chunk padded with the
//! parent blocks its members descend from.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use haul_core::Workflow;

/// One destination's share of a workflow: block names plus total bytes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockChunk {
    pub blocks: BTreeSet<String>,
    pub bytes: u64,
}

impl BlockChunk {
    fn take(&mut self, name: &str, bytes: u64) {
        if self.blocks.insert(name.to_string()) {
            self.bytes += bytes;
        }
    }
}

/// Split a workflow's primary blocks into at most `num_chunks` chunks.
///
/// `num_chunks` of 1 returns a single chunk holding every primary block,
/// plus every parent block when a parent dataset is set (0 is treated as
/// 1). For larger values the chunk count is first reduced to the
/// distinct primary block count, and any chunk the packing leaves
/// without blocks is dropped, so no chunk comes back empty; a workflow
/// with no primary blocks yields no chunks.
///
/// Guarantees: every primary block appears in exactly one chunk; the
/// same workflow always splits the same way (ties in the size ordering
/// fall back to name order).
pub fn chunk(workflow: &Workflow, num_chunks: usize) -> Vec<BlockChunk> {
    let num_chunks = num_chunks.max(1);

    if num_chunks == 1 {
        return vec![whole_workflow_chunk(workflow)];
    }
    if workflow.primary_blocks.is_empty() {
        return Vec::new();
    }

    let n = num_chunks.min(workflow.primary_blocks.len());
    let total = workflow.primary_size();
    let target = total / n as u64;

    // Largest first; the BTreeMap's name order survives ties because the
    // sort is stable.
    let mut pool: Vec<(&str, u64)> = workflow
        .primary_blocks
        .iter()
        .map(|(name, f)| (name.as_str(), f.bytes))
        .collect();
    pool.sort_by(|a, b| b.1.cmp(&a.1));

    debug!(
        blocks = pool.len(),
        total_bytes = total,
        target_bytes = target,
        chunks = n,
        "splitting primary blocks"
    );

    let mut assigned = vec![false; pool.len()];
    let mut chunks: Vec<BlockChunk> = Vec::with_capacity(n);

    for _ in 0..n {
        let mut chunk = BlockChunk::default();
        for (idx, &(name, bytes)) in pool.iter().enumerate() {
            if assigned[idx] {
                continue;
            }
            // An empty chunk takes the largest remaining block no matter
            // its size, so oversized blocks still land somewhere.
            if chunk.blocks.is_empty() || chunk.bytes + bytes <= target {
                chunk.take(name, bytes);
                assigned[idx] = true;
            }
        }
        chunks.push(chunk);
    }

    // Whatever fit nowhere is dealt out round-robin, size ignored.
    let mut next = 0;
    for (idx, &(name, bytes)) in pool.iter().enumerate() {
        if assigned[idx] {
            continue;
        }
        chunks[next].take(name, bytes);
        next = (next + 1) % n;
    }

    // A chunk still empty here means the pool ran dry before its turn.
    chunks.retain(|c| !c.blocks.is_empty());

    if workflow.parent_dataset.is_some() {
        for chunk in &mut chunks {
            attach_parents(workflow, chunk);
        }
    }

    for (idx, chunk) in chunks.iter().enumerate() {
        debug!(
            chunk = idx,
            blocks = chunk.blocks.len(),
            bytes = chunk.bytes,
            "chunk assembled"
        );
    }

    chunks
}

/// The `num_chunks == 1` shape: all primary blocks, and the full parent
/// block set when a parent dataset is involved.
fn whole_workflow_chunk(workflow: &Workflow) -> BlockChunk {
    let mut chunk = BlockChunk::default();
    for (name, f) in &workflow.primary_blocks {
        chunk.take(name, f.bytes);
    }
    if workflow.parent_dataset.is_some() {
        for (name, f) in &workflow.parent_blocks {
            chunk.take(name, f.bytes);
        }
    }
    chunk
}

/// Union the parents of every primary block already in the chunk.
///
/// The linkage set is collected first so a parent shared by several
/// children in the same chunk is counted once.
fn attach_parents(workflow: &Workflow, chunk: &mut BlockChunk) {
    let mut parents: BTreeSet<&str> = BTreeSet::new();
    for block in &chunk.blocks {
        if let Some(linked) = workflow.child_to_parent.get(block) {
            parents.extend(linked.iter().map(String::as_str));
        }
    }
    for parent in parents {
        if let Some(f) = workflow.parent_blocks.get(parent) {
            chunk.take(parent, f.bytes);
        }
    }
}
