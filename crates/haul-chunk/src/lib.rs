//! haul-chunk — deterministic block-to-destination packing.
//!
//! Splits a resolved workflow's primary blocks into a bounded number of
//! destination chunks, balanced by size, then pulls each chunk's parent
//! blocks in behind it. Pure computation: no I/O, no clock, identical
//! inputs always produce identical chunks.
//!
//! # Algorithm
//!
//! ```text
//! target = total_primary_bytes / num_chunks
//!
//! sort primary blocks by size, largest first (name order on ties)
//! for each chunk:
//!     scan the unassigned pool in order:
//!         empty chunk        → take the block unconditionally
//!         running + block ≤ target → take the block
//!         otherwise          → skip, keep scanning
//! leftovers → round-robin, one per chunk, size ignored
//! parent closure → each chunk unions in the parents of its blocks
//! ```
//!
//! A parent block read by children in two chunks lands, fully sized, in
//! both. That duplication is intended: each destination must hold every
//! byte its share of the processing reads.

pub mod chunker;

pub use chunker::{BlockChunk, chunk};
