//! haul-core — dataset/block naming and the resolved workflow model.
//!
//! Shared vocabulary for the GridHaul placement and injection crates:
//! container/block name parsing (tier extraction, block-to-container
//! mapping) and the `Workflow` structure a resolver populates before the
//! chunking engine splits it across destinations.
//!
//! # Naming
//!
//! ```text
//! container:  /PrimaryDS/ProcessedDS/TIER
//! block:      /PrimaryDS/ProcessedDS/TIER#<uuid>
//! ```
//!
//! The tier is the trailing path segment of the container name; a block
//! name is its container name plus a `#`-delimited suffix.

pub mod naming;
pub mod workflow;

pub use naming::{container_of, tier_of};
pub use workflow::{Footprint, Workflow};
