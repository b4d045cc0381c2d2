//! haul-inject — the replication injection control loop.
//!
//! Each cycle reads the bookkeeping store's pending work and drives the
//! external replication catalog toward it: containers exist, blocks
//! exist and are attached, file replicas are registered, rules pin the
//! data down, finished blocks get closed. Every step is idempotent and
//! per-item failures are excluded rather than escalated, so a crashed
//! or partially failed cycle is safely repeated by the next one.
//!
//! # Cycle phases
//!
//! ```text
//! 1. recover     retry bookkeeping updates queued by earlier cycles
//! 2. fetch       pending files by location/container/block, tier-filtered
//! 3. containers  create missing containers (TTL cache consulted)
//! 4. blocks      create missing blocks at their destinations
//! 5. replicas    bulk-register files, mark them injected
//! 6. rules       per-block rules for freshly created blocks
//! 7. close       close fully-migrated blocks
//! 8. periodic    (interval-gated) deletion stage + container rules
//! ```
//!
//! Phases 3–6 thread explicit kept/excluded partitions: an item that
//! fails drops out of the later phases of this cycle and comes back in
//! the next manifest.

pub mod config;
pub mod error;
pub mod injector;
pub mod recovery;
pub mod report;

pub use config::InjectorConfig;
pub use error::{InjectError, InjectResult};
pub use injector::Injector;
pub use recovery::RecoveryQueue;
pub use report::CycleReport;
