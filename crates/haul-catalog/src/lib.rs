//! haul-catalog — contract and decision logic for the replication catalog.
//!
//! The catalog itself is an external service; this crate holds what the
//! injection loop needs to talk *about* it:
//!
//! - **`client`** — the `Catalog` trait (creation calls report success as
//!   booleans, queries as `Option`, so failures stay distinguishable from
//!   empty results)
//! - **`rules`** — rule records and the state evaluator that classifies
//!   an existing rule as usable, recreatable, or permanently failed
//! - **`cache`** — TTL-bounded membership cache of names already
//!   confirmed to exist, so cycles skip redundant creation calls

pub mod cache;
pub mod client;
pub mod rules;

pub use cache::NameCache;
pub use client::{Catalog, FileSpec, RuleGrouping};
pub use rules::{RuleDisposition, RulePolicy, RuleRecord, RuleState, evaluate_rule, usable_rses};
