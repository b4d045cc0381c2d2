//! TTL-bounded membership cache for catalog names.
//!
//! One cache instance tracks one kind of name (containers, blocks). The
//! cycle consults it before issuing creation calls and merges confirmed
//! names back in at the end of each phase. There is no per-entry
//! eviction: the whole set expires together and the next merge after
//! expiry replaces it wholesale, which keeps a long-running process from
//! trusting stale existence information forever.
//!
//! Not internally locked. The injection cycle is the only writer and
//! runs one cycle at a time.

use std::collections::HashSet;
use std::time::{Duration, Instant};

/// A set of names with a shared time-to-live.
#[derive(Debug)]
pub struct NameCache {
    names: HashSet<String>,
    ttl: Duration,
    filled_at: Instant,
}

impl NameCache {
    /// An empty cache whose TTL window starts now.
    pub fn new(ttl: Duration) -> Self {
        Self {
            names: HashSet::new(),
            ttl,
            filled_at: Instant::now(),
        }
    }

    /// Whether the TTL window has elapsed. A zero TTL is expired from
    /// birth, which callers use to disable caching outright.
    pub fn is_expired(&self) -> bool {
        self.filled_at.elapsed() >= self.ttl
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Overwrite the whole set and restart the TTL window.
    pub fn replace<I>(&mut self, names: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.names = names.into_iter().collect();
        self.filled_at = Instant::now();
    }

    /// Union names into the set. The TTL window is untouched, so added
    /// names never outlive the batch they joined.
    pub fn add<I>(&mut self, names: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.names.extend(names);
    }

    /// The merge the injection cycle performs at phase end: a full
    /// replace when the window has lapsed, otherwise a union.
    pub fn merge<I>(&mut self, names: I)
    where
        I: IntoIterator<Item = String>,
    {
        if self.is_expired() {
            self.replace(names);
        } else {
            self.add(names);
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
