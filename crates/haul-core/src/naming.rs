//! Name parsing for containers and blocks.
//!
//! Containers are named `/Primary/Processed/TIER`; blocks append a
//! `#<uuid>` suffix to their container name. Tier-based policy (which
//! data to ingest, which rules to skip) keys off the trailing segment.

/// Extract the data tier from a container or block name.
///
/// The block suffix (`#...`) is tolerated and ignored. Returns `None`
/// for names with no `/`-separated tier segment.
///
/// ```
/// use haul_core::tier_of;
/// assert_eq!(tier_of("/Cosmics/Run2024A-v1/RAW"), Some("RAW"));
/// assert_eq!(tier_of("/Cosmics/Run2024A-v1/RAW#abc-123"), Some("RAW"));
/// assert_eq!(tier_of("no-slashes"), None);
/// ```
pub fn tier_of(name: &str) -> Option<&str> {
    let container = container_of(name);
    match container.rsplit_once('/') {
        Some((_, tier)) if !tier.is_empty() => Some(tier),
        _ => None,
    }
}

/// Map a block name to its container name.
///
/// Names without a `#` separator are returned unchanged, so the function
/// is total over both containers and blocks.
pub fn container_of(name: &str) -> &str {
    match name.split_once('#') {
        Some((container, _)) => container,
        None => name,
    }
}
