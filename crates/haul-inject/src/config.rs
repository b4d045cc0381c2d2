//! Injector configuration, loaded from `haul.toml`.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use haul_catalog::RulePolicy;
use haul_core::tier_of;

/// Tunables for the injection loop.
///
/// Tier policy is strict allow-listing: an empty `allowed_tiers` admits
/// nothing, so a fresh deployment ingests no data until someone decides
/// what it should carry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InjectorConfig {
    /// Tiers admitted into injection.
    pub allowed_tiers: Vec<String>,
    /// Tiers that never get block-level rules.
    pub block_rule_skip_tiers: Vec<String>,
    /// Tiers that never get container-level rules.
    pub container_rule_skip_tiers: Vec<String>,
    /// Master switch for block-level rule creation.
    pub create_block_rules: bool,
    /// TTL for the container existence cache, in seconds.
    pub container_cache_ttl_secs: u64,
    /// TTL for the block existence cache, in seconds.
    pub block_cache_ttl_secs: u64,
    /// Suffix appended to every destination name; lets a non-production
    /// instance inject against test storage endpoints.
    pub destination_suffix: Option<String>,
    /// Seconds between cycles when run as a loop.
    pub poll_interval_secs: u64,
    /// Seconds between periodic sub-cycles (container rules, deletion).
    pub periodic_interval_secs: u64,
    /// Account that owns every rule the injector creates.
    pub account: String,
    /// Catalog scope files are registered under.
    pub file_scope: String,
    /// Provenance metadata attached to every created rule.
    pub rule_metadata: BTreeMap<String, String>,
    /// Age limit for stuck rules, in days.
    pub stuck_rule_limit_days: u64,
}

impl Default for InjectorConfig {
    fn default() -> Self {
        Self {
            allowed_tiers: Vec::new(),
            block_rule_skip_tiers: Vec::new(),
            container_rule_skip_tiers: Vec::new(),
            create_block_rules: true,
            container_cache_ttl_secs: 24 * 3600,
            block_cache_ttl_secs: 24 * 3600,
            destination_suffix: None,
            poll_interval_secs: 300,
            periodic_interval_secs: 3600,
            account: "gridhaul".to_string(),
            file_scope: "data".to_string(),
            rule_metadata: BTreeMap::new(),
            stuck_rule_limit_days: 7,
        }
    }
}

impl InjectorConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: InjectorConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// The destination name for a manifest location, suffix applied.
    pub fn destination_for(&self, location: &str) -> String {
        match &self.destination_suffix {
            Some(suffix) => format!("{location}{suffix}"),
            None => location.to_string(),
        }
    }

    /// Whether `name`'s tier is excluded from block-level rules.
    pub fn skip_block_rules_for(&self, name: &str) -> bool {
        tier_of(name).is_some_and(|t| self.block_rule_skip_tiers.iter().any(|s| s == t))
    }

    /// Whether `name`'s tier is excluded from container-level rules.
    pub fn skip_container_rules_for(&self, name: &str) -> bool {
        tier_of(name).is_some_and(|t| self.container_rule_skip_tiers.iter().any(|s| s == t))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn periodic_interval(&self) -> Duration {
        Duration::from_secs(self.periodic_interval_secs)
    }

    pub fn container_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.container_cache_ttl_secs)
    }

    pub fn block_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.block_cache_ttl_secs)
    }

    pub fn rule_policy(&self) -> RulePolicy {
        RulePolicy {
            stuck_limit_days: self.stuck_rule_limit_days,
        }
    }
}
