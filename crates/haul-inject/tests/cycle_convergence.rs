//! Multi-cycle convergence tests.
//!
//! Drives the injector against a stateful in-process world where the
//! bookkeeping view reacts to the injector's own writes: files leave
//! the pending manifest once marked injected, containers leave the
//! subscription queue once marked, and a settle step stands in for the
//! external migration daemon that flags fully-injected blocks. The
//! scenarios check that repeated cycles converge to a fully injected,
//! ruled, and closed state even through transient catalog refusals and
//! bookkeeping contention.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, Once};

use async_trait::async_trait;
use haul_catalog::{Catalog, FileSpec, NameCache, RuleGrouping, RuleRecord};
use haul_inject::{Injector, InjectorConfig};
use haul_ledger::{
    FileRecord, Ledger, LedgerError, LedgerResult, PendingManifest, UnsubscribedContainer,
};

const RAW: &str = "/Cosmics/Run2024A-v1/RAW";
const AOD: &str = "/TT_14TeV/Winter25-v2/AODSIM";
const SITE: &str = "T1_US_FNAL_Disk";

static TRACING_INIT: Once = Once::new();

/// Cycle traces for debugging, controlled by `RUST_LOG`.
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

// ── Stateful world ──────────────────────────────────────────────────

/// One produced block: where it sits and which files it holds.
struct BlockLayout {
    location: String,
    container: String,
    block: String,
    files: Vec<FileRecord>,
}

#[derive(Default)]
struct WorldState {
    layout: Vec<BlockLayout>,
    injected: BTreeSet<String>,
    /// Blocks the (simulated) migration daemon has flagged.
    migrated: BTreeSet<String>,
    closed: BTreeSet<String>,
    unsubscribed: Vec<UnsubscribedContainer>,
    subscribed_ids: BTreeSet<u64>,

    containers: BTreeSet<String>,
    blocks: BTreeSet<String>,
    rules: Vec<(String, String, RuleGrouping)>,
    /// Blocks whose next creation attempt is refused, then forgotten.
    refuse_block_once: BTreeSet<String>,
    /// This many upcoming `set_injected` calls fail with contention.
    contention_budget: u32,
}

#[derive(Default, Clone)]
struct World(Arc<Mutex<WorldState>>);

impl World {
    fn lock(&self) -> MutexGuard<'_, WorldState> {
        self.0.lock().unwrap()
    }

    fn add_block(&self, container: &str, block: &str, lfns: &[&str]) {
        let files = lfns
            .iter()
            .map(|lfn| FileRecord {
                lfn: lfn.to_string(),
                bytes: 1024,
                checksum: "adler:deadbeef".to_string(),
            })
            .collect();
        self.lock().layout.push(BlockLayout {
            location: SITE.to_string(),
            container: container.to_string(),
            block: block.to_string(),
            files,
        });
    }

    fn add_unsubscribed(&self, id: u64, target: &str, path: &str) {
        self.lock().unsubscribed.push(UnsubscribedContainer {
            id,
            target: target.to_string(),
            path: path.to_string(),
        });
    }

    fn refuse_block_once(&self, block: &str) {
        self.lock().refuse_block_once.insert(block.to_string());
    }

    fn set_contention_budget(&self, n: u32) {
        self.lock().contention_budget = n;
    }

    /// What the migration daemon would do between cycles: flag every
    /// block whose files are all injected.
    fn settle_migration(&self) {
        let mut st = self.lock();
        let ready: Vec<String> = st
            .layout
            .iter()
            .filter(|b| b.files.iter().all(|f| st.injected.contains(&f.lfn)))
            .map(|b| b.block.clone())
            .collect();
        st.migrated.extend(ready);
    }

    fn injected_count(&self) -> usize {
        self.lock().injected.len()
    }

    fn closed_blocks(&self) -> BTreeSet<String> {
        self.lock().closed.clone()
    }

    fn rules(&self) -> Vec<(String, String, RuleGrouping)> {
        self.lock().rules.clone()
    }

    fn pending_files(&self) -> usize {
        let st = self.lock();
        st.layout
            .iter()
            .flat_map(|b| b.files.iter())
            .filter(|f| !st.injected.contains(&f.lfn))
            .count()
    }
}

struct WorldCatalog(World);
struct WorldLedger(World);

#[async_trait]
impl Catalog for WorldCatalog {
    async fn create_container(&self, name: &str) -> bool {
        self.0.lock().containers.insert(name.to_string());
        true
    }

    async fn create_block(&self, name: &str, _destination: &str) -> bool {
        let mut st = self.0.lock();
        if st.refuse_block_once.remove(name) {
            return false;
        }
        st.blocks.insert(name.to_string());
        true
    }

    async fn create_replicas(&self, _destination: &str, _files: &[FileSpec], _block: &str) -> bool {
        true
    }

    async fn create_replication_rule(
        &self,
        target: &str,
        rse_expression: &str,
        _account: &str,
        grouping: RuleGrouping,
        _comment: &str,
        _metadata: &BTreeMap<String, String>,
    ) -> Option<String> {
        let mut st = self.0.lock();
        st.rules
            .push((target.to_string(), rse_expression.to_string(), grouping));
        Some(format!("rid-{}", st.rules.len()))
    }

    async fn close_block_container(&self, _name: &str) -> bool {
        true
    }

    async fn list_rules(&self, _target: &str) -> Option<Vec<RuleRecord>> {
        Some(Vec::new())
    }
}

#[async_trait]
impl Ledger for WorldLedger {
    /// Files not yet marked injected, in their produced layout.
    async fn uninjected_files(&self) -> LedgerResult<PendingManifest> {
        let st = self.0.lock();
        let mut manifest = PendingManifest::default();
        for b in &st.layout {
            let pending: Vec<FileRecord> = b
                .files
                .iter()
                .filter(|f| !st.injected.contains(&f.lfn))
                .cloned()
                .collect();
            if !pending.is_empty() {
                manifest.insert_block(&b.location, &b.container, &b.block, pending);
            }
        }
        Ok(manifest)
    }

    /// Blocks flagged migrated and not yet closed.
    async fn migrated_blocks(&self) -> LedgerResult<PendingManifest> {
        let st = self.0.lock();
        let mut manifest = PendingManifest::default();
        for b in &st.layout {
            if st.migrated.contains(&b.block) && !st.closed.contains(&b.block) {
                manifest.insert_block(&b.location, &b.container, &b.block, Vec::new());
            }
        }
        Ok(manifest)
    }

    async fn set_injected(&self, lfns: &[String], injected: bool) -> LedgerResult<()> {
        let mut st = self.0.lock();
        if st.contention_budget > 0 {
            st.contention_budget -= 1;
            return Err(LedgerError::Contention("row lock timeout".to_string()));
        }
        if injected {
            st.injected.extend(lfns.iter().cloned());
        }
        Ok(())
    }

    async fn set_block_closed(&self, block: &str) -> LedgerResult<()> {
        self.0.lock().closed.insert(block.to_string());
        Ok(())
    }

    async fn unsubscribed_containers(&self) -> LedgerResult<Vec<UnsubscribedContainer>> {
        let st = self.0.lock();
        Ok(st
            .unsubscribed
            .iter()
            .filter(|c| !st.subscribed_ids.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn mark_subscribed(&self, ids: &[u64]) -> LedgerResult<()> {
        self.0.lock().subscribed_ids.extend(ids.iter().copied());
        Ok(())
    }
}

fn test_config() -> InjectorConfig {
    InjectorConfig {
        allowed_tiers: vec!["RAW".to_string(), "AODSIM".to_string()],
        ..InjectorConfig::default()
    }
}

fn make_injector(world: &World, config: InjectorConfig) -> Injector<WorldCatalog, WorldLedger> {
    let container_cache = NameCache::new(config.container_cache_ttl());
    let block_cache = NameCache::new(config.block_cache_ttl());
    Injector::new(
        config,
        WorldCatalog(world.clone()),
        WorldLedger(world.clone()),
        container_cache,
        block_cache,
    )
}

// ── Scenarios ───────────────────────────────────────────────────────

#[tokio::test]
async fn cold_start_converges_in_one_cycle() {
    init_tracing();
    let world = World::default();
    world.add_block(RAW, &format!("{RAW}#b1"), &["/store/data/r1.root", "/store/data/r2.root"]);
    world.add_block(RAW, &format!("{RAW}#b2"), &["/store/data/r3.root"]);
    world.add_block(AOD, &format!("{AOD}#b1"), &["/store/mc/a1.root"]);

    let mut injector = make_injector(&world, test_config());
    let report = injector.execute_cycle().await.unwrap();

    assert_eq!(report.containers_created, 2);
    assert_eq!(report.blocks_created, 3);
    assert_eq!(report.files_injected, 4);
    assert_eq!(report.block_rules_created, 3);
    assert_eq!(world.pending_files(), 0);

    // Migration catches up between cycles; the next cycle has nothing
    // to create and closes the migrated blocks.
    world.settle_migration();
    let second = injector.execute_cycle().await.unwrap();
    assert_eq!(second.containers_created, 0);
    assert_eq!(second.blocks_created, 0);
    assert_eq!(second.files_injected, 0);
    assert_eq!(second.blocks_closed, 3);
    assert_eq!(world.closed_blocks().len(), 3);
}

#[tokio::test]
async fn transient_block_refusal_converges_next_cycle() {
    init_tracing();
    let world = World::default();
    world.add_block(RAW, &format!("{RAW}#b1"), &["/store/data/r1.root"]);
    world.add_block(AOD, &format!("{AOD}#b1"), &["/store/mc/a1.root"]);
    world.refuse_block_once(&format!("{RAW}#b1"));

    let mut injector = make_injector(&world, test_config());

    let first = injector.execute_cycle().await.unwrap();
    assert_eq!(first.blocks_failed, 1);
    assert_eq!(first.files_injected, 1);
    assert_eq!(world.pending_files(), 1);

    let second = injector.execute_cycle().await.unwrap();
    assert_eq!(second.blocks_failed, 0);
    assert_eq!(second.blocks_created, 1);
    assert_eq!(second.files_injected, 1);
    assert_eq!(world.pending_files(), 0);

    // The late block still got its rule.
    let rules = world.rules();
    assert!(rules.iter().any(|(t, _, g)| t == &format!("{RAW}#b1") && *g == RuleGrouping::Block));
}

#[tokio::test]
async fn contended_bookkeeping_recovers_without_reinjection() {
    init_tracing();
    let world = World::default();
    world.add_block(RAW, &format!("{RAW}#b1"), &["/store/data/r1.root", "/store/data/r2.root"]);
    world.set_contention_budget(1);

    let mut injector = make_injector(&world, test_config());

    let first = injector.execute_cycle().await.unwrap();
    assert_eq!(first.files_requeued, 2);
    assert_eq!(injector.pending_recoveries(), 2);
    assert_eq!(world.injected_count(), 0);

    // Recovery lands before the manifest fetch, so the second cycle
    // marks the files and then sees an empty manifest.
    let second = injector.execute_cycle().await.unwrap();
    assert_eq!(second.recovered_files, 2);
    assert_eq!(second.files_injected, 0);
    assert_eq!(injector.pending_recoveries(), 0);
    assert_eq!(world.injected_count(), 2);
    assert_eq!(world.pending_files(), 0);
}

#[tokio::test]
async fn closed_blocks_stay_closed() {
    init_tracing();
    let world = World::default();
    world.add_block(RAW, &format!("{RAW}#b1"), &["/store/data/r1.root"]);

    let mut injector = make_injector(&world, test_config());
    injector.execute_cycle().await.unwrap();
    world.settle_migration();

    let second = injector.execute_cycle().await.unwrap();
    assert_eq!(second.blocks_closed, 1);

    // Already closed; nothing reported migrated any more.
    let third = injector.execute_cycle().await.unwrap();
    assert_eq!(third.blocks_closed, 0);
    assert_eq!(world.closed_blocks().len(), 1);
}

#[tokio::test]
async fn subscription_queue_drains_once() {
    init_tracing();
    let world = World::default();
    world.add_unsubscribed(1, "T2_CH_CERN", RAW);
    world.add_unsubscribed(2, "T2_CH_CERN", AOD);

    // Zero interval so the periodic pass runs every cycle.
    let config = InjectorConfig {
        periodic_interval_secs: 0,
        ..test_config()
    };
    let mut injector = make_injector(&world, config);

    let first = injector.execute_cycle().await.unwrap();
    assert_eq!(first.container_rules_created, 2);
    assert_eq!(first.containers_subscribed, 2);

    let container_rules = world
        .rules()
        .iter()
        .filter(|(_, _, g)| *g == RuleGrouping::All)
        .count();
    assert_eq!(container_rules, 2);

    // Marked subscribed, so the queue is empty next time around.
    let second = injector.execute_cycle().await.unwrap();
    assert_eq!(second.container_rules_created, 0);
    assert_eq!(second.containers_subscribed, 0);
    assert_eq!(world.rules().len(), 2);
}

#[tokio::test]
async fn mixed_backlog_converges_fully() {
    init_tracing();
    let world = World::default();
    world.add_block(RAW, &format!("{RAW}#b1"), &["/store/data/r1.root"]);
    world.add_block(RAW, &format!("{RAW}#b2"), &["/store/data/r2.root"]);
    world.add_block(AOD, &format!("{AOD}#b1"), &["/store/mc/a1.root"]);
    world.add_unsubscribed(7, "T2_CH_CERN", RAW);
    world.refuse_block_once(&format!("{RAW}#b2"));
    world.set_contention_budget(1);

    let config = InjectorConfig {
        periodic_interval_secs: 0,
        ..test_config()
    };
    let mut injector = make_injector(&world, config);

    // A handful of cycles, migration settling between each, is enough
    // to clear every backlog item.
    for _ in 0..4 {
        injector.execute_cycle().await.unwrap();
        world.settle_migration();
    }

    assert_eq!(world.pending_files(), 0);
    assert_eq!(world.closed_blocks().len(), 3);
    assert_eq!(injector.pending_recoveries(), 0);

    let rules = world.rules();
    let block_rules = rules.iter().filter(|(_, _, g)| *g == RuleGrouping::Block).count();
    let container_rules = rules.iter().filter(|(_, _, g)| *g == RuleGrouping::All).count();
    assert_eq!(block_rules, 3);
    assert_eq!(container_rules, 1);
}
