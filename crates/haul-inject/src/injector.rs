//! Replication injector — one call, one idempotent cycle.
//!
//! The `Injector` owns the cycle state that must survive between
//! invocations: the container/block existence caches, the recovery
//! queue, and the periodic sub-cycle clock. Collaborators arrive as
//! trait objects at the seams ([`Catalog`], [`Ledger`]) so cycles run
//! identically against the real services and against test doubles.
//!
//! Failure posture: a catalog refusal excludes that item for the rest
//! of the cycle and is counted in the report; bookkeeping contention
//! parks the affected files in the recovery queue; any other
//! bookkeeping failure aborts the cycle. Nothing is rolled back — the
//! next cycle repeats whatever did not complete, and the existence
//! checks make the repetition cheap.

use std::collections::BTreeSet;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use tracing::{debug, error, info, warn};

use haul_catalog::{
    Catalog, FileSpec, NameCache, RuleDisposition, RuleGrouping, evaluate_rule, usable_rses,
};
use haul_ledger::{FileRecord, Ledger, PendingManifest};

use crate::config::InjectorConfig;
use crate::error::{InjectError, InjectResult};
use crate::recovery::RecoveryQueue;
use crate::report::CycleReport;

/// A block that survived phases 3–4 and is ready for replicas.
struct StagedBlock {
    block: String,
    destination: String,
    files: Vec<FileRecord>,
    /// Created this cycle, as opposed to known from the cache.
    fresh: bool,
}

/// The injection control loop.
pub struct Injector<C, L> {
    config: InjectorConfig,
    catalog: C,
    ledger: L,
    container_cache: NameCache,
    block_cache: NameCache,
    recovery: RecoveryQueue,
    last_periodic: Option<Instant>,
}

impl<C: Catalog, L: Ledger> Injector<C, L> {
    /// Build an injector around its collaborators. The caches are
    /// constructed by the process and handed in, so a restart starts
    /// cold while a long-running process keeps its warm sets.
    pub fn new(
        config: InjectorConfig,
        catalog: C,
        ledger: L,
        container_cache: NameCache,
        block_cache: NameCache,
    ) -> Self {
        Self {
            config,
            catalog,
            ledger,
            container_cache,
            block_cache,
            recovery: RecoveryQueue::new(),
            last_periodic: None,
        }
    }

    /// LFNs currently parked for a bookkeeping retry.
    pub fn pending_recoveries(&self) -> usize {
        self.recovery.len()
    }

    /// Run one full injection cycle.
    pub async fn execute_cycle(&mut self) -> InjectResult<CycleReport> {
        let mut report = CycleReport::default();
        debug!("injection cycle started");

        self.recover_failed_updates(&mut report).await?;

        let manifest = self.fetch_pending().await?;
        let containers_ok = self.ensure_containers(&manifest, &mut report).await;
        let staged = self.ensure_blocks(&manifest, &containers_ok, &mut report).await;
        let registered = self.register_replicas(staged, &mut report).await?;
        self.create_block_rules(&registered, &mut report).await;

        self.close_migrated_blocks(&mut report).await?;

        if self.periodic_due() {
            report.periodic_ran = true;
            self.run_deletion_pass();
            self.create_container_rules(&mut report).await?;
            self.last_periodic = Some(Instant::now());
        }

        info!(
            containers_created = report.containers_created,
            blocks_created = report.blocks_created,
            files_injected = report.files_injected,
            files_requeued = report.files_requeued,
            block_rules = report.block_rules_created,
            blocks_closed = report.blocks_closed,
            periodic = report.periodic_ran,
            "injection cycle finished"
        );
        Ok(report)
    }

    /// Poll loop: one cycle per tick until shutdown flips.
    pub async fn run(&mut self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let interval = self.config.poll_interval();
        info!(interval_secs = interval.as_secs(), "injector started");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    if let Err(e) = self.execute_cycle().await {
                        error!(error = %e, "injection cycle failed");
                    }
                }
                _ = shutdown.changed() => {
                    info!("injector shutting down");
                    break;
                }
            }
        }
    }

    // ── Phase 1: recovery ───────────────────────────────────────────

    /// Retry the bookkeeping update for files queued by earlier cycles.
    /// Failures stay queued; only contention lets the cycle continue.
    async fn recover_failed_updates(&mut self, report: &mut CycleReport) -> InjectResult<()> {
        if self.recovery.is_empty() {
            return Ok(());
        }

        let lfns = self.recovery.drain();
        debug!(files = lfns.len(), "retrying queued bookkeeping updates");

        match self.ledger.set_injected(&lfns, true).await {
            Ok(()) => {
                report.recovered_files += lfns.len() as u64;
                info!(files = lfns.len(), "recovered queued bookkeeping updates");
            }
            Err(e) if e.is_contention() => {
                warn!(
                    files = lfns.len(),
                    error = %e,
                    "bookkeeping still contended, keeping files queued"
                );
                self.recovery.push(lfns);
            }
            Err(e) => {
                self.recovery.push(lfns);
                return Err(e.into());
            }
        }
        Ok(())
    }

    // ── Phase 2: pending work ───────────────────────────────────────

    async fn fetch_pending(&mut self) -> InjectResult<PendingManifest> {
        let mut manifest = self.ledger.uninjected_files().await?;

        let dropped = manifest.retain_allowed_tiers(&self.config.allowed_tiers);
        if dropped > 0 {
            debug!(containers = dropped, "dropped containers outside the tier allow list");
        }
        debug!(
            containers = manifest.container_count(),
            blocks = manifest.block_count(),
            files = manifest.file_count(),
            "fetched pending work"
        );
        Ok(manifest)
    }

    // ── Phase 3: containers ─────────────────────────────────────────

    /// Create every container the cache does not vouch for. Returns the
    /// set usable this cycle; a refused container takes its blocks and
    /// files out with it.
    async fn ensure_containers(
        &mut self,
        manifest: &PendingManifest,
        report: &mut CycleReport,
    ) -> BTreeSet<String> {
        let mut usable = BTreeSet::new();
        let mut confirmed = Vec::new();

        for name in manifest.container_names() {
            if self.container_cache.contains(name) {
                usable.insert(name.to_string());
                continue;
            }
            if self.catalog.create_container(name).await {
                debug!(container = %name, "container created");
                report.containers_created += 1;
                usable.insert(name.to_string());
                confirmed.push(name.to_string());
            } else {
                warn!(container = %name, "container creation refused, excluding it this cycle");
                report.containers_failed += 1;
            }
        }

        self.container_cache.merge(confirmed);
        usable
    }

    // ── Phase 4: blocks ─────────────────────────────────────────────

    /// Create every surviving block absent from the cache. Cached blocks
    /// skip the creation call but still carry their pending files
    /// forward; only fresh creations are candidates for rules.
    async fn ensure_blocks(
        &mut self,
        manifest: &PendingManifest,
        containers_ok: &BTreeSet<String>,
        report: &mut CycleReport,
    ) -> Vec<StagedBlock> {
        let mut staged = Vec::new();

        for entry in manifest.blocks() {
            if !containers_ok.contains(entry.container) {
                continue;
            }
            let destination = self.config.destination_for(entry.location);

            if self.block_cache.contains(entry.block) {
                report.blocks_cached += 1;
                staged.push(StagedBlock {
                    block: entry.block.to_string(),
                    destination,
                    files: entry.files.to_vec(),
                    fresh: false,
                });
                continue;
            }

            if self.catalog.create_block(entry.block, &destination).await {
                debug!(block = %entry.block, destination = %destination, "block created");
                report.blocks_created += 1;
                staged.push(StagedBlock {
                    block: entry.block.to_string(),
                    destination,
                    files: entry.files.to_vec(),
                    fresh: true,
                });
            } else {
                warn!(
                    block = %entry.block,
                    destination = %destination,
                    "block creation refused, excluding it this cycle"
                );
                report.blocks_failed += 1;
            }
        }
        staged
    }

    // ── Phase 5: replicas ───────────────────────────────────────────

    /// Bulk-register each staged block's files and mark them injected.
    /// Contention parks the files for recovery; any other bookkeeping
    /// failure aborts the cycle.
    async fn register_replicas(
        &mut self,
        staged: Vec<StagedBlock>,
        report: &mut CycleReport,
    ) -> InjectResult<Vec<StagedBlock>> {
        let mut registered = Vec::new();

        for block in staged {
            let specs: Vec<FileSpec> = block
                .files
                .iter()
                .map(|f| FileSpec {
                    name: f.lfn.clone(),
                    scope: self.config.file_scope.clone(),
                    bytes: f.bytes,
                    checksum: f.checksum.clone(),
                })
                .collect();

            if !self
                .catalog
                .create_replicas(&block.destination, &specs, &block.block)
                .await
            {
                warn!(
                    block = %block.block,
                    destination = %block.destination,
                    files = specs.len(),
                    "replica registration refused, excluding block this cycle"
                );
                report.replica_failures += 1;
                continue;
            }

            let lfns: Vec<String> = block.files.iter().map(|f| f.lfn.clone()).collect();
            match self.ledger.set_injected(&lfns, true).await {
                Ok(()) => {
                    report.files_injected += lfns.len() as u64;
                    debug!(block = %block.block, files = lfns.len(), "files marked injected");
                }
                Err(e) if e.is_contention() => {
                    warn!(
                        block = %block.block,
                        files = lfns.len(),
                        error = %e,
                        "bookkeeping contended, queueing files for recovery"
                    );
                    report.files_requeued += lfns.len() as u64;
                    self.recovery.push(lfns);
                }
                Err(e) => return Err(e.into()),
            }
            registered.push(block);
        }
        Ok(registered)
    }

    // ── Phase 6: block rules ────────────────────────────────────────

    /// Pin freshly created blocks at their destinations. Rule-exempt
    /// blocks (skip-listed tier, or block rules disabled) count as done
    /// once their replicas registered; a refused rule keeps its block
    /// out of the cache so the next cycle retries.
    async fn create_block_rules(&mut self, registered: &[StagedBlock], report: &mut CycleReport) {
        let mut done = Vec::new();

        for block in registered.iter().filter(|b| b.fresh) {
            if !self.config.create_block_rules || self.config.skip_block_rules_for(&block.block) {
                done.push(block.block.clone());
                continue;
            }

            match self
                .catalog
                .create_replication_rule(
                    &block.block,
                    &block.destination,
                    &self.config.account,
                    RuleGrouping::Block,
                    "gridhaul block injection",
                    &self.config.rule_metadata,
                )
                .await
            {
                Some(rule_id) => {
                    info!(
                        block = %block.block,
                        destination = %block.destination,
                        rule = %rule_id,
                        "block rule created"
                    );
                    report.block_rules_created += 1;
                    done.push(block.block.clone());
                }
                None => {
                    warn!(
                        block = %block.block,
                        destination = %block.destination,
                        "block rule refused, leaving block uncached for retry"
                    );
                    report.block_rules_failed += 1;
                }
            }
        }

        self.block_cache.merge(done);
    }

    // ── Phase 7: close migrated blocks ──────────────────────────────

    /// Close blocks whose files are all injected and migrated. Per-item
    /// failures wait for a future cycle; only the query escalates.
    async fn close_migrated_blocks(&mut self, report: &mut CycleReport) -> InjectResult<()> {
        let migrated = self.ledger.migrated_blocks().await?;
        if migrated.is_empty() {
            return Ok(());
        }

        for entry in migrated.blocks() {
            if !self.catalog.close_block_container(entry.block).await {
                warn!(block = %entry.block, "block close refused, leaving it for a future cycle");
                continue;
            }
            match self.ledger.set_block_closed(entry.block).await {
                Ok(()) => {
                    debug!(block = %entry.block, "block closed");
                    report.blocks_closed += 1;
                }
                Err(e) => {
                    warn!(
                        block = %entry.block,
                        error = %e,
                        "close not recorded, block will be re-closed next cycle"
                    );
                }
            }
        }
        Ok(())
    }

    // ── Phase 8: periodic sub-cycle ─────────────────────────────────

    /// Due on the first cycle of the process, then once per configured
    /// interval.
    fn periodic_due(&self) -> bool {
        match self.last_periodic {
            None => true,
            Some(at) => at.elapsed() >= self.config.periodic_interval(),
        }
    }

    /// Deletion of source data after transfer. Deliberately inert: the
    /// trigger policy is still undecided, and deleting on the wrong
    /// trigger destroys data.
    // TODO: settle the deletion trigger (subscription-aware vs
    // transfer-complete) before wiring this stage up.
    fn run_deletion_pass(&mut self) {
        info!("deletion pass not implemented, skipping");
    }

    /// Container-level rules for datasets flagged fully transferred but
    /// not yet subscribed. A usable existing rule counts as protection;
    /// a permanently failed one gets an operator's attention instead of
    /// a replacement.
    async fn create_container_rules(&mut self, report: &mut CycleReport) -> InjectResult<()> {
        let pending = self.ledger.unsubscribed_containers().await?;
        if pending.is_empty() {
            return Ok(());
        }

        let now = epoch_secs();
        let policy = self.config.rule_policy();
        let mut subscribed: Vec<u64> = Vec::new();

        for container in &pending {
            if self.config.skip_container_rules_for(&container.path) {
                debug!(container = %container.path, "tier excluded from container rules");
                continue;
            }
            let destination = self.config.destination_for(&container.target);

            let Some(rules) = self.catalog.list_rules(&container.path).await else {
                return Err(InjectError::RuleQuery(container.path.clone()));
            };

            let usable = usable_rses(&container.path, Some(&rules), now, &policy)
                .unwrap_or_default();
            if usable.iter().any(|rse| rse == &destination) {
                debug!(
                    container = %container.path,
                    destination = %destination,
                    "already protected by a usable rule"
                );
                subscribed.push(container.id);
                continue;
            }

            let failed_here = rules.iter().any(|r| {
                r.rse_expression == destination
                    && evaluate_rule(r, now, &policy) == RuleDisposition::PermanentlyFailed
            });
            if failed_here {
                error!(
                    container = %container.path,
                    destination = %destination,
                    "container carries a permanently failed rule, not recreating"
                );
                continue;
            }

            match self
                .catalog
                .create_replication_rule(
                    &container.path,
                    &destination,
                    &self.config.account,
                    RuleGrouping::All,
                    "gridhaul container subscription",
                    &self.config.rule_metadata,
                )
                .await
            {
                Some(rule_id) => {
                    info!(
                        container = %container.path,
                        destination = %destination,
                        rule = %rule_id,
                        "container rule created"
                    );
                    report.container_rules_created += 1;
                    subscribed.push(container.id);
                }
                None => {
                    warn!(
                        container = %container.path,
                        destination = %destination,
                        "container rule refused, will retry next periodic pass"
                    );
                }
            }
        }

        if !subscribed.is_empty() {
            self.ledger.mark_subscribed(&subscribed).await?;
            report.containers_subscribed += subscribed.len() as u64;
            info!(containers = subscribed.len(), "containers marked subscribed");
        }
        Ok(())
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
