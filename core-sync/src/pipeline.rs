//! # Sync Pipeline
//!
//! Downloads the game journal in four ordered stages:
//!
//! 1. **Expansion index**: one request (served from the response cache when
//!    a copy younger than `index_max_age_days` exists) listing every
//!    expansion.
//! 2. **Expansion journals**: one request per expansion, each enqueuing its
//!    raid and dungeon stubs.
//! 3. **Raid journals**: one request per raid. Holiday event instances are
//!    dropped.
//! 4. **Dungeon journals**: one request per dungeon, deduplicated and
//!    sorted once the queue drains.
//!
//! Requests run strictly one at a time. [`SyncPipeline::step`] performs one
//! unit of work and reports what should happen next; [`SyncPipeline::run`]
//! drives steps until the pipeline finishes or stalls.
//!
//! ## Retries
//!
//! Each stage tracks two consecutive-failure counters. A failed request
//! (network, credentials, non-2xx) bumps `connection_retries`; an empty
//! queue with nothing collected bumps `time_retries`. Both reset on any
//! successful fetch. Once either exceeds the ceiling the stage stalls and
//! the loading gate stays closed. A body that does not decode stalls the
//! stage immediately.

use crate::error::{FetchError, Result};
use crate::fetch::{detail_url, expansion_index_url, JournalFetcher};
use crate::progress::RetryCounters;
use crate::stage::{StallReason, StepOutcome, SyncStage};
use crate::store::GameDataStore;
use bridge_traits::storage::ResponseCache;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use core_journal::{decode, ExpansionIndex, ExpansionJournal, InstanceJournal, Stub};
use core_runtime::config::{ApiSettings, SyncConfig};
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Per-run working state: pending stub queues and retry counters.
///
/// Owned by the caller driving [`SyncPipeline::step`]; nothing else sees it.
#[derive(Debug)]
pub struct PipelineRun {
    id: String,
    stage: SyncStage,
    expansions_pending: VecDeque<Stub>,
    raids_pending: VecDeque<Stub>,
    dungeons_pending: VecDeque<Stub>,
    retries: RetryCounters,
    started_at: Instant,
}

impl PipelineRun {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            stage: SyncStage::Idle,
            expansions_pending: VecDeque::new(),
            raids_pending: VecDeque::new(),
            dungeons_pending: VecDeque::new(),
            retries: RetryCounters::default(),
            started_at: Instant::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stage(&self) -> SyncStage {
        self.stage
    }

    pub fn retries(&self) -> RetryCounters {
        self.retries
    }

    /// Stubs still waiting in the queue drained by `stage`.
    pub fn pending(&self, stage: SyncStage) -> usize {
        match stage {
            SyncStage::FetchExpansionJournals => self.expansions_pending.len(),
            SyncStage::FetchRaidJournals => self.raids_pending.len(),
            SyncStage::FetchDungeonJournals => self.dungeons_pending.len(),
            SyncStage::Idle | SyncStage::FetchExpansionIndex | SyncStage::Done => 0,
        }
    }

    fn queue_mut(&mut self, stage: SyncStage) -> Option<&mut VecDeque<Stub>> {
        match stage {
            SyncStage::FetchExpansionJournals => Some(&mut self.expansions_pending),
            SyncStage::FetchRaidJournals => Some(&mut self.raids_pending),
            SyncStage::FetchDungeonJournals => Some(&mut self.dungeons_pending),
            SyncStage::Idle | SyncStage::FetchExpansionIndex | SyncStage::Done => None,
        }
    }
}

impl Default for PipelineRun {
    fn default() -> Self {
        Self::new()
    }
}

/// Totals of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub expansions: usize,
    pub raids: usize,
    pub dungeons: usize,
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed(SyncSummary),
    Stalled {
        stage: SyncStage,
        reason: StallReason,
    },
    /// The store already holds data or another run owns the loading gate.
    Skipped,
}

pub struct SyncPipeline {
    fetcher: JournalFetcher,
    response_cache: Arc<dyn ResponseCache>,
    settings: ApiSettings,
    config: SyncConfig,
    store: Arc<GameDataStore>,
    event_bus: EventBus,
}

impl SyncPipeline {
    pub fn new(
        fetcher: JournalFetcher,
        response_cache: Arc<dyn ResponseCache>,
        settings: ApiSettings,
        config: SyncConfig,
        store: Arc<GameDataStore>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            fetcher,
            response_cache,
            settings,
            config,
            store,
            event_bus,
        }
    }

    pub fn store(&self) -> &Arc<GameDataStore> {
        &self.store
    }

    /// Run every stage to completion or until one stalls.
    #[instrument(skip(self))]
    pub async fn run(&self) -> SyncOutcome {
        if !self.store.try_begin_loading().await {
            return SyncOutcome::Skipped;
        }
        self.drive().await
    }

    /// Drop the loaded data and the cached expansion index, then download
    /// everything again.
    ///
    /// Refused with [`SyncOutcome::Skipped`] while a run holds the loading
    /// gate or after a run stalled.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> SyncOutcome {
        if !self.store.try_begin_refresh().await {
            return SyncOutcome::Skipped;
        }
        match expansion_index_url(&self.settings) {
            Ok(url) => {
                if let Err(e) = self.response_cache.remove(&url).await {
                    warn!(error = %e, "Failed to drop cached expansion index");
                }
            }
            Err(e) => warn!(error = %e, "No expansion index URL to drop"),
        }
        self.drive().await
    }

    async fn drive(&self) -> SyncOutcome {
        let mut run = PipelineRun::new();
        info!(run_id = %run.id, "Starting game data sync");
        self.emit(SyncEvent::Started {
            run_id: run.id.clone(),
            estimated_items: self.config.estimated_items_to_download,
        });

        loop {
            match self.step(&mut run).await {
                StepOutcome::Continue => {}
                StepOutcome::RetryAfter(delay) => sleep(delay).await,
                StepOutcome::Advance(next) => {
                    self.advance(&mut run, next).await;
                    if next == SyncStage::Done {
                        return self.complete(&run).await;
                    }
                }
                StepOutcome::Stall(reason) => {
                    error!(
                        run_id = %run.id,
                        stage = %run.stage,
                        reason = %reason,
                        "Sync stage stalled"
                    );
                    self.emit(SyncEvent::Stalled {
                        run_id: run.id.clone(),
                        stage: run.stage.to_string(),
                        reason: reason.to_string(),
                    });
                    return SyncOutcome::Stalled {
                        stage: run.stage,
                        reason,
                    };
                }
            }
        }
    }

    /// Perform one unit of work for the run's current stage.
    ///
    /// Only updates `run` and the store; stage transitions are applied by
    /// the caller.
    pub async fn step(&self, run: &mut PipelineRun) -> StepOutcome {
        match run.stage {
            SyncStage::Idle => StepOutcome::Advance(SyncStage::FetchExpansionIndex),
            SyncStage::Done => StepOutcome::Continue,
            stage => {
                if run.retries.exceeds(self.config.retry_ceiling) {
                    return StepOutcome::Stall(StallReason::RetryCeiling {
                        time_retries: run.retries.time_retries,
                        connection_retries: run.retries.connection_retries,
                    });
                }
                if stage == SyncStage::FetchExpansionIndex {
                    self.step_index(run).await
                } else {
                    self.step_journal(run, stage).await
                }
            }
        }
    }

    /// Apply a stage transition to `run` and publish it.
    pub async fn advance(&self, run: &mut PipelineRun, next: SyncStage) {
        debug!(run_id = %run.id, from = %run.stage, to = %next, "Advancing stage");
        run.stage = next;
        run.retries.reset();
        self.store.set_stage(&run.id, next).await;
    }

    /// Creation time of the cached expansion index, if still fresh.
    pub async fn last_refreshed(&self) -> Result<Option<DateTime<Utc>>> {
        let Ok(url) = expansion_index_url(&self.settings) else {
            return Ok(None);
        };
        let entry = self
            .response_cache
            .get(&url, self.config.index_max_age_days)
            .await?;
        Ok(entry.map(|entry| entry.created_at))
    }

    async fn step_index(&self, run: &mut PipelineRun) -> StepOutcome {
        let url = match expansion_index_url(&self.settings) {
            Ok(url) => url,
            Err(e) => return self.connection_retry(run, &e),
        };

        let (index, from_cache) = match self.cached_index(&url).await {
            Some(index) => (index, true),
            None => {
                let body = match self.fetcher.get(&url).await {
                    Ok(body) => body,
                    Err(e) => return self.connection_retry(run, &e),
                };
                run.retries.reset();
                match decode::<ExpansionIndex>(&body) {
                    Ok(index) if index.tiers.is_empty() => return self.time_retry(run),
                    Ok(index) => {
                        self.write_cache(&url, &body).await;
                        (index, false)
                    }
                    Err(e) => return decode_stall(e),
                }
            }
        };

        run.retries.reset();
        info!(tiers = index.tiers.len(), from_cache, "Loaded expansion index");
        self.store.add_expected_items(index.tiers.len() as u64).await;
        run.expansions_pending.extend(index.tiers);
        StepOutcome::Advance(SyncStage::FetchExpansionJournals)
    }

    async fn cached_index(&self, url: &str) -> Option<ExpansionIndex> {
        let entry = match self
            .response_cache
            .get(url, self.config.index_max_age_days)
            .await
        {
            Ok(entry) => entry?,
            Err(e) => {
                warn!(error = %e, "Response cache read failed");
                return None;
            }
        };

        match decode::<ExpansionIndex>(&entry.body) {
            Ok(index) if !index.tiers.is_empty() => {
                debug!(created_at = %entry.created_at, "Using cached expansion index");
                Some(index)
            }
            Ok(_) | Err(_) => {
                warn!("Discarding unusable cached expansion index");
                if let Err(e) = self.response_cache.remove(url).await {
                    warn!(error = %e, "Failed to remove cache entry");
                }
                None
            }
        }
    }

    async fn step_journal(&self, run: &mut PipelineRun, stage: SyncStage) -> StepOutcome {
        let Some(stub) = run.queue_mut(stage).and_then(|queue| queue.front().cloned()) else {
            return self.finish_stage(run, stage).await;
        };

        let url = match detail_url(&stub, &self.settings) {
            Ok(url) => url,
            Err(e) => return self.connection_retry(run, &e),
        };
        let body = match self.fetcher.get(&url).await {
            Ok(body) => body,
            Err(e) => return self.connection_retry(run, &e),
        };
        run.retries.reset();

        let outcome = match stage {
            SyncStage::FetchExpansionJournals => self.accept_expansion(run, &url, &body).await,
            _ => {
                if !self.config.decode_delay.is_zero() {
                    sleep(self.config.decode_delay).await;
                }
                self.accept_instance(stage, &stub, &url, &body).await
            }
        };

        if outcome == StepOutcome::Continue {
            if let Some(queue) = run.queue_mut(stage) {
                queue.pop_front();
            }
        }
        outcome
    }

    async fn accept_expansion(&self, run: &mut PipelineRun, url: &str, body: &Bytes) -> StepOutcome {
        let journal = match decode::<ExpansionJournal>(body) {
            Ok(journal) => journal,
            Err(e) => return decode_stall(e),
        };
        self.write_cache(url, body).await;

        debug!(
            expansion = %journal.name,
            raids = journal.raid_stubs().len(),
            dungeons = journal.dungeon_stubs().len(),
            "Loaded expansion journal"
        );
        run.raids_pending.extend(journal.raid_stubs().iter().cloned());
        run.dungeons_pending.extend(journal.dungeon_stubs().iter().cloned());
        self.store.record_expansion(journal).await;
        StepOutcome::Continue
    }

    async fn accept_instance(
        &self,
        stage: SyncStage,
        stub: &Stub,
        url: &str,
        body: &Bytes,
    ) -> StepOutcome {
        let instance = match decode::<InstanceJournal>(body) {
            Ok(instance) => instance,
            Err(e) => return decode_stall(e),
        };

        if stage == SyncStage::FetchRaidJournals && instance.is_event() {
            debug!(raid = %stub.name, "Skipping event raid");
            return StepOutcome::Continue;
        }
        self.write_cache(url, body).await;

        if stage == SyncStage::FetchRaidJournals {
            self.store.record_raid(instance).await;
        } else {
            self.store.record_dungeon(instance).await;
        }
        StepOutcome::Continue
    }

    async fn finish_stage(&self, run: &mut PipelineRun, stage: SyncStage) -> StepOutcome {
        if self.store.result_count(stage).await == 0 {
            return self.time_retry(run);
        }

        self.store.finalize_stage(stage).await;
        if stage == SyncStage::FetchExpansionJournals {
            let discovered = run.raids_pending.len() + run.dungeons_pending.len();
            self.store.add_expected_items(discovered as u64).await;
        }
        let records = self.store.result_count(stage).await;
        info!(stage = %stage, records, "Stage complete");
        StepOutcome::Advance(stage.next())
    }

    fn connection_retry(&self, run: &mut PipelineRun, error: &FetchError) -> StepOutcome {
        run.retries.connection_retries += 1;
        warn!(
            stage = %run.stage,
            attempt = run.retries.connection_retries,
            error = %error,
            "Fetch failed, retrying"
        );
        self.emit(SyncEvent::Retrying {
            run_id: run.id.clone(),
            stage: run.stage.to_string(),
            kind: "connection".to_string(),
            attempt: run.retries.connection_retries,
        });
        StepOutcome::RetryAfter(self.config.retry_delay)
    }

    fn time_retry(&self, run: &mut PipelineRun) -> StepOutcome {
        run.retries.time_retries += 1;
        debug!(
            stage = %run.stage,
            attempt = run.retries.time_retries,
            "Nothing collected yet, retrying"
        );
        self.emit(SyncEvent::Retrying {
            run_id: run.id.clone(),
            stage: run.stage.to_string(),
            kind: "data_not_ready".to_string(),
            attempt: run.retries.time_retries,
        });
        StepOutcome::RetryAfter(self.config.retry_delay)
    }

    async fn write_cache(&self, url: &str, body: &[u8]) {
        if let Err(e) = self.response_cache.put(url, body).await {
            warn!(error = %e, "Failed to cache response");
        }
    }

    async fn complete(&self, run: &PipelineRun) -> SyncOutcome {
        self.store.finish_loading().await;

        let snapshot = self.store.snapshot().await;
        let summary = SyncSummary {
            expansions: snapshot.expansions.len(),
            raids: snapshot.raids.len(),
            dungeons: snapshot.dungeons.len(),
            duration: run.started_at.elapsed(),
        };
        info!(
            run_id = %run.id,
            expansions = summary.expansions,
            raids = summary.raids,
            dungeons = summary.dungeons,
            "Game data sync completed"
        );
        self.emit(SyncEvent::Completed {
            run_id: run.id.clone(),
            expansions: summary.expansions as u64,
            raids: summary.raids as u64,
            dungeons: summary.dungeons as u64,
            duration_secs: summary.duration.as_secs(),
        });
        SyncOutcome::Completed(summary)
    }

    fn emit(&self, event: SyncEvent) {
        // No subscribers is not an error.
        let _ = self.event_bus.emit(CoreEvent::Sync(event));
    }
}

fn decode_stall(error: core_journal::JournalError) -> StepOutcome {
    StepOutcome::Stall(StallReason::Decode {
        message: error.to_string(),
    })
}
